/*
 * Created on Fri Jan 19 2024
 *
 * This file is a part of Gibbon
 * Gibbon is a free and open-source authorization engine written by
 * Sayan Nandan ("the Author") that stores users, groups and permissions
 * in a transactional document store and encodes set membership as
 * fixed-length bitmasks, trading a little write amplification for
 * single-read permission checks.
 *
 * Copyright (c) 2024, Sayan Nandan <ohsayan@outlook.com>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/

//! The universe resize protocol. Each operation runs inside one session, so
//! the byte-length change, the slot rows and every rewritten mask commit
//! together. Expanding widens masks with high-side zero padding; shrinking
//! first proves no allocated slot lives beyond the new boundary, which is
//! exactly what makes the silent truncation of the masks safe.

use {
    super::seed::{self, SeedKind},
    crate::{
        error::{Entity, GibbonError, GibbonResult},
        store::StoreState,
    },
};

pub(crate) fn expand_permissions(state: &mut StoreState, new_len: usize) -> GibbonResult<()> {
    let old_len = state.permission_bytes;
    if new_len <= old_len {
        return Err(GibbonError::ResizeDirection);
    }
    seed::seed_range(
        state,
        SeedKind::Permission,
        (old_len as u64) * 8 + 1,
        (new_len as u64) * 8,
    );
    for row in state.groups.values_mut() {
        row.permissions = row.permissions.resized(new_len);
    }
    for row in state.users.values_mut() {
        row.permissions = row.permissions.resized(new_len);
    }
    state.permission_bytes = new_len;
    info!("expanded permission universe: {old_len} -> {new_len} byte(s)");
    Ok(())
}

pub(crate) fn shrink_permissions(state: &mut StoreState, new_len: usize) -> GibbonResult<()> {
    let old_len = state.permission_bytes;
    if new_len == 0 || new_len >= old_len {
        return Err(GibbonError::ResizeDirection);
    }
    let boundary = (new_len as u64) * 8;
    // the safety check precedes every destructive write
    if state
        .permissions
        .range(boundary + 1..)
        .any(|(_, row)| row.allocated)
    {
        return Err(GibbonError::ShrinkDeniesLive(Entity::Permission));
    }
    state.permissions.retain(|position, _| *position <= boundary);
    for row in state.groups.values_mut() {
        row.permissions = row.permissions.resized(new_len);
    }
    for row in state.users.values_mut() {
        row.permissions = row.permissions.resized(new_len);
    }
    state.permission_bytes = new_len;
    info!("shrank permission universe: {old_len} -> {new_len} byte(s)");
    Ok(())
}

pub(crate) fn expand_groups(state: &mut StoreState, new_len: usize) -> GibbonResult<()> {
    let old_len = state.group_bytes;
    if new_len <= old_len {
        return Err(GibbonError::ResizeDirection);
    }
    seed::seed_range(
        state,
        SeedKind::Group,
        (old_len as u64) * 8 + 1,
        (new_len as u64) * 8,
    );
    for row in state.users.values_mut() {
        row.groups = row.groups.resized(new_len);
    }
    state.group_bytes = new_len;
    info!("expanded group universe: {old_len} -> {new_len} byte(s)");
    Ok(())
}

pub(crate) fn shrink_groups(state: &mut StoreState, new_len: usize) -> GibbonResult<()> {
    let old_len = state.group_bytes;
    if new_len == 0 || new_len >= old_len {
        return Err(GibbonError::ResizeDirection);
    }
    let boundary = (new_len as u64) * 8;
    if state
        .groups
        .range(boundary + 1..)
        .any(|(_, row)| row.allocated)
    {
        return Err(GibbonError::ShrinkDeniesLive(Entity::Group));
    }
    state.groups.retain(|position, _| *position <= boundary);
    for row in state.users.values_mut() {
        row.groups = row.groups.resized(new_len);
    }
    state.group_bytes = new_len;
    info!("shrank group universe: {old_len} -> {new_len} byte(s)");
    Ok(())
}
