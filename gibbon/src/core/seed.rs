/*
 * Created on Thu Jan 18 2024
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

use {
    super::{group::GroupRow, permission::PermissionRow, slots},
    crate::{
        error::{GibbonError, GibbonResult},
        store::StoreState,
    },
};

/// Rows inserted per round so one enormous universe does not turn into one
/// enormous allocation
const SEED_BATCH: u64 = 1000;

/// Populate both slot collections: `8·Gb` free group rows and `8·P` free
/// permission rows. Fails with [`GibbonError::AlreadySeeded`] if either
/// collection shows *any* row; repeated initialization must never clobber
/// live allocations. Uniqueness of `position` is structural (the collections
/// are keyed by it), and racing seeders serialize at commit: the loser
/// re-runs, sees the winner's rows and fails the probe.
pub(crate) fn seed(state: &mut StoreState) -> GibbonResult<()> {
    if !state.permissions.is_empty() || !state.groups.is_empty() {
        return Err(GibbonError::AlreadySeeded);
    }
    let permission_slots = (state.permission_bytes as u64) * 8;
    let group_slots = (state.group_bytes as u64) * 8;
    seed_span(state, SeedKind::Permission, 1, permission_slots);
    seed_span(state, SeedKind::Group, 1, group_slots);
    info!("seeded {permission_slots} permission slot(s) and {group_slots} group slot(s)");
    Ok(())
}

/// Which slot collection a seeding span targets
#[derive(Debug, Clone, Copy)]
pub(crate) enum SeedKind {
    Permission,
    Group,
}

/// Insert free rows for `from..=to` without the already-seeded probe. The
/// expand protocol uses this to extend a live universe.
pub(crate) fn seed_range(state: &mut StoreState, kind: SeedKind, from: u64, to: u64) {
    seed_span(state, kind, from, to)
}

fn seed_span(state: &mut StoreState, kind: SeedKind, from: u64, to: u64) {
    let mask_len = state.permission_bytes;
    let mut lo = from;
    while lo <= to {
        let hi = to.min(lo + SEED_BATCH - 1);
        match kind {
            SeedKind::Permission => {
                slots::seed_range::<PermissionRow>(&mut state.permissions, 0, lo, hi);
            }
            SeedKind::Group => {
                slots::seed_range::<GroupRow>(&mut state.groups, mask_len, lo, hi);
            }
        }
        lo = hi + 1;
    }
}
