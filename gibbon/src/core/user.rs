/*
 * Created on Wed Jan 17 2024
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
    super::group::GroupPermissions,
    crate::{
        data::{
            dict::{self, MetaDict},
            mask::Mask,
            uuid::Uuid,
        },
        error::GibbonResult,
        store::StoreState,
    },
    core::ops::Bound,
};

/// A user. Unlike slots, users are free-form: they are created and removed
/// explicitly and both masks start out zeroed.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRow {
    pub id: Uuid,
    /// group membership, one bit per group position
    pub groups: Mask,
    /// derived: always the union of `permissions` over the allocated groups
    /// named by `groups`
    pub permissions: Mask,
    pub meta: MetaDict,
}

impl UserRow {
    pub(crate) fn new(group_bytes: usize, permission_bytes: usize, meta: MetaDict) -> Self {
        Self {
            id: Uuid::new(),
            groups: Mask::zeroed(group_bytes),
            permissions: Mask::zeroed(permission_bytes),
            meta,
        }
    }
}

/// What user-facing operations select on: an exact id, flat metadata
/// equality, or both. The default filter matches everything.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub id: Option<Uuid>,
    pub meta: MetaDict,
}

impl UserFilter {
    pub fn by_id(id: Uuid) -> Self {
        Self {
            id: Some(id),
            meta: MetaDict::new(),
        }
    }
    pub fn by_meta(meta: MetaDict) -> Self {
        Self { id: None, meta }
    }
    pub(crate) fn matches(&self, row: &UserRow) -> bool {
        if let Some(id) = self.id {
            if id != row.id {
                return false;
            }
        }
        dict::matches_filter(&row.meta, &self.meta)
    }
}

impl From<Uuid> for UserFilter {
    fn from(id: Uuid) -> Self {
        Self::by_id(id)
    }
}

impl From<MetaDict> for UserFilter {
    fn from(meta: MetaDict) -> Self {
        Self::by_meta(meta)
    }
}

/// Operations over the user collection
#[derive(Debug, Clone, Default)]
pub(crate) struct UserModel;

impl UserModel {
    pub fn create(&self, state: &mut StoreState, meta: MetaDict) -> UserRow {
        let row = UserRow::new(
            state.group_bytes,
            state.permission_bytes,
            dict::sanitize(meta),
        );
        let _ = state.users.insert(row.id, row.clone());
        row
    }
    /// Delete every matching user; returns how many went away
    pub fn remove(&self, state: &mut StoreState, filter: &UserFilter) -> usize {
        let before = state.users.len();
        state.users.retain(|_, row| !filter.matches(row));
        before - state.users.len()
    }
    pub fn find_by_filter(&self, state: &StoreState, filter: &UserFilter) -> Vec<UserRow> {
        state
            .users
            .values()
            .filter(|row| filter.matches(row))
            .cloned()
            .collect()
    }
    pub fn find_by_permissions(&self, state: &StoreState, permissions: &Mask) -> Vec<UserRow> {
        state
            .users
            .values()
            .filter(|row| row.permissions.intersects(permissions))
            .cloned()
            .collect()
    }
    pub fn find_by_groups(&self, state: &StoreState, groups: &Mask) -> Vec<UserRow> {
        state
            .users
            .values()
            .filter(|row| row.groups.intersects(groups))
            .cloned()
            .collect()
    }
    /// Metadata-only update; masks are never touched here
    pub fn update_metadata(
        &self,
        state: &mut StoreState,
        filter: &UserFilter,
        meta: MetaDict,
        batch: usize,
    ) -> GibbonResult<usize> {
        let meta = dict::sanitize(meta);
        update_streamed(state, batch, |row| filter.matches(row), |_, mut row| {
            dict::merge_into(&mut row.meta, meta.clone());
            Ok(row)
        })
    }
    /// Clear the `permissions` bits from every user that has any of them.
    /// Runs after a permission deallocation.
    pub fn unset_permissions(
        &self,
        state: &mut StoreState,
        permissions: &Mask,
        batch: usize,
    ) -> GibbonResult<usize> {
        update_streamed(
            state,
            batch,
            |row| row.permissions.intersects(permissions),
            |_, mut row| {
                row.permissions.subtract(permissions);
                Ok(row)
            },
        )
    }
    /// Clear the `groups` bits from every member of any of them, then
    /// recompute the derived mask from whatever groups remain. Runs after a
    /// group deallocation, which is why the resolver must read the same
    /// state this write is going to.
    pub fn unset_groups<R: GroupPermissions>(
        &self,
        state: &mut StoreState,
        groups: &Mask,
        resolver: &R,
        batch: usize,
    ) -> GibbonResult<usize> {
        update_streamed(
            state,
            batch,
            |row| row.groups.intersects(groups),
            |state, mut row| {
                row.groups.subtract(groups);
                row.permissions = resolver.permissions_for_groups(state, &row.groups)?;
                Ok(row)
            },
        )
    }
    /// OR the group mask and the (already aggregated) permission mask into
    /// every user matching the filter
    pub fn subscribe_to_groups_and_permissions(
        &self,
        state: &mut StoreState,
        filter: &UserFilter,
        groups: &Mask,
        permissions: &Mask,
        batch: usize,
    ) -> GibbonResult<usize> {
        update_streamed(state, batch, |row| filter.matches(row), |_, mut row| {
            row.groups.merge(groups);
            row.permissions.merge(permissions);
            Ok(row)
        })
    }
    /// OR `permissions` into every member of any group in `groups`
    pub fn subscribe_to_permissions_for_groups(
        &self,
        state: &mut StoreState,
        groups: &Mask,
        permissions: &Mask,
        batch: usize,
    ) -> GibbonResult<usize> {
        update_streamed(
            state,
            batch,
            |row| row.groups.intersects(groups),
            |_, mut row| {
                row.permissions.merge(permissions);
                Ok(row)
            },
        )
    }
    /// Drop group membership for matching users and rederive their
    /// permission mask from the groups they still have
    pub fn unsubscribe_from_groups<R: GroupPermissions>(
        &self,
        state: &mut StoreState,
        filter: &UserFilter,
        groups: &Mask,
        resolver: &R,
        batch: usize,
    ) -> GibbonResult<usize> {
        update_streamed(
            state,
            batch,
            |row| filter.matches(row) && row.groups.intersects(groups),
            |state, mut row| {
                row.groups.subtract(groups);
                row.permissions = resolver.permissions_for_groups(state, &row.groups)?;
                Ok(row)
            },
        )
    }
    /// Rederive the permission mask of every member of any group in
    /// `groups`. Runs after group-side permission changes.
    pub fn recalculate_permissions_for_groups<R: GroupPermissions>(
        &self,
        state: &mut StoreState,
        groups: &Mask,
        resolver: &R,
        batch: usize,
    ) -> GibbonResult<usize> {
        update_streamed(
            state,
            batch,
            |row| row.groups.intersects(groups),
            |state, mut row| {
                row.permissions = resolver.permissions_for_groups(state, &row.groups)?;
                Ok(row)
            },
        )
    }
    /// Rederive the permission mask of every matching user from its current
    /// group membership
    pub fn recalculate_permissions<R: GroupPermissions>(
        &self,
        state: &mut StoreState,
        filter: &UserFilter,
        resolver: &R,
        batch: usize,
    ) -> GibbonResult<usize> {
        update_streamed(state, batch, |row| filter.matches(row), |state, mut row| {
            row.permissions = resolver.permissions_for_groups(state, &row.groups)?;
            Ok(row)
        })
    }
}

/// Stream the user collection in key-ordered batches of `batch` ids and
/// rewrite every row `pred` selects with `apply`. Only one batch of row
/// clones is in flight at a time, so memory stays bounded by
/// `mutation_concurrency × row` no matter how many users match. Per-row
/// updates are commutative, so batch boundaries are unobservable.
fn update_streamed(
    state: &mut StoreState,
    batch: usize,
    pred: impl Fn(&UserRow) -> bool,
    apply: impl Fn(&StoreState, UserRow) -> GibbonResult<UserRow>,
) -> GibbonResult<usize> {
    debug_assert_ne!(batch, 0);
    let mut checkpoint: Option<Uuid> = None;
    let mut touched = 0usize;
    loop {
        let lower = match checkpoint {
            Some(id) => Bound::Excluded(id),
            None => Bound::Unbounded,
        };
        let ids: Vec<Uuid> = state
            .users
            .range((lower, Bound::Unbounded))
            .take(batch)
            .map(|(id, _)| *id)
            .collect();
        let Some(last) = ids.last() else { break };
        checkpoint = Some(*last);
        for id in ids {
            // clone out, transform against the current state, write back
            let row = match state.users.get(&id) {
                Some(row) if pred(row) => row.clone(),
                _ => continue,
            };
            let row = apply(&*state, row)?;
            let _ = state.users.insert(id, row);
            touched += 1;
        }
    }
    if touched > 0 {
        debug!("bulk user mutation touched {touched} row(s)");
    }
    Ok(touched)
}
