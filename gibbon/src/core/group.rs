/*
 * Created on Tue Jan 16 2024
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
    super::slots::{self, SlotRow},
    crate::{
        data::{
            dict::{self, MetaDict},
            mask::Mask,
        },
        error::{Entity, GibbonResult},
        store::StoreState,
    },
};

/// A group slot: a permission slot plus the mask of permissions this group
/// grants
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRow {
    pub position: u64,
    pub allocated: bool,
    /// the subset of the permission universe this group grants
    pub permissions: Mask,
    pub meta: MetaDict,
}

impl GroupRow {
    pub(crate) fn new_free(position: u64, permission_bytes: usize) -> Self {
        Self {
            position,
            allocated: false,
            permissions: Mask::zeroed(permission_bytes),
            meta: MetaDict::new(),
        }
    }
}

impl SlotRow for GroupRow {
    const ENTITY: Entity = Entity::Group;
    fn new_free(position: u64, mask_len: usize) -> Self {
        Self::new_free(position, mask_len)
    }
    fn position(&self) -> u64 {
        self.position
    }
    fn is_allocated(&self) -> bool {
        self.allocated
    }
    fn into_allocated(mut self) -> Self {
        self.allocated = true;
        self
    }
    fn meta_mut(&mut self) -> &mut MetaDict {
        &mut self.meta
    }
}

/// The one capability the user model needs from the group side: the union of
/// permission masks over a set of groups. Injected at call time so the user
/// model reads through whatever state (session overlay or committed view)
/// the current operation is running against.
pub(crate) trait GroupPermissions {
    fn permissions_for_groups(&self, state: &StoreState, groups: &Mask) -> GibbonResult<Mask>;
}

/// Operations over the group collection
#[derive(Debug, Clone, Default)]
pub(crate) struct GroupModel;

impl GroupModel {
    /// Allocation also rewrites the permission mask to zero, clearing
    /// anything a prior allocation cycle may have left behind
    pub fn allocate(&self, state: &mut StoreState, meta: MetaDict) -> GibbonResult<GroupRow> {
        let mask_len = state.permission_bytes;
        slots::allocate(&mut state.groups, mask_len, meta)
    }
    pub fn deallocate(&self, state: &mut StoreState, positions: &[u64]) {
        let mask_len = state.permission_bytes;
        slots::deallocate(&mut state.groups, mask_len, positions)
    }
    pub fn validate(&self, state: &StoreState, positions: &[u64], want_allocated: bool) -> bool {
        slots::validate(&state.groups, positions, want_allocated)
    }
    pub fn find(&self, state: &StoreState, positions: &[u64]) -> Vec<GroupRow> {
        positions
            .iter()
            .filter_map(|p| state.groups.get(p).cloned())
            .collect()
    }
    pub fn find_all_allocated(&self, state: &StoreState) -> Vec<GroupRow> {
        state
            .groups
            .values()
            .filter(|row| row.allocated)
            .cloned()
            .collect()
    }
    /// Rows whose permission mask shares any bit with `permissions`,
    /// filtered by allocation state
    pub fn find_by_permissions(
        &self,
        state: &StoreState,
        permissions: &Mask,
        want_allocated: bool,
    ) -> Vec<GroupRow> {
        state
            .groups
            .values()
            .filter(|row| row.allocated == want_allocated && row.permissions.intersects(permissions))
            .cloned()
            .collect()
    }
    /// OR `permissions` into every group named by `groups`
    pub fn subscribe_permissions(&self, state: &mut StoreState, groups: &Mask, permissions: &Mask) {
        for row in state.groups.values_mut() {
            if mask_names_position(groups, row.position) {
                row.permissions.merge(permissions);
            }
        }
    }
    /// Clear the `permissions` bits from every group named by `groups`
    pub fn unsubscribe_permissions(
        &self,
        state: &mut StoreState,
        groups: &Mask,
        permissions: &Mask,
    ) {
        for row in state.groups.values_mut() {
            if mask_names_position(groups, row.position) {
                row.permissions.subtract(permissions);
            }
        }
    }
    /// Clear the `permissions` bits from every group that has any of them.
    /// Runs after a permission deallocation.
    pub fn unset_permissions(&self, state: &mut StoreState, permissions: &Mask) {
        for row in state.groups.values_mut() {
            if row.permissions.intersects(permissions) {
                row.permissions.subtract(permissions);
            }
        }
    }
    /// Merge sanitized metadata into an *allocated* row; `None` when there is
    /// no allocated group at the position
    pub fn update_metadata(
        &self,
        state: &mut StoreState,
        position: u64,
        meta: MetaDict,
    ) -> Option<GroupRow> {
        let row = state.groups.get_mut(&position).filter(|row| row.allocated)?;
        dict::merge_into(&mut row.meta, dict::sanitize(meta));
        Some(row.clone())
    }
}

impl GroupPermissions for GroupModel {
    /// The defining function of the derived user permission mask: the union
    /// of `permissions` over every allocated group whose position is set in
    /// `groups`
    fn permissions_for_groups(&self, state: &StoreState, groups: &Mask) -> GibbonResult<Mask> {
        let mut union = Mask::try_zeroed(state.permission_bytes)?;
        for row in state.groups.values() {
            if row.allocated && mask_names_position(groups, row.position) {
                union.merge(&row.permissions);
            }
        }
        Ok(union)
    }
}

/// true iff `position` is inside the mask's universe with its bit set. A
/// position beyond the mask (possible mid-resize) names nothing.
fn mask_names_position(mask: &Mask, position: u64) -> bool {
    mask.is_set(position).unwrap_or(false)
}
