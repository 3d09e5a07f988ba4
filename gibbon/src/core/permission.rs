/*
 * Created on Mon Jan 15 2024
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
        data::dict::{self, MetaDict},
        error::{Entity, GibbonResult},
        store::StoreState,
    },
};

/// A permission slot. Pre-seeded; `position` is immutable for the lifetime
/// of the universe and `meta` is meaningful only while `allocated`.
#[derive(Debug, Clone, PartialEq)]
pub struct PermissionRow {
    pub position: u64,
    pub allocated: bool,
    pub meta: MetaDict,
}

impl PermissionRow {
    pub(crate) fn new_free(position: u64) -> Self {
        Self {
            position,
            allocated: false,
            meta: MetaDict::new(),
        }
    }
}

impl SlotRow for PermissionRow {
    const ENTITY: Entity = Entity::Permission;
    fn new_free(position: u64, _mask_len: usize) -> Self {
        Self::new_free(position)
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

/// Operations over the permission collection
#[derive(Debug, Clone, Default)]
pub(crate) struct PermissionModel;

impl PermissionModel {
    pub fn allocate(&self, state: &mut StoreState, meta: MetaDict) -> GibbonResult<PermissionRow> {
        slots::allocate(&mut state.permissions, 0, meta)
    }
    pub fn deallocate(&self, state: &mut StoreState, positions: &[u64]) {
        slots::deallocate(&mut state.permissions, 0, positions)
    }
    pub fn validate(&self, state: &StoreState, positions: &[u64], want_allocated: bool) -> bool {
        slots::validate(&state.permissions, positions, want_allocated)
    }
    pub fn find(&self, state: &StoreState, positions: &[u64]) -> Vec<PermissionRow> {
        positions
            .iter()
            .filter_map(|p| state.permissions.get(p).cloned())
            .collect()
    }
    pub fn find_all_allocated(&self, state: &StoreState) -> Vec<PermissionRow> {
        state
            .permissions
            .values()
            .filter(|row| row.allocated)
            .cloned()
            .collect()
    }
    /// Merge sanitized metadata into an *allocated* row; `None` when there is
    /// no allocated permission at the position
    pub fn update_metadata(
        &self,
        state: &mut StoreState,
        position: u64,
        meta: MetaDict,
    ) -> Option<PermissionRow> {
        let row = state
            .permissions
            .get_mut(&position)
            .filter(|row| row.allocated)?;
        dict::merge_into(&mut row.meta, dict::sanitize(meta));
        Some(row.clone())
    }
}
