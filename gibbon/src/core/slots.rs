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

//! The slot allocator shared by the group and permission collections.
//!
//! Slots are created once by the seeder and then only toggle between free
//! and allocated; the position is immutable and reused across allocation
//! cycles. Allocation takes the lowest free position: the collections are
//! ordered by position, so the first free row wins. Atomicity against racing
//! allocators comes from the store's optimistic commit: the loser's session
//! fails to commit, retries, and observes the winner's claim.

use {
    crate::{
        data::dict::{self, MetaDict},
        error::{Entity, GibbonError, GibbonResult},
    },
    std::collections::BTreeMap,
};

/// Row shape shared by the two slot collections
pub(crate) trait SlotRow: Clone {
    const ENTITY: Entity;
    /// a freshly seeded (or reset) free row; `mask_len` is ignored by rows
    /// that carry no mask
    fn new_free(position: u64, mask_len: usize) -> Self;
    fn position(&self) -> u64;
    fn is_allocated(&self) -> bool;
    fn into_allocated(self) -> Self;
    fn meta_mut(&mut self) -> &mut MetaDict;
}

/// Claim the lowest free slot: mark it allocated, attach the sanitized
/// caller metadata and return the post-image
pub(crate) fn allocate<R: SlotRow>(
    slots: &mut BTreeMap<u64, R>,
    mask_len: usize,
    meta: MetaDict,
) -> GibbonResult<R> {
    let position = slots
        .values()
        .find(|row| !row.is_allocated())
        .map(R::position)
        .ok_or(GibbonError::Exhausted(R::ENTITY))?;
    // rebuild from scratch so nothing from a prior allocation cycle leaks
    let mut row = R::new_free(position, mask_len);
    *row.meta_mut() = dict::sanitize(meta);
    let row = row.into_allocated();
    let _ = slots.insert(position, row.clone());
    Ok(row)
}

/// Reset every listed slot to its seeded state (allocated flag down, metadata
/// erased, mask zeroed where the row carries one). Positions without a row
/// match nothing, mirroring a replace-by-filter.
pub(crate) fn deallocate<R: SlotRow>(
    slots: &mut BTreeMap<u64, R>,
    mask_len: usize,
    positions: &[u64],
) {
    for position in positions {
        if slots.contains_key(position) {
            let _ = slots.insert(*position, R::new_free(*position, mask_len));
        }
    }
}

/// true iff every listed position exists with the wanted allocation state
pub(crate) fn validate<R: SlotRow>(
    slots: &BTreeMap<u64, R>,
    positions: &[u64],
    want_allocated: bool,
) -> bool {
    let matching = positions
        .iter()
        .filter(|p| {
            slots
                .get(*p)
                .map_or(false, |row| row.is_allocated() == want_allocated)
        })
        .count();
    matching == positions.len()
}

/// Insert fresh free rows for `from..=to`. Used by the seeder and by the
/// expand protocol; existing rows must not be present in the range.
pub(crate) fn seed_range<R: SlotRow>(
    slots: &mut BTreeMap<u64, R>,
    mask_len: usize,
    from: u64,
    to: u64,
) {
    for position in from..=to {
        debug_assert!(!slots.contains_key(&position), "seeding over a live row");
        let _ = slots.insert(position, R::new_free(position, mask_len));
    }
}
