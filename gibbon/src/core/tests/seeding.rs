/*
 * Created on Sat Jan 27 2024
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
    super::engine,
    crate::error::GibbonError,
};

#[test]
fn seeding_creates_the_full_universe() {
    let g = engine(2, 3);
    assert!(g.initialize(None).unwrap());
    let permissions: Vec<u64> = (1..=16).collect();
    assert_eq!(g.find_permissions(None, &permissions).unwrap().len(), 16);
    let groups: Vec<u64> = (1..=24).collect();
    assert_eq!(g.find_groups(None, &groups).unwrap().len(), 24);
    // everything starts free
    assert!(g.find_all_allocated_permissions(None).unwrap().is_empty());
    assert!(g.find_all_allocated_groups(None).unwrap().is_empty());
}

#[test]
fn allocated_plus_free_always_covers_the_universe() {
    let g = engine(2, 2);
    g.initialize(None).unwrap();
    for _ in 0..5 {
        g.allocate_permission(None, into_dict!()).unwrap();
    }
    g.deallocate_permissions(None, [2u64, 4]).unwrap();
    let all: Vec<u64> = (1..=16).collect();
    let rows = g.find_permissions(None, &all).unwrap();
    let allocated = rows.iter().filter(|r| r.allocated).count();
    let free = rows.iter().filter(|r| !r.allocated).count();
    assert_eq!(allocated + free, 16);
    assert_eq!(allocated, 3);
}

#[test]
fn low_level_seed_refuses_a_populated_store() {
    let g = engine(1, 1);
    g.seed(None).unwrap();
    assert!(matches!(g.seed(None), Err(GibbonError::AlreadySeeded)));
}

#[test]
fn initialize_is_idempotent_and_preserves_allocations() {
    let g = engine(1, 1);
    assert!(g.initialize(None).unwrap());
    let row = g
        .allocate_permission(None, into_dict!("name" => "keepme"))
        .unwrap();
    assert!(!g.initialize(None).unwrap());
    let rows = g.find_permissions(None, &[row.position]).unwrap();
    assert_eq!(
        rows[0].meta.get("name").and_then(|c| c.try_str()),
        Some("keepme")
    );
    let all: Vec<u64> = (1..=8).collect();
    assert_eq!(g.find_permissions(None, &all).unwrap().len(), 8);
}
