/*
 * Created on Wed Jan 24 2024
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
    super::seeded,
    crate::error::{Entity, GibbonError},
};

#[test]
fn allocation_is_monotonic_from_fresh_seed() {
    let g = seeded(2, 2);
    for expect in 1..=8u64 {
        let row = g.allocate_permission(None, into_dict!()).unwrap();
        assert_eq!(row.position, expect);
        assert!(row.allocated);
    }
}

#[test]
fn allocation_reuses_lowest_freed_position() {
    let g = seeded(2, 2);
    assert_eq!(g.allocate_permission(None, into_dict!()).unwrap().position, 1);
    assert_eq!(g.allocate_permission(None, into_dict!()).unwrap().position, 2);
    g.deallocate_permissions(None, [1u64]).unwrap();
    // the freed low slot wins over the untouched position 3
    assert_eq!(g.allocate_permission(None, into_dict!()).unwrap().position, 1);
}

#[test]
fn exhaustion_leaves_the_store_unchanged() {
    let g = seeded(1, 1);
    for _ in 0..8 {
        g.allocate_permission(None, into_dict!("name" => "p")).unwrap();
    }
    assert!(matches!(
        g.allocate_permission(None, into_dict!()),
        Err(GibbonError::Exhausted(Entity::Permission))
    ));
    let all = g.find_all_allocated_permissions(None).unwrap();
    assert_eq!(all.len(), 8);
    assert!(all
        .iter()
        .all(|row| row.meta.get("name").and_then(|c| c.try_str()) == Some("p")));
}

#[test]
fn group_exhaustion_names_the_entity() {
    let g = seeded(1, 1);
    for _ in 0..8 {
        g.allocate_group(None, into_dict!()).unwrap();
    }
    assert!(matches!(
        g.allocate_group(None, into_dict!()),
        Err(GibbonError::Exhausted(Entity::Group))
    ));
}

#[test]
fn deallocation_restores_the_seeded_row() {
    let g = seeded(2, 2);
    let permission = g
        .allocate_permission(None, into_dict!("name" => "god"))
        .unwrap();
    let group = g
        .allocate_group(None, into_dict!("name" => "GI Joe"))
        .unwrap();
    g.subscribe_permissions_to_groups(None, [group.position], [permission.position])
        .unwrap();
    g.deallocate_permissions(None, [permission.position]).unwrap();
    g.deallocate_groups(None, [group.position]).unwrap();
    let permission = &g.find_permissions(None, &[1]).unwrap()[0];
    assert!(!permission.allocated);
    assert!(permission.meta.is_empty());
    let group = &g.find_groups(None, &[1]).unwrap()[0];
    assert!(!group.allocated);
    assert!(group.meta.is_empty());
    assert!(group.permissions.is_zero());
}

#[test]
fn reallocation_starts_from_a_clean_group_mask() {
    let g = seeded(2, 2);
    let permission = g.allocate_permission(None, into_dict!()).unwrap();
    let group = g.allocate_group(None, into_dict!()).unwrap();
    g.subscribe_permissions_to_groups(None, [group.position], [permission.position])
        .unwrap();
    g.deallocate_groups(None, [group.position]).unwrap();
    // the next cycle must not inherit the old grants
    let group = g.allocate_group(None, into_dict!()).unwrap();
    assert_eq!(group.position, 1);
    assert!(group.permissions.is_zero());
}

#[test]
fn caller_metadata_is_sanitized() {
    let g = seeded(2, 2);
    let row = g
        .allocate_permission(
            None,
            into_dict!(
                "name" => "ok",
                "$where" => "1 == 1",
                "a.b" => "dotted",
                "position" => 99u64,
                "allocated" => false
            ),
        )
        .unwrap();
    assert_eq!(row.position, 1);
    assert!(row.allocated);
    assert_eq!(row.meta.len(), 1);
    assert_eq!(row.meta.get("name").and_then(|c| c.try_str()), Some("ok"));
}

#[test]
fn metadata_update_requires_an_allocated_slot() {
    let g = seeded(2, 2);
    assert!(g
        .update_permission_metadata(None, 1, into_dict!("name" => "x"))
        .unwrap()
        .is_none());
    let row = g.allocate_permission(None, into_dict!("name" => "x")).unwrap();
    let row = g
        .update_permission_metadata(None, row.position, into_dict!("tier" => 3u64))
        .unwrap()
        .unwrap();
    assert_eq!(row.meta.get("name").and_then(|c| c.try_str()), Some("x"));
    assert_eq!(row.meta.get("tier").and_then(|c| c.try_uint()), Some(3));
}

#[test]
fn allocation_state_validation() {
    let g = seeded(2, 2);
    g.allocate_permission(None, into_dict!()).unwrap();
    g.allocate_permission(None, into_dict!()).unwrap();
    assert!(g.validate_allocated_permissions(None, &[1, 2]).unwrap());
    assert!(!g.validate_allocated_permissions(None, &[1, 2, 3]).unwrap());
    // positions without a row are never valid
    assert!(!g.validate_allocated_permissions(None, &[999]).unwrap());
}
