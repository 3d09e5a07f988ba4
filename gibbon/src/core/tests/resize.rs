/*
 * Created on Fri Jan 26 2024
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
    crate::{
        error::{Entity, GibbonError},
        facade::Gibbon,
    },
};

fn wired(g: &Gibbon) {
    g.allocate_permission(None, into_dict!()).unwrap();
    g.allocate_group(None, into_dict!()).unwrap();
    g.subscribe_permissions_to_groups(None, [1u64], [1u64]).unwrap();
    g.create_user(None, into_dict!("email" => "r@x")).unwrap();
    g.subscribe_users_to_groups(None, into_dict!("email" => "r@x"), [1u64])
        .unwrap();
}

#[test]
fn expand_then_shrink_permissions_is_the_identity() {
    let g = seeded(2, 2);
    wired(&g);
    g.expand_permissions(None, 4).unwrap();
    assert_eq!(g.find_permissions(None, &[32]).unwrap().len(), 1);
    let group = &g.find_groups(None, &[1]).unwrap()[0];
    assert_eq!(group.permissions.len(), 4);
    assert_eq!(group.permissions.positions(), vec![1]);
    let user = &g.find_users(None, into_dict!("email" => "r@x")).unwrap()[0];
    assert_eq!(user.permissions.len(), 4);
    assert_eq!(user.permissions.positions(), vec![1]);
    // nothing was allocated above the old boundary, so this must be a clean
    // inverse
    g.shrink_permissions(None, 2).unwrap();
    let group = &g.find_groups(None, &[1]).unwrap()[0];
    assert_eq!(group.permissions.len(), 2);
    assert_eq!(group.permissions.positions(), vec![1]);
    let user = &g.find_users(None, into_dict!("email" => "r@x")).unwrap()[0];
    assert_eq!(user.permissions.len(), 2);
    assert_eq!(user.permissions.positions(), vec![1]);
    assert!(g.find_permissions(None, &[32]).unwrap().is_empty());
}

#[test]
fn shrink_refuses_to_drop_live_slots() {
    let g = seeded(2, 2);
    wired(&g);
    // occupy every slot, including position 16
    for _ in 0..15 {
        g.allocate_permission(None, into_dict!()).unwrap();
    }
    let before = g.datastore().read(|state| state.clone());
    assert!(matches!(
        g.shrink_permissions(None, 1),
        Err(GibbonError::ShrinkDeniesLive(Entity::Permission))
    ));
    // the safety check ran before any destructive write
    assert_eq!(g.datastore().read(|state| state.clone()), before);
}

#[test]
fn expand_and_shrink_groups_rewrite_membership_masks() {
    let g = seeded(2, 2);
    wired(&g);
    g.expand_groups(None, 3).unwrap();
    assert_eq!(g.find_groups(None, &[24]).unwrap().len(), 1);
    let user = &g.find_users(None, into_dict!("email" => "r@x")).unwrap()[0];
    assert_eq!(user.groups.len(), 3);
    assert_eq!(user.groups.positions(), vec![1]);
    g.shrink_groups(None, 2).unwrap();
    let user = &g.find_users(None, into_dict!("email" => "r@x")).unwrap()[0];
    assert_eq!(user.groups.len(), 2);
    assert_eq!(user.groups.positions(), vec![1]);
}

#[test]
fn resize_direction_is_enforced() {
    let g = seeded(2, 2);
    assert!(matches!(
        g.expand_permissions(None, 2),
        Err(GibbonError::ResizeDirection)
    ));
    assert!(matches!(
        g.expand_permissions(None, 1),
        Err(GibbonError::ResizeDirection)
    ));
    assert!(matches!(
        g.shrink_permissions(None, 2),
        Err(GibbonError::ResizeDirection)
    ));
    assert!(matches!(
        g.shrink_permissions(None, 0),
        Err(GibbonError::ResizeDirection)
    ));
    assert!(matches!(
        g.expand_groups(None, 2),
        Err(GibbonError::ResizeDirection)
    ));
    assert!(matches!(
        g.shrink_groups(None, 3),
        Err(GibbonError::ResizeDirection)
    ));
}

#[test]
fn allocation_after_expand_still_takes_the_lowest_free() {
    let g = seeded(1, 1);
    g.allocate_permission(None, into_dict!()).unwrap();
    g.allocate_permission(None, into_dict!()).unwrap();
    g.deallocate_permissions(None, [1u64]).unwrap();
    g.expand_permissions(None, 2).unwrap();
    // the freed slot below the old boundary wins over the fresh range
    assert_eq!(g.allocate_permission(None, into_dict!()).unwrap().position, 1);
    assert_eq!(g.allocate_permission(None, into_dict!()).unwrap().position, 3);
}

#[test]
fn expanded_universe_is_allocatable_to_the_new_edge() {
    let g = seeded(1, 1);
    for _ in 0..8 {
        g.allocate_permission(None, into_dict!()).unwrap();
    }
    g.expand_permissions(None, 2).unwrap();
    for expect in 9..=16u64 {
        assert_eq!(
            g.allocate_permission(None, into_dict!()).unwrap().position,
            expect
        );
    }
    assert!(matches!(
        g.allocate_permission(None, into_dict!()),
        Err(GibbonError::Exhausted(Entity::Permission))
    ));
}
