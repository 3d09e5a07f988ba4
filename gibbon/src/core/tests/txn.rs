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

use {super::seeded, crate::error::GibbonError};

#[test]
fn rolled_back_session_leaves_no_trace() {
    let g = seeded(2, 2);
    g.allocate_permission(None, into_dict!()).unwrap();
    g.allocate_group(None, into_dict!()).unwrap();
    g.subscribe_permissions_to_groups(None, [1u64], [1u64]).unwrap();
    let before = g.datastore().read(|state| state.clone());
    let mut session = g.session();
    g.create_user(Some(&mut session), into_dict!("email" => "tx@u"))
        .unwrap();
    g.subscribe_users_to_groups(Some(&mut session), into_dict!("email" => "tx@u"), [1u64])
        .unwrap();
    // the session observes its own writes...
    assert_eq!(
        g.find_users(Some(&session), into_dict!("email" => "tx@u"))
            .unwrap()
            .len(),
        1
    );
    session.rollback();
    // ...but the store never saw any of it
    assert!(g
        .find_users(None, into_dict!("email" => "tx@u"))
        .unwrap()
        .is_empty());
    assert_eq!(g.datastore().read(|state| state.clone()), before);
}

#[test]
fn committed_session_spans_multiple_calls() {
    let g = seeded(2, 2);
    g.allocate_group(None, into_dict!()).unwrap();
    let mut session = g.session();
    g.create_user(Some(&mut session), into_dict!("email" => "tx@u"))
        .unwrap();
    g.subscribe_users_to_groups(Some(&mut session), into_dict!("email" => "tx@u"), [1u64])
        .unwrap();
    session.commit().unwrap();
    let user = &g.find_users(None, into_dict!("email" => "tx@u")).unwrap()[0];
    assert_eq!(user.groups.positions(), vec![1]);
}

#[test]
fn failed_composite_aborts_every_prior_write() {
    let g = seeded(2, 2);
    g.allocate_permission(None, into_dict!()).unwrap();
    let before = g.datastore().read(|state| state.clone());
    // deallocation succeeds (step 1 writes land in the overlay), then the
    // subscription fails the allocation check and the overlay is dropped
    let r = g.datastore().transact(|session| {
        g.deallocate_permissions(Some(&mut *session), [1u64])?;
        g.subscribe_permissions_to_groups(Some(&mut *session), [1u64], [1u64])?;
        Ok(())
    });
    assert!(matches!(r, Err(GibbonError::NotAllocated(_))));
    assert_eq!(g.datastore().read(|state| state.clone()), before);
}

#[test]
fn a_session_is_isolated_from_later_commits() {
    let g = seeded(2, 2);
    let session = g.session();
    g.allocate_permission(None, into_dict!()).unwrap();
    // the session still sees the pre-allocation state
    assert!(g
        .find_all_allocated_permissions(Some(&session))
        .unwrap()
        .is_empty());
    assert_eq!(g.find_all_allocated_permissions(None).unwrap().len(), 1);
}
