/*
 * Created on Thu Jan 11 2024
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

use crate::data::{
    cell::Datacell,
    dict::{self, MetaDict},
};

#[test]
fn sanitize_strips_operator_keys() {
    let dict: MetaDict = into_dict! {
        "name" => "alice",
        "$set" => "evil",
        "a.b.c" => "dotted",
    };
    let clean = dict::sanitize(dict);
    assert_eq!(clean.len(), 1);
    assert!(clean.contains_key("name"));
}

#[test]
fn sanitize_strips_reserved_keys() {
    let dict: MetaDict = into_dict! {
        "position" => 42u64,
        "allocated" => true,
        "permissions" => "nope",
        "groups" => "nope",
        "role" => "admin",
    };
    let clean = dict::sanitize(dict);
    assert_eq!(clean.len(), 1);
    assert_eq!(clean.get("role").and_then(|c| c.try_str()), Some("admin"));
}

#[test]
fn merge_upserts() {
    let mut current: MetaDict = into_dict! {
        "a" => 1u64,
        "b" => 2u64,
    };
    dict::merge_into(
        &mut current,
        into_dict! {
            "b" => 20u64,
            "c" => 30u64,
        },
    );
    assert_eq!(current.get("a").and_then(|c| c.try_uint()), Some(1));
    assert_eq!(current.get("b").and_then(|c| c.try_uint()), Some(20));
    assert_eq!(current.get("c").and_then(|c| c.try_uint()), Some(30));
}

#[test]
fn filter_matching_is_equality_on_a_subset() {
    let row: MetaDict = into_dict! {
        "email" => "a@b",
        "tier" => 3u64,
    };
    assert!(dict::matches_filter(&row, &into_dict!()));
    assert!(dict::matches_filter(&row, &into_dict!("email" => "a@b")));
    assert!(dict::matches_filter(
        &row,
        &into_dict!("email" => "a@b", "tier" => 3u64)
    ));
    assert!(!dict::matches_filter(&row, &into_dict!("email" => "x@y")));
    assert!(!dict::matches_filter(&row, &into_dict!("missing" => true)));
    // same key, different type: no match
    assert!(!dict::matches_filter(&row, &into_dict!("tier" => "3")));
}

#[test]
fn cell_accessors_are_type_checked() {
    let c = Datacell::new_uint(7);
    assert_eq!(c.try_uint(), Some(7));
    assert_eq!(c.try_str(), None);
    let c: Datacell = "hello".into();
    assert_eq!(c.try_str(), Some("hello"));
    let c: Datacell = vec![1u8, 2, 3].into();
    assert_eq!(c.try_bin(), Some(&[1u8, 2, 3][..]));
    assert_eq!(Datacell::new_bool(true).try_bool(), Some(true));
    assert_eq!(Datacell::new_sint(-3).try_sint(), Some(-3));
    assert_eq!(Datacell::new_float(0.5).try_float(), Some(0.5));
}
