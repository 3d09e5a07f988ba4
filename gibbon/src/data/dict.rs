/*
 * Created on Wed Jan 10 2024
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

use {crate::data::cell::Datacell, std::collections::HashMap};

/// A flat caller-metadata dictionary
pub type MetaDict = HashMap<Box<str>, Datacell>;

/// Field names the engine owns on stored rows. Caller metadata must never
/// shadow these.
const RESERVED_KEYS: [&str; 4] = ["position", "allocated", "permissions", "groups"];

/// Strip keys the store must never see from caller data: operator-style keys
/// (`$` prefix or an embedded `.`) and the engine-owned field names.
pub fn sanitize(dict: MetaDict) -> MetaDict {
    dict.into_iter()
        .filter(|(key, _)| {
            !(key.starts_with('$') || key.contains('.') || RESERVED_KEYS.contains(&&**key))
        })
        .collect()
}

/// Upsert `patch` into `current` (metadata updates merge rather than replace)
pub fn merge_into(current: &mut MetaDict, patch: MetaDict) {
    for (key, value) in patch {
        let _ = current.insert(key, value);
    }
}

/// true iff every entry of `filter` is present in `dict` with an equal value
pub fn matches_filter(dict: &MetaDict, filter: &MetaDict) -> bool {
    filter
        .iter()
        .all(|(key, value)| dict.get(key).map_or(false, |v| v == value))
}
