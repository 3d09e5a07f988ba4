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

//! The three models and the operations they run against a store state. Every
//! function here takes the state it works on; the facade decides whether
//! that state is a session overlay or the committed view, which is all the
//! "session awareness" the consistency rules need.

pub(crate) mod group;
pub(crate) mod permission;
pub(crate) mod resize;
pub(crate) mod seed;
pub(crate) mod slots;
pub(crate) mod user;
#[cfg(test)]
mod tests;
