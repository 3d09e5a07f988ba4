/*
 * Created on Tue Jan 09 2024
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

//! # Gibbon
//!
//! Gibbon keeps three coupled collections (permissions, groups and users)
//! consistent with one another. Permissions and groups are pre-seeded *slots*
//! identified by an immutable 1-based position inside a fixed-width bitmask
//! universe; users carry a group-membership mask plus a derived permission
//! mask that always equals the union of their groups' permission masks.
//!
//! The [`Gibbon`] facade is the only mutation surface. Every composite
//! operation runs inside a store session so concurrent callers never observe
//! a partial propagation; callers may also pass their own [`Session`] to
//! stretch one atomic boundary over several facade calls.

#[macro_use]
extern crate log;

#[macro_use]
mod macros;
pub mod config;
mod core;
pub mod data;
pub mod error;
mod facade;
mod store;

pub use {
    crate::core::{
        group::GroupRow,
        permission::PermissionRow,
        user::{UserFilter, UserRow},
    },
    config::Configuration,
    data::{
        cell::Datacell,
        dict::MetaDict,
        mask::{Mask, MaskSource},
        uuid::Uuid,
    },
    error::{Entity, GibbonError, GibbonResult},
    facade::Gibbon,
    store::{Datastore, Session},
};

/// The library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// The project homepage
pub const URL: &str = "https://github.com/ohsayan/gibbon";
