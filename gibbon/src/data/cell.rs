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

/// A scalar metadata value. Caller metadata is a flat bag of these; the
/// engine never interprets them, it only stores, matches and returns them.
#[derive(Debug, Clone, PartialEq)]
pub enum Datacell {
    Bool(bool),
    UnsignedInt(u64),
    SignedInt(i64),
    Float(f64),
    Str(Box<str>),
    Bin(Box<[u8]>),
}

impl Datacell {
    pub fn new_bool(b: bool) -> Self {
        Self::Bool(b)
    }
    pub fn new_uint(u: u64) -> Self {
        Self::UnsignedInt(u)
    }
    pub fn new_sint(s: i64) -> Self {
        Self::SignedInt(s)
    }
    pub fn new_float(f: f64) -> Self {
        Self::Float(f)
    }
    pub fn new_str(s: Box<str>) -> Self {
        Self::Str(s)
    }
    pub fn new_bin(b: Box<[u8]>) -> Self {
        Self::Bin(b)
    }
    pub fn try_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
    pub fn try_uint(&self) -> Option<u64> {
        match self {
            Self::UnsignedInt(u) => Some(*u),
            _ => None,
        }
    }
    pub fn try_sint(&self) -> Option<i64> {
        match self {
            Self::SignedInt(s) => Some(*s),
            _ => None,
        }
    }
    pub fn try_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }
    pub fn try_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
    pub fn try_bin(&self) -> Option<&[u8]> {
        match self {
            Self::Bin(b) => Some(b),
            _ => None,
        }
    }
}

direct_from! {
    Datacell => {
        bool as Bool,
        u64 as UnsignedInt,
        i64 as SignedInt,
        f64 as Float,
        &str as Str,
        String as Str,
        Vec<u8> as Bin,
    }
}
