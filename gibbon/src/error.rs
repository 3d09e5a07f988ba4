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

use {crate::config::ConfigError, core::fmt, std::io};

pub type GibbonResult<T> = Result<T, GibbonError>;
pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// The slot collection an error originated from
pub enum Entity {
    Group,
    Permission,
}

impl Entity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Group => "group",
            Self::Permission => "permission",
        }
    }
}

#[derive(Debug)]
/// Everything the engine can fail with
pub enum GibbonError {
    /// allocation found no free slot; the store is unchanged
    Exhausted(Entity),
    /// the caller named a position that is not currently allocated
    NotAllocated(Entity),
    /// a shrink would drop allocated slots beyond the new boundary
    ShrinkDeniesLive(Entity),
    /// the requested byte length is not strictly on the correct side of the
    /// current one
    ResizeDirection,
    /// the seeder probe found pre-existing slot rows
    AlreadySeeded,
    /// a 1-based bit position outside `[1, 8·len]`
    PositionRange { position: u64, limit: u64 },
    /// a mask byte length of zero
    ZeroLength,
    /// retriable commit conflict; surfaced only once the retry budget is
    /// exhausted
    TxnConflict,
    /// configuration load/validation failure
    Config(ConfigError),
    /// snapshot I/O or decode failure
    Storage(StorageError),
}

direct_from! {
    GibbonError => {
        ConfigError as Config,
        StorageError as Storage,
    }
}

impl fmt::Display for GibbonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted(e) => {
                write!(f, "not able to allocate {}, all are allocated", e.as_str())
            }
            Self::NotAllocated(e) => {
                write!(f, "one or more {} positions are not allocated", e.as_str())
            }
            Self::ShrinkDeniesLive(e) => write!(
                f,
                "cannot shrink: allocated {}s exist beyond the new boundary",
                e.as_str()
            ),
            Self::ResizeDirection => write!(
                f,
                "resize rejected: the new byte length must strictly grow on expand and strictly shrink on shrink"
            ),
            Self::AlreadySeeded => write!(
                f,
                "called the seeder but permissions and groups seem to be populated already"
            ),
            Self::PositionRange { position, limit } => {
                write!(f, "position {position} is outside the universe [1, {limit}]")
            }
            Self::ZeroLength => write!(f, "mask byte length must be at least 1"),
            Self::TxnConflict => write!(f, "transaction conflict; retries exhausted"),
            Self::Config(e) => write!(f, "{e}"),
            Self::Storage(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for GibbonError {}

#[derive(Debug)]
/// A store snapshot failure. Decode-side variants indicate a damaged or
/// foreign file, never a recoverable state.
pub enum StorageError {
    Io(io::Error),
    /// the file does not begin with the snapshot magic
    BadMagic,
    /// the snapshot was written by an incompatible format revision
    BadVersion(u32),
    /// payload checksum mismatch
    ChecksumMismatch,
    /// the payload ended before the decoder was done
    UnexpectedEof,
    /// unknown metadata cell tag
    BadCellTag(u8),
    /// a decoded field failed validation (bad lengths, dangling row, ...)
    Corrupted,
}

direct_from! {
    StorageError => {
        io::Error as Io,
    }
}

impl From<io::Error> for GibbonError {
    fn from(e: io::Error) -> Self {
        Self::Storage(StorageError::Io(e))
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "snapshot I/O error: {e}"),
            Self::BadMagic => write!(f, "snapshot error: bad magic"),
            Self::BadVersion(v) => write!(f, "snapshot error: unsupported format version {v}"),
            Self::ChecksumMismatch => write!(f, "snapshot error: checksum mismatch"),
            Self::UnexpectedEof => write!(f, "snapshot error: unexpected end of payload"),
            Self::BadCellTag(t) => write!(f, "snapshot error: unknown cell tag {t}"),
            Self::Corrupted => write!(f, "snapshot error: corrupted payload"),
        }
    }
}

impl std::error::Error for StorageError {}
