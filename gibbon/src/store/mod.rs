/*
 * Created on Fri Jan 12 2024
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

//! The embedded document store backing the engine.
//!
//! Three typed collections live behind one lock: permission slots and group
//! slots keyed by their immutable `position`, users keyed by id. A [`Session`]
//! is a copy-on-write overlay of the committed state: reads inside a session
//! observe the session's own writes, and nothing outside the session observes
//! anything until [`Session::commit`]. Commits are optimistic: the overlay
//! is swapped in only if no other commit landed in between, which is what
//! serializes racing allocators without in-process locking.

pub(crate) mod snapshot;

use {
    crate::{
        core::{group::GroupRow, permission::PermissionRow, user::UserRow},
        data::uuid::Uuid,
        error::{GibbonError, GibbonResult},
    },
    parking_lot::RwLock,
    std::{
        collections::BTreeMap,
        path::{Path, PathBuf},
        sync::Arc,
    },
};

/// Commit attempts before a conflict stops being treated as transient
const TXN_RETRY_MAX: usize = 8;

/// The full logical state of one deployment. Cloned wholesale into every
/// session; the universe byte lengths are part of the state so that a resize
/// commits atomically with the masks it rewrites.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StoreState {
    version: u64,
    pub(crate) permission_bytes: usize,
    pub(crate) group_bytes: usize,
    pub(crate) permissions: BTreeMap<u64, PermissionRow>,
    pub(crate) groups: BTreeMap<u64, GroupRow>,
    pub(crate) users: BTreeMap<Uuid, UserRow>,
}

impl StoreState {
    pub(crate) fn new(permission_bytes: usize, group_bytes: usize) -> Self {
        Self {
            version: 0,
            permission_bytes,
            group_bytes,
            permissions: BTreeMap::new(),
            groups: BTreeMap::new(),
            users: BTreeMap::new(),
        }
    }
    fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }
}

#[derive(Debug)]
enum Device {
    /// nothing outlives the process
    Memory,
    /// snapshot rewritten on every successful commit
    File(PathBuf),
}

#[derive(Debug)]
struct Shared {
    state: RwLock<StoreState>,
    device: Device,
}

/// Shared handle to one store. Cheap to clone; all clones observe the same
/// committed state.
#[derive(Debug, Clone)]
pub struct Datastore {
    shared: Arc<Shared>,
}

impl Datastore {
    fn _new(state: StoreState, device: Device) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: RwLock::new(state),
                device,
            }),
        }
    }
    /// An in-memory store with the given universe byte lengths
    pub fn ephemeral(permission_bytes: usize, group_bytes: usize) -> Self {
        Self::_new(
            StoreState::new(permission_bytes, group_bytes),
            Device::Memory,
        )
    }
    /// A file-backed store. An existing snapshot is loaded as-is (its
    /// universe lengths win over the configured ones); otherwise a fresh
    /// empty state is created and first persisted on the first commit.
    pub fn open(
        path: &Path,
        permission_bytes: usize,
        group_bytes: usize,
    ) -> GibbonResult<Self> {
        let state = if path.exists() {
            let state = snapshot::load(path)?;
            info!(
                "opened store at `{}` (P={}, Gb={})",
                path.display(),
                state.permission_bytes,
                state.group_bytes
            );
            state
        } else {
            info!("creating store at `{}`", path.display());
            StoreState::new(permission_bytes, group_bytes)
        };
        Ok(Self::_new(state, Device::File(path.to_owned())))
    }
    /// Begin a session on the current committed state
    pub fn session(&self) -> Session {
        let guard = self.shared.state.read();
        Session {
            shared: Arc::clone(&self.shared),
            base_version: guard.version,
            state: guard.clone(),
        }
    }
    /// Run a read against the committed state, outside any session
    pub(crate) fn read<T>(&self, f: impl FnOnce(&StoreState) -> T) -> T {
        f(&self.shared.state.read())
    }
    /// Run `f` in a fresh session and commit, retrying the whole closure on
    /// transient commit conflicts. An error from `f` itself aborts
    /// immediately: the overlay is dropped and nothing is persisted.
    pub fn transact<T>(&self, mut f: impl FnMut(&mut Session) -> GibbonResult<T>) -> GibbonResult<T> {
        for attempt in 1..=TXN_RETRY_MAX {
            let mut session = self.session();
            let ret = f(&mut session)?;
            match session.commit() {
                Ok(()) => return Ok(ret),
                Err(GibbonError::TxnConflict) => {
                    warn!("commit conflict on attempt {attempt}, retrying");
                }
                Err(e) => return Err(e),
            }
        }
        Err(GibbonError::TxnConflict)
    }
}

/// One transactional unit of work: a private overlay of the entire store.
/// Dropping a session without committing abandons every write in it.
pub struct Session {
    shared: Arc<Shared>,
    base_version: u64,
    state: StoreState,
}

impl Session {
    pub(crate) fn state(&self) -> &StoreState {
        &self.state
    }
    pub(crate) fn state_mut(&mut self) -> &mut StoreState {
        &mut self.state
    }
    /// Publish the overlay. Fails with a transient conflict if any other
    /// session committed since this one began; fails with a storage error
    /// (and publishes nothing) if the snapshot write fails.
    pub fn commit(self) -> GibbonResult<()> {
        let Self {
            shared,
            base_version,
            state,
        } = self;
        let mut guard = shared.state.write();
        if guard.version != base_version {
            return Err(GibbonError::TxnConflict);
        }
        let state = state.with_version(base_version + 1);
        if let Device::File(path) = &shared.device {
            snapshot::save(&state, path)?;
        }
        *guard = state;
        Ok(())
    }
    /// Abandon every write in this session. Equivalent to dropping it; the
    /// name exists so call sites can say what they mean.
    pub fn rollback(self) {
        drop(self);
    }
}
