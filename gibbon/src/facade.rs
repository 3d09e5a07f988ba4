/*
 * Created on Mon Jan 22 2024
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

//! The [`Gibbon`] facade: the only public mutation surface. It owns the
//! store handle and the three models and draws every transaction boundary.
//!
//! Write-side calls accept an optional caller-owned [`Session`]. With one,
//! the call joins it and the caller decides when (whether) to commit; without
//! one, the call runs in its own session through the store's retrying
//! transaction helper. Either way a composite operation's intermediate states
//! are never observable from outside, and any error aborts the whole unit.

use {
    crate::{
        config::Configuration,
        core::{
            group::{GroupModel, GroupPermissions, GroupRow},
            permission::{PermissionModel, PermissionRow},
            resize, seed,
            user::{UserFilter, UserModel, UserRow},
        },
        data::{
            dict::MetaDict,
            mask::{Mask, MaskSource},
        },
        error::{Entity, GibbonError, GibbonResult},
        store::{Datastore, Session, StoreState},
    },
    std::path::Path,
};

/// The authorization engine. Cheap to clone and safe to share: every clone
/// points at the same store.
#[derive(Debug, Clone)]
pub struct Gibbon {
    store: Datastore,
    config: Configuration,
    groups: GroupModel,
    permissions: PermissionModel,
    users: UserModel,
}

impl Gibbon {
    /// Open an engine per the configuration: file-backed when a store path
    /// is configured, in-memory otherwise
    pub fn open(config: Configuration) -> GibbonResult<Self> {
        let store = match &config.store.path {
            Some(path) => Datastore::open(
                path,
                config.universe.permission_bytes,
                config.universe.group_bytes,
            )?,
            None => Datastore::ephemeral(
                config.universe.permission_bytes,
                config.universe.group_bytes,
            ),
        };
        Ok(Self::with_store(config, store))
    }
    /// An engine over an in-memory store, whatever the configuration says
    pub fn ephemeral(config: Configuration) -> Self {
        let store = Datastore::ephemeral(
            config.universe.permission_bytes,
            config.universe.group_bytes,
        );
        Self::with_store(config, store)
    }
    /// Open a file-backed engine at an explicit path, overriding the
    /// configured location
    pub fn open_at(config: Configuration, path: &Path) -> GibbonResult<Self> {
        let store = Datastore::open(
            path,
            config.universe.permission_bytes,
            config.universe.group_bytes,
        )?;
        Ok(Self::with_store(config, store))
    }
    fn with_store(config: Configuration, store: Datastore) -> Self {
        Self {
            store,
            config,
            groups: GroupModel,
            permissions: PermissionModel,
            users: UserModel,
        }
    }
    /// Begin a caller-owned session. Everything done through it becomes
    /// visible to others only on [`Session::commit`]; dropping it (or
    /// [`Session::rollback`]) reverts every write.
    pub fn session(&self) -> Session {
        self.store.session()
    }
    #[cfg(test)]
    pub(crate) fn datastore(&self) -> &Datastore {
        &self.store
    }
    fn batch(&self) -> usize {
        self.config.system.mutation_concurrency
    }
    /// Join the caller's session, or run `f` inside a fresh retrying
    /// transaction
    fn exec_write<T>(
        &self,
        session: Option<&mut Session>,
        mut f: impl FnMut(&mut StoreState) -> GibbonResult<T>,
    ) -> GibbonResult<T> {
        match session {
            Some(session) => f(session.state_mut()),
            None => self.store.transact(|session| f(session.state_mut())),
        }
    }
    /// Read inside the caller's session (observing its uncommitted writes)
    /// or against the committed state
    fn exec_read<T>(
        &self,
        session: Option<&Session>,
        f: impl FnOnce(&StoreState) -> GibbonResult<T>,
    ) -> GibbonResult<T> {
        match session {
            Some(session) => f(session.state()),
            None => self.store.read(f),
        }
    }
}

/*
    seeding
*/

impl Gibbon {
    /// Pre-populate the slot collections. Fails with
    /// [`GibbonError::AlreadySeeded`] on a populated store; prefer
    /// [`Gibbon::initialize`] unless that failure is load-bearing for you.
    pub fn seed(&self, session: Option<&mut Session>) -> GibbonResult<()> {
        self.exec_write(session, seed::seed)
    }
    /// Idempotent seeding: seeds a virgin store, leaves a populated one
    /// untouched. Returns whether seeding actually ran. This is what
    /// `gibbonctl init` calls.
    pub fn initialize(&self, session: Option<&mut Session>) -> GibbonResult<bool> {
        self.exec_write(session, |state| match seed::seed(state) {
            Ok(()) => Ok(true),
            Err(GibbonError::AlreadySeeded) => Ok(false),
            Err(e) => Err(e),
        })
    }
}

/*
    allocation
*/

impl Gibbon {
    /// Claim the lowest free permission slot and attach `meta` to it
    pub fn allocate_permission(
        &self,
        session: Option<&mut Session>,
        meta: MetaDict,
    ) -> GibbonResult<PermissionRow> {
        self.exec_write(session, |state| {
            self.permissions.allocate(state, meta.clone())
        })
    }
    /// Claim the lowest free group slot and attach `meta` to it. The group's
    /// permission mask starts out zeroed.
    pub fn allocate_group(
        &self,
        session: Option<&mut Session>,
        meta: MetaDict,
    ) -> GibbonResult<GroupRow> {
        self.exec_write(session, |state| self.groups.allocate(state, meta.clone()))
    }
    /// Release permission slots and propagate: the named bits are cleared
    /// from every group's grant mask and from every user's derived mask, in
    /// that order, inside one transaction.
    pub fn deallocate_permissions(
        &self,
        session: Option<&mut Session>,
        permissions: impl Into<MaskSource>,
    ) -> GibbonResult<()> {
        let source = permissions.into();
        self.exec_write(session, |state| {
            let mask = source.clone().ensure(state.permission_bytes)?;
            self.permissions.deallocate(state, &mask.positions());
            self.groups.unset_permissions(state, &mask);
            let _ = self.users.unset_permissions(state, &mask, self.batch())?;
            Ok(())
        })
    }
    /// Release group slots and propagate: membership bits are cleared from
    /// every member and their derived masks are recomputed from whatever
    /// groups they still have. The recomputation reads through this same
    /// session, so the just-reset groups contribute nothing.
    pub fn deallocate_groups(
        &self,
        session: Option<&mut Session>,
        groups: impl Into<MaskSource>,
    ) -> GibbonResult<()> {
        let source = groups.into();
        self.exec_write(session, |state| {
            let mask = source.clone().ensure(state.group_bytes)?;
            self.groups.deallocate(state, &mask.positions());
            let _ = self
                .users
                .unset_groups(state, &mask, &self.groups, self.batch())?;
            Ok(())
        })
    }
}

/*
    subscription
*/

impl Gibbon {
    /// Make every matching user a member of the given groups, deriving the
    /// permission gain once and applying it to each
    pub fn subscribe_users_to_groups(
        &self,
        session: Option<&mut Session>,
        filter: impl Into<UserFilter>,
        groups: impl Into<MaskSource>,
    ) -> GibbonResult<usize> {
        let filter = filter.into();
        let source = groups.into();
        self.exec_write(session, |state| {
            let mask_g = source.clone().ensure(state.group_bytes)?;
            if !self.groups.validate(state, &mask_g.positions(), true) {
                return Err(GibbonError::NotAllocated(Entity::Group));
            }
            let mask_p = self.groups.permissions_for_groups(state, &mask_g)?;
            self.users.subscribe_to_groups_and_permissions(
                state,
                &filter,
                &mask_g,
                &mask_p,
                self.batch(),
            )
        })
    }
    /// Grant permissions to groups and fan the gain out to every member
    pub fn subscribe_permissions_to_groups(
        &self,
        session: Option<&mut Session>,
        groups: impl Into<MaskSource>,
        permissions: impl Into<MaskSource>,
    ) -> GibbonResult<()> {
        let group_source = groups.into();
        let permission_source = permissions.into();
        self.exec_write(session, |state| {
            let mask_g = group_source.clone().ensure(state.group_bytes)?;
            let mask_p = permission_source.clone().ensure(state.permission_bytes)?;
            // both sides are checked; when both fail, the permission side is
            // the error we surface
            let permissions_ok = self.permissions.validate(state, &mask_p.positions(), true);
            let groups_ok = self.groups.validate(state, &mask_g.positions(), true);
            if !permissions_ok {
                return Err(GibbonError::NotAllocated(Entity::Permission));
            }
            if !groups_ok {
                return Err(GibbonError::NotAllocated(Entity::Group));
            }
            self.groups.subscribe_permissions(state, &mask_g, &mask_p);
            let _ = self.users.subscribe_to_permissions_for_groups(
                state,
                &mask_g,
                &mask_p,
                self.batch(),
            )?;
            Ok(())
        })
    }
    /// Take matching users out of the given groups and rederive their
    /// permission masks from the memberships they keep
    pub fn unsubscribe_users_from_groups(
        &self,
        session: Option<&mut Session>,
        filter: impl Into<UserFilter>,
        groups: impl Into<MaskSource>,
    ) -> GibbonResult<usize> {
        let filter = filter.into();
        let source = groups.into();
        self.exec_write(session, |state| {
            let mask_g = source.clone().ensure(state.group_bytes)?;
            self.users
                .unsubscribe_from_groups(state, &filter, &mask_g, &self.groups, self.batch())
        })
    }
    /// Withdraw permissions from groups, then rederive the mask of every
    /// member, reading the groups as this session now sees them so the
    /// withdrawal is reflected
    pub fn unsubscribe_permissions_from_groups(
        &self,
        session: Option<&mut Session>,
        groups: impl Into<MaskSource>,
        permissions: impl Into<MaskSource>,
    ) -> GibbonResult<()> {
        let group_source = groups.into();
        let permission_source = permissions.into();
        self.exec_write(session, |state| {
            let mask_g = group_source.clone().ensure(state.group_bytes)?;
            let mask_p = permission_source.clone().ensure(state.permission_bytes)?;
            self.groups
                .unsubscribe_permissions(state, &mask_g, &mask_p);
            let _ = self.users.recalculate_permissions_for_groups(
                state,
                &mask_g,
                &self.groups,
                self.batch(),
            )?;
            Ok(())
        })
    }
}

/*
    user lifecycle and metadata
*/

impl Gibbon {
    /// Insert a user with both masks zeroed and the sanitized metadata
    pub fn create_user(
        &self,
        session: Option<&mut Session>,
        meta: MetaDict,
    ) -> GibbonResult<UserRow> {
        self.exec_write(session, |state| Ok(self.users.create(state, meta.clone())))
    }
    /// Delete matching users; returns how many were removed
    pub fn remove_users(
        &self,
        session: Option<&mut Session>,
        filter: impl Into<UserFilter>,
    ) -> GibbonResult<usize> {
        let filter = filter.into();
        self.exec_write(session, |state| Ok(self.users.remove(state, &filter)))
    }
    /// Merge metadata into an allocated group; `None` when no allocated
    /// group lives at the position
    pub fn update_group_metadata(
        &self,
        session: Option<&mut Session>,
        position: u64,
        meta: MetaDict,
    ) -> GibbonResult<Option<GroupRow>> {
        self.exec_write(session, |state| {
            Ok(self.groups.update_metadata(state, position, meta.clone()))
        })
    }
    /// Merge metadata into an allocated permission; `None` when no allocated
    /// permission lives at the position
    pub fn update_permission_metadata(
        &self,
        session: Option<&mut Session>,
        position: u64,
        meta: MetaDict,
    ) -> GibbonResult<Option<PermissionRow>> {
        self.exec_write(session, |state| {
            Ok(self
                .permissions
                .update_metadata(state, position, meta.clone()))
        })
    }
    /// Rederive the permission mask of every matching user from its current
    /// group membership. The consistency engine keeps derived masks correct
    /// on its own; this is the repair tool for stores that were mutated out
    /// of band.
    pub fn recalculate_user_permissions(
        &self,
        session: Option<&mut Session>,
        filter: impl Into<UserFilter>,
    ) -> GibbonResult<usize> {
        let filter = filter.into();
        self.exec_write(session, |state| {
            self.users
                .recalculate_permissions(state, &filter, &self.groups, self.batch())
        })
    }
    /// Merge metadata into every matching user; masks are untouched
    pub fn update_user_metadata(
        &self,
        session: Option<&mut Session>,
        filter: impl Into<UserFilter>,
        meta: MetaDict,
    ) -> GibbonResult<usize> {
        let filter = filter.into();
        self.exec_write(session, |state| {
            self.users
                .update_metadata(state, &filter, meta.clone(), self.batch())
        })
    }
}

/*
    queries
*/

impl Gibbon {
    /// The union of permission masks over the allocated groups in `groups`
    pub fn permissions_for_groups(
        &self,
        session: Option<&Session>,
        groups: impl Into<MaskSource>,
    ) -> GibbonResult<Mask> {
        let source = groups.into();
        self.exec_read(session, |state| {
            let mask_g = source.ensure(state.group_bytes)?;
            self.groups.permissions_for_groups(state, &mask_g)
        })
    }
    pub fn find_groups(
        &self,
        session: Option<&Session>,
        positions: &[u64],
    ) -> GibbonResult<Vec<GroupRow>> {
        self.exec_read(session, |state| Ok(self.groups.find(state, positions)))
    }
    pub fn find_permissions(
        &self,
        session: Option<&Session>,
        positions: &[u64],
    ) -> GibbonResult<Vec<PermissionRow>> {
        self.exec_read(session, |state| Ok(self.permissions.find(state, positions)))
    }
    /// Groups whose grant mask intersects `permissions`
    pub fn find_groups_by_permissions(
        &self,
        session: Option<&Session>,
        permissions: impl Into<MaskSource>,
        want_allocated: bool,
    ) -> GibbonResult<Vec<GroupRow>> {
        let source = permissions.into();
        self.exec_read(session, |state| {
            let mask_p = source.ensure(state.permission_bytes)?;
            Ok(self
                .groups
                .find_by_permissions(state, &mask_p, want_allocated))
        })
    }
    /// Users whose derived mask intersects `permissions`
    pub fn find_users_by_permissions(
        &self,
        session: Option<&Session>,
        permissions: impl Into<MaskSource>,
    ) -> GibbonResult<Vec<UserRow>> {
        let source = permissions.into();
        self.exec_read(session, |state| {
            let mask_p = source.ensure(state.permission_bytes)?;
            Ok(self.users.find_by_permissions(state, &mask_p))
        })
    }
    /// Users belonging to any group in `groups`
    pub fn find_users_by_groups(
        &self,
        session: Option<&Session>,
        groups: impl Into<MaskSource>,
    ) -> GibbonResult<Vec<UserRow>> {
        let source = groups.into();
        self.exec_read(session, |state| {
            let mask_g = source.ensure(state.group_bytes)?;
            Ok(self.users.find_by_groups(state, &mask_g))
        })
    }
    pub fn find_users(
        &self,
        session: Option<&Session>,
        filter: impl Into<UserFilter>,
    ) -> GibbonResult<Vec<UserRow>> {
        let filter = filter.into();
        self.exec_read(session, |state| {
            Ok(self.users.find_by_filter(state, &filter))
        })
    }
    pub fn find_all_allocated_groups(
        &self,
        session: Option<&Session>,
    ) -> GibbonResult<Vec<GroupRow>> {
        self.exec_read(session, |state| Ok(self.groups.find_all_allocated(state)))
    }
    pub fn find_all_allocated_permissions(
        &self,
        session: Option<&Session>,
    ) -> GibbonResult<Vec<PermissionRow>> {
        self.exec_read(session, |state| {
            Ok(self.permissions.find_all_allocated(state))
        })
    }
    /// true iff every listed group position is currently allocated
    pub fn validate_allocated_groups(
        &self,
        session: Option<&Session>,
        positions: &[u64],
    ) -> GibbonResult<bool> {
        self.exec_read(session, |state| {
            Ok(self.groups.validate(state, positions, true))
        })
    }
    /// true iff every listed permission position is currently allocated
    pub fn validate_allocated_permissions(
        &self,
        session: Option<&Session>,
        positions: &[u64],
    ) -> GibbonResult<bool> {
        self.exec_read(session, |state| {
            Ok(self.permissions.validate(state, positions, true))
        })
    }
}

/*
    pure validators: bitwise tests over masks the caller already has; the
    store is never touched
*/

impl Gibbon {
    /// true iff the membership mask has *every* group in `groups`
    pub fn validate_user_groups_all(
        &self,
        user_groups: &Mask,
        groups: impl Into<MaskSource>,
    ) -> GibbonResult<bool> {
        let want = groups.into().ensure(user_groups.len())?;
        Ok(user_groups.contains(&want))
    }
    /// true iff the membership mask has *any* group in `groups`
    pub fn validate_user_groups_any(
        &self,
        user_groups: &Mask,
        groups: impl Into<MaskSource>,
    ) -> GibbonResult<bool> {
        let want = groups.into().ensure(user_groups.len())?;
        Ok(user_groups.intersects(&want))
    }
    /// true iff the derived mask has *every* permission in `permissions`
    pub fn validate_user_permissions_all(
        &self,
        user_permissions: &Mask,
        permissions: impl Into<MaskSource>,
    ) -> GibbonResult<bool> {
        let want = permissions.into().ensure(user_permissions.len())?;
        Ok(user_permissions.contains(&want))
    }
    /// true iff the derived mask has *any* permission in `permissions`
    pub fn validate_user_permissions_any(
        &self,
        user_permissions: &Mask,
        permissions: impl Into<MaskSource>,
    ) -> GibbonResult<bool> {
        let want = permissions.into().ensure(user_permissions.len())?;
        Ok(user_permissions.intersects(&want))
    }
}

/*
    resize
*/

impl Gibbon {
    /// Grow the permission universe: seed the new slot range and widen every
    /// stored permission mask, atomically
    pub fn expand_permissions(
        &self,
        session: Option<&mut Session>,
        new_len: usize,
    ) -> GibbonResult<()> {
        self.exec_write(session, |state| resize::expand_permissions(state, new_len))
    }
    /// Shrink the permission universe. Refused outright if any allocated
    /// permission lives beyond the new boundary.
    pub fn shrink_permissions(
        &self,
        session: Option<&mut Session>,
        new_len: usize,
    ) -> GibbonResult<()> {
        self.exec_write(session, |state| resize::shrink_permissions(state, new_len))
    }
    /// Grow the group universe: seed the new slot range and widen every
    /// membership mask, atomically
    pub fn expand_groups(
        &self,
        session: Option<&mut Session>,
        new_len: usize,
    ) -> GibbonResult<()> {
        self.exec_write(session, |state| resize::expand_groups(state, new_len))
    }
    /// Shrink the group universe. Refused outright if any allocated group
    /// lives beyond the new boundary.
    pub fn shrink_groups(
        &self,
        session: Option<&mut Session>,
        new_len: usize,
    ) -> GibbonResult<()> {
        self.exec_write(session, |state| resize::shrink_groups(state, new_len))
    }
}
