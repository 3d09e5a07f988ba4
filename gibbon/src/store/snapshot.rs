/*
 * Created on Sat Jan 13 2024
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

//! The on-disk snapshot format.
//!
//! ```text
//! [magic 8B][format u32][store version u64][P u64][Gb u64]
//! [payload len u64][payload crc32 u32][payload]
//! ```
//!
//! The payload is the three collections, length-prefixed throughout. A
//! snapshot is rewritten whole on every commit and replaced atomically
//! (temp file + rename), so a crash leaves either the old file or the new
//! one, never a torn mix.

use {
    super::StoreState,
    crate::{
        core::{group::GroupRow, permission::PermissionRow, user::UserRow},
        data::{cell::Datacell, dict::MetaDict, mask::Mask, uuid::Uuid},
        error::{StorageError, StorageResult},
    },
    crc::{Crc, CRC_32_ISO_HDLC},
    std::{collections::BTreeMap, fs, io::Write, path::Path},
};

const MAGIC: [u8; 8] = *b"gibbonss";
const FORMAT_VERSION: u32 = 1;
const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/*
    save
*/

pub(crate) fn save(state: &StoreState, path: &Path) -> StorageResult<()> {
    let payload = encode_payload(state);
    let mut file_data =
        Vec::with_capacity(MAGIC.len() + 4 + 8 * 4 + 4 + payload.len());
    file_data.extend_from_slice(&MAGIC);
    push_u32(&mut file_data, FORMAT_VERSION);
    push_u64(&mut file_data, state.version);
    push_u64(&mut file_data, state.permission_bytes as u64);
    push_u64(&mut file_data, state.group_bytes as u64);
    push_u64(&mut file_data, payload.len() as u64);
    push_u32(&mut file_data, CRC32.checksum(&payload));
    file_data.extend_from_slice(&payload);
    let tmp = path.with_extension("tmp");
    {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(&file_data)?;
        f.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

fn encode_payload(state: &StoreState) -> Vec<u8> {
    let mut buf = Vec::new();
    push_u64(&mut buf, state.permissions.len() as u64);
    for row in state.permissions.values() {
        push_u64(&mut buf, row.position);
        buf.push(row.allocated as u8);
        push_dict(&mut buf, &row.meta);
    }
    push_u64(&mut buf, state.groups.len() as u64);
    for row in state.groups.values() {
        push_u64(&mut buf, row.position);
        buf.push(row.allocated as u8);
        push_mask(&mut buf, &row.permissions);
        push_dict(&mut buf, &row.meta);
    }
    push_u64(&mut buf, state.users.len() as u64);
    for row in state.users.values() {
        buf.extend_from_slice(row.id.as_slice());
        push_mask(&mut buf, &row.groups);
        push_mask(&mut buf, &row.permissions);
        push_dict(&mut buf, &row.meta);
    }
    buf
}

fn push_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn push_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn push_bytes(buf: &mut Vec<u8>, b: &[u8]) {
    push_u64(buf, b.len() as u64);
    buf.extend_from_slice(b);
}

fn push_mask(buf: &mut Vec<u8>, m: &Mask) {
    push_bytes(buf, m.as_bytes());
}

fn push_dict(buf: &mut Vec<u8>, dict: &MetaDict) {
    push_u64(buf, dict.len() as u64);
    for (key, cell) in dict {
        push_bytes(buf, key.as_bytes());
        push_cell(buf, cell);
    }
}

mod tag {
    pub const BOOL: u8 = 0;
    pub const UINT: u8 = 1;
    pub const SINT: u8 = 2;
    pub const FLOAT: u8 = 3;
    pub const STR: u8 = 4;
    pub const BIN: u8 = 5;
}

fn push_cell(buf: &mut Vec<u8>, cell: &Datacell) {
    match cell {
        Datacell::Bool(b) => {
            buf.push(tag::BOOL);
            buf.push(*b as u8);
        }
        Datacell::UnsignedInt(u) => {
            buf.push(tag::UINT);
            push_u64(buf, *u);
        }
        Datacell::SignedInt(s) => {
            buf.push(tag::SINT);
            push_u64(buf, *s as u64);
        }
        Datacell::Float(f) => {
            buf.push(tag::FLOAT);
            push_u64(buf, f.to_bits());
        }
        Datacell::Str(s) => {
            buf.push(tag::STR);
            push_bytes(buf, s.as_bytes());
        }
        Datacell::Bin(b) => {
            buf.push(tag::BIN);
            push_bytes(buf, b);
        }
    }
}

/*
    load
*/

pub(crate) fn load(path: &Path) -> StorageResult<StoreState> {
    let raw = fs::read(path)?;
    let mut scanner = Scanner::new(&raw);
    if scanner.next_block(MAGIC.len())? != MAGIC {
        return Err(StorageError::BadMagic);
    }
    let format = scanner.next_u32_le()?;
    if format != FORMAT_VERSION {
        return Err(StorageError::BadVersion(format));
    }
    let version = scanner.next_u64_le()?;
    let permission_bytes = scanner.next_len()?;
    let group_bytes = scanner.next_len()?;
    if permission_bytes == 0 || group_bytes == 0 {
        return Err(StorageError::Corrupted);
    }
    let payload_len = scanner.next_len()?;
    let crc = scanner.next_u32_le()?;
    let payload = scanner.next_block(payload_len)?;
    if !scanner.exhausted() {
        return Err(StorageError::Corrupted);
    }
    if CRC32.checksum(payload) != crc {
        return Err(StorageError::ChecksumMismatch);
    }
    let mut scanner = Scanner::new(payload);
    let state = decode_payload(&mut scanner, version, permission_bytes, group_bytes)?;
    if !scanner.exhausted() {
        return Err(StorageError::Corrupted);
    }
    Ok(state)
}

fn decode_payload(
    scanner: &mut Scanner,
    version: u64,
    permission_bytes: usize,
    group_bytes: usize,
) -> StorageResult<StoreState> {
    let mut permissions = BTreeMap::new();
    for _ in 0..scanner.next_len()? {
        let position = scanner.next_u64_le()?;
        let allocated = scanner.next_bool()?;
        let meta = next_dict(scanner)?;
        if permissions
            .insert(
                position,
                PermissionRow {
                    position,
                    allocated,
                    meta,
                },
            )
            .is_some()
        {
            return Err(StorageError::Corrupted);
        }
    }
    let mut groups = BTreeMap::new();
    for _ in 0..scanner.next_len()? {
        let position = scanner.next_u64_le()?;
        let allocated = scanner.next_bool()?;
        let mask = next_mask(scanner, permission_bytes)?;
        let meta = next_dict(scanner)?;
        if groups
            .insert(
                position,
                GroupRow {
                    position,
                    allocated,
                    permissions: mask,
                    meta,
                },
            )
            .is_some()
        {
            return Err(StorageError::Corrupted);
        }
    }
    let mut users = BTreeMap::new();
    for _ in 0..scanner.next_len()? {
        let mut id = [0u8; 16];
        id.copy_from_slice(scanner.next_block(16)?);
        let id = Uuid::from_slice(id);
        let groups_mask = next_mask(scanner, group_bytes)?;
        let permissions_mask = next_mask(scanner, permission_bytes)?;
        let meta = next_dict(scanner)?;
        if users
            .insert(
                id,
                UserRow {
                    id,
                    groups: groups_mask,
                    permissions: permissions_mask,
                    meta,
                },
            )
            .is_some()
        {
            return Err(StorageError::Corrupted);
        }
    }
    Ok(StoreState {
        version,
        permission_bytes,
        group_bytes,
        permissions,
        groups,
        users,
    })
}

fn next_mask(scanner: &mut Scanner, expected_len: usize) -> StorageResult<Mask> {
    let len = scanner.next_len()?;
    if len != expected_len {
        return Err(StorageError::Corrupted);
    }
    Ok(Mask::decode(scanner.next_block(len)?))
}

fn next_dict(scanner: &mut Scanner) -> StorageResult<MetaDict> {
    let count = scanner.next_len()?;
    let mut dict = MetaDict::new();
    for _ in 0..count {
        let key_len = scanner.next_len()?;
        let key = core::str::from_utf8(scanner.next_block(key_len)?)
            .map_err(|_| StorageError::Corrupted)?
            .into();
        let cell = next_cell(scanner)?;
        let _ = dict.insert(key, cell);
    }
    Ok(dict)
}

fn next_cell(scanner: &mut Scanner) -> StorageResult<Datacell> {
    Ok(match scanner.next_u8()? {
        tag::BOOL => Datacell::Bool(scanner.next_bool()?),
        tag::UINT => Datacell::UnsignedInt(scanner.next_u64_le()?),
        tag::SINT => Datacell::SignedInt(scanner.next_u64_le()? as i64),
        tag::FLOAT => Datacell::Float(f64::from_bits(scanner.next_u64_le()?)),
        tag::STR => {
            let len = scanner.next_len()?;
            Datacell::Str(
                core::str::from_utf8(scanner.next_block(len)?)
                    .map_err(|_| StorageError::Corrupted)?
                    .into(),
            )
        }
        tag::BIN => {
            let len = scanner.next_len()?;
            Datacell::Bin(scanner.next_block(len)?.into())
        }
        other => return Err(StorageError::BadCellTag(other)),
    })
}

/// Bounds-checked cursor over the raw file contents. All reads fail with
/// [`StorageError::UnexpectedEof`] rather than slicing past the end.
struct Scanner<'a> {
    d: &'a [u8],
    i: usize,
}

impl<'a> Scanner<'a> {
    fn new(d: &'a [u8]) -> Self {
        Self { d, i: 0 }
    }
    fn remaining(&self) -> usize {
        self.d.len() - self.i
    }
    fn exhausted(&self) -> bool {
        self.remaining() == 0
    }
    fn next_block(&mut self, n: usize) -> StorageResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(StorageError::UnexpectedEof);
        }
        let block = &self.d[self.i..self.i + n];
        self.i += n;
        Ok(block)
    }
    fn next_u8(&mut self) -> StorageResult<u8> {
        Ok(self.next_block(1)?[0])
    }
    fn next_bool(&mut self) -> StorageResult<bool> {
        match self.next_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(StorageError::Corrupted),
        }
    }
    fn next_u32_le(&mut self) -> StorageResult<u32> {
        let mut b = [0u8; 4];
        b.copy_from_slice(self.next_block(4)?);
        Ok(u32::from_le_bytes(b))
    }
    fn next_u64_le(&mut self) -> StorageResult<u64> {
        let mut b = [0u8; 8];
        b.copy_from_slice(self.next_block(8)?);
        Ok(u64::from_le_bytes(b))
    }
    /// a u64 length field narrowed to usize; consumers bound it through
    /// `next_block`, so a corrupted length fails as EOF instead of driving
    /// an allocation
    fn next_len(&mut self) -> StorageResult<usize> {
        let len = self.next_u64_le()?;
        usize::try_from(len).map_err(|_| StorageError::Corrupted)
    }
}

#[cfg(test)]
mod tests {
    use {
        super::{load, save},
        crate::{
            core::{group::GroupRow, permission::PermissionRow, user::UserRow},
            error::StorageError,
            store::StoreState,
        },
        std::{env, fs, path::PathBuf},
    };

    fn tmpfile(name: &str) -> PathBuf {
        let mut p = env::temp_dir();
        p.push(format!("gibbon-snap-{}-{name}", std::process::id()));
        p
    }

    fn sample_state() -> StoreState {
        let mut state = StoreState::new(2, 1);
        for position in 1..=16u64 {
            let _ = state
                .permissions
                .insert(position, PermissionRow::new_free(position));
        }
        let mut p1 = state.permissions.get(&1).cloned().unwrap();
        p1.allocated = true;
        p1.meta = into_dict!("name" => "god", "level" => 9000u64);
        let _ = state.permissions.insert(1, p1);
        for position in 1..=8u64 {
            let _ = state.groups.insert(position, GroupRow::new_free(position, 2));
        }
        let mut g1 = state.groups.get(&1).cloned().unwrap();
        g1.allocated = true;
        g1.permissions.set(1).unwrap();
        let _ = state.groups.insert(1, g1);
        let mut user = UserRow::new(1, 2, into_dict!("email" => "a@b"));
        user.groups.set(1).unwrap();
        user.permissions.set(1).unwrap();
        let _ = state.users.insert(user.id, user);
        state
    }

    #[test]
    fn roundtrip() {
        let path = tmpfile("roundtrip");
        let state = sample_state();
        save(&state, &path).unwrap();
        let restored = load(&path).unwrap();
        assert_eq!(state, restored);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn rejects_bad_magic() {
        let path = tmpfile("magic");
        save(&sample_state(), &path).unwrap();
        let mut raw = fs::read(&path).unwrap();
        raw[0] ^= 0xff;
        fs::write(&path, raw).unwrap();
        assert!(matches!(load(&path), Err(StorageError::BadMagic)));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn rejects_flipped_payload_bit() {
        let path = tmpfile("crc");
        save(&sample_state(), &path).unwrap();
        let mut raw = fs::read(&path).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        fs::write(&path, raw).unwrap();
        assert!(matches!(
            load(&path),
            Err(StorageError::ChecksumMismatch)
        ));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn rejects_truncation() {
        let path = tmpfile("trunc");
        save(&sample_state(), &path).unwrap();
        let raw = fs::read(&path).unwrap();
        fs::write(&path, &raw[..raw.len() - 3]).unwrap();
        assert!(matches!(load(&path), Err(StorageError::UnexpectedEof)));
        let _ = fs::remove_file(path);
    }
}
