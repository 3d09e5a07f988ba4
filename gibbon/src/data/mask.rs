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

use {
    crate::error::{GibbonError, GibbonResult},
    core::fmt,
};

/// A fixed-length byte buffer addressing 1-based bit positions `1..=8·len`.
///
/// Position 1 is the most significant bit of byte 0, position 8 the least
/// significant bit of byte 0, position 9 the most significant bit of byte 1,
/// and so on. This layout is the wire format: the raw bytes returned by
/// [`Mask::as_bytes`] are what the store persists, so it must never change.
///
/// The buffer is owned and never shared with a stored row: [`Mask::decode`]
/// copies on the way in and [`Mask::to_bytes`] copies on the way out.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Mask {
    data: Box<[u8]>,
}

impl Mask {
    /// New all-zero mask of the given byte length. The engine always calls
    /// this with a validated universe length; public callers go through
    /// [`Mask::try_zeroed`].
    pub(crate) fn zeroed(len: usize) -> Self {
        debug_assert_ne!(len, 0, "universe lengths are validated at the boundary");
        Self {
            data: vec![0u8; len].into_boxed_slice(),
        }
    }
    /// New all-zero mask of the given byte length (`len >= 1`)
    pub fn try_zeroed(len: usize) -> GibbonResult<Self> {
        if len == 0 {
            return Err(GibbonError::ZeroLength);
        }
        Ok(Self::zeroed(len))
    }
    /// Wrap a copy of existing raw bytes; the byte length is `bytes.len()`
    pub fn decode(bytes: &[u8]) -> Self {
        Self { data: bytes.into() }
    }
    /// The byte length of this mask
    pub fn len(&self) -> usize {
        self.data.len()
    }
    /// The highest addressable position (`8·len`)
    pub fn bit_capacity(&self) -> u64 {
        (self.data.len() as u64) * 8
    }
    /// Borrow the raw contents
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
    /// Copy out the raw contents
    pub fn to_bytes(&self) -> Vec<u8> {
        self.data.to_vec()
    }
    /// true iff no position is set
    pub fn is_zero(&self) -> bool {
        self.data.iter().all(|b| *b == 0)
    }
}

impl Mask {
    /// byte index and bit-within-byte for a *validated* position
    fn locate(position: u64) -> (usize, u8) {
        let idx = (position - 1) as usize;
        (idx >> 3, 0x80 >> (idx & 7))
    }
    fn check(&self, position: u64) -> GibbonResult<(usize, u8)> {
        if position == 0 || position > self.bit_capacity() {
            return Err(GibbonError::PositionRange {
                position,
                limit: self.bit_capacity(),
            });
        }
        Ok(Self::locate(position))
    }
    /// Set a position. Idempotent.
    pub fn set(&mut self, position: u64) -> GibbonResult<&mut Self> {
        let (byte, bit) = self.check(position)?;
        self.data[byte] |= bit;
        Ok(self)
    }
    /// Clear a position. Idempotent.
    pub fn unset(&mut self, position: u64) -> GibbonResult<&mut Self> {
        let (byte, bit) = self.check(position)?;
        self.data[byte] &= !bit;
        Ok(self)
    }
    /// true iff the position's bit is set
    pub fn is_set(&self, position: u64) -> GibbonResult<bool> {
        let (byte, bit) = self.check(position)?;
        Ok(self.data[byte] & bit != 0)
    }
    /// Set every listed position. All positions are validated before the
    /// first bit is flipped, so a range failure leaves the mask untouched.
    pub fn set_all(&mut self, positions: &[u64]) -> GibbonResult<&mut Self> {
        for p in positions {
            let _ = self.check(*p)?;
        }
        for p in positions {
            let (byte, bit) = Self::locate(*p);
            self.data[byte] |= bit;
        }
        Ok(self)
    }
    /// Clear every listed position; validation as in [`Mask::set_all`]
    pub fn unset_all(&mut self, positions: &[u64]) -> GibbonResult<&mut Self> {
        for p in positions {
            let _ = self.check(*p)?;
        }
        for p in positions {
            let (byte, bit) = Self::locate(*p);
            self.data[byte] &= !bit;
        }
        Ok(self)
    }
    /// Bitwise OR of `other` into `self` over the shorter of the two lengths
    pub fn merge(&mut self, other: &Mask) -> &mut Self {
        self.data
            .iter_mut()
            .zip(other.data.iter())
            .for_each(|(a, b)| *a |= *b);
        self
    }
    /// Bitwise AND-NOT: clear every bit of `self` that is set in `other`
    pub fn subtract(&mut self, other: &Mask) -> &mut Self {
        self.data
            .iter_mut()
            .zip(other.data.iter())
            .for_each(|(a, b)| *a &= !*b);
        self
    }
    /// Bitwise AND. Bytes of `self` past `other`'s length intersect with
    /// nothing and are zeroed.
    pub fn intersect(&mut self, other: &Mask) -> &mut Self {
        let common = self.data.len().min(other.data.len());
        self.data[..common]
            .iter_mut()
            .zip(other.data.iter())
            .for_each(|(a, b)| *a &= *b);
        self.data[common..].iter_mut().for_each(|b| *b = 0);
        self
    }
    /// true iff any listed position is set
    pub fn has_any(&self, positions: &[u64]) -> GibbonResult<bool> {
        for p in positions {
            if self.is_set(*p)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
    /// true iff every listed position is set
    pub fn has_all(&self, positions: &[u64]) -> GibbonResult<bool> {
        for p in positions {
            if !self.is_set(*p)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
    /// true iff `self` and `other` share at least one set bit
    pub fn intersects(&self, other: &Mask) -> bool {
        self.data
            .iter()
            .zip(other.data.iter())
            .any(|(a, b)| a & b != 0)
    }
    /// true iff every bit set in `other` is also set in `self`
    pub fn contains(&self, other: &Mask) -> bool {
        other.data.iter().enumerate().all(|(i, o)| {
            let s = self.data.get(i).copied().unwrap_or(0);
            s & o == *o
        })
    }
    /// All set positions, ascending
    pub fn positions(&self) -> Vec<u64> {
        let mut out = Vec::new();
        for (i, byte) in self.data.iter().enumerate() {
            if *byte == 0 {
                continue;
            }
            for j in 0u64..8 {
                if byte & (0x80 >> j) != 0 {
                    out.push((i as u64) * 8 + j + 1);
                }
            }
        }
        out
    }
    /// A copy with the given byte length: zero-padded on the high side when
    /// growing, truncated when shrinking
    pub fn resized(&self, new_len: usize) -> Mask {
        let mut data = vec![0u8; new_len];
        let common = new_len.min(self.data.len());
        data[..common].copy_from_slice(&self.data[..common]);
        Mask {
            data: data.into_boxed_slice(),
        }
    }
}

impl fmt::Debug for Mask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mask<{}B>{{", self.data.len())?;
        for byte in self.data.iter() {
            write!(f, "{byte:02x}")?;
        }
        write!(f, "}}")
    }
}

/// Anything the facade accepts where a mask is expected: a ready mask, raw
/// stored bytes, or a list of 1-based positions. [`MaskSource::ensure`]
/// normalizes all three to a mask of the model's configured byte length.
#[derive(Debug, Clone)]
pub enum MaskSource {
    Mask(Mask),
    Bytes(Vec<u8>),
    Positions(Vec<u64>),
}

impl MaskSource {
    /// Produce a mask of exactly `len` bytes:
    /// - a mask of the right length passes through untouched
    /// - a mask or raw bytes of a different length is merged into a fresh
    ///   zero mask, silently dropping bits past `8·len`
    /// - positions are validated against `[1, 8·len]`
    pub fn ensure(self, len: usize) -> GibbonResult<Mask> {
        match self {
            Self::Mask(m) if m.len() == len => Ok(m),
            Self::Mask(m) => {
                let mut fit = Mask::try_zeroed(len)?;
                fit.merge(&m);
                Ok(fit)
            }
            Self::Bytes(b) => {
                let mut fit = Mask::try_zeroed(len)?;
                fit.merge(&Mask::decode(&b));
                Ok(fit)
            }
            Self::Positions(ps) => {
                let mut fit = Mask::try_zeroed(len)?;
                fit.set_all(&ps)?;
                Ok(fit)
            }
        }
    }
}

direct_from! {
    MaskSource => {
        Mask as Mask,
        Vec<u8> as Bytes,
        Vec<u64> as Positions,
    }
}

impl From<&Mask> for MaskSource {
    fn from(m: &Mask) -> Self {
        Self::Mask(m.clone())
    }
}

impl From<&[u8]> for MaskSource {
    fn from(b: &[u8]) -> Self {
        Self::Bytes(b.to_vec())
    }
}

impl From<&[u64]> for MaskSource {
    fn from(p: &[u64]) -> Self {
        Self::Positions(p.to_vec())
    }
}

impl<const N: usize> From<[u64; N]> for MaskSource {
    fn from(p: [u64; N]) -> Self {
        Self::Positions(p.to_vec())
    }
}
