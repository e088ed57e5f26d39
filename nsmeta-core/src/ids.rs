//! Stable inode identifiers.
//!
//! Mirrors the newtype-over-primitive idiom used throughout the teacher's
//! `ext4` inode numbering (`InodeNumber`, `InodeGeneration`, ...): a thin
//! wrapper that forbids accidental arithmetic on what is conceptually an
//! opaque token, with `Display`/`FromStr` doing the actual formatting.

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

/// Length, in bytes, of the textual representation of an [`InodeId`].
pub const INODE_ID_LEN: usize = 36;

/// A 36-character uppercase opaque inode identifier.
///
/// The well-known root inode is [`InodeId::ROOT`], 36 ASCII zeroes.
///
/// Bound to queries via [`InodeId::as_str`] rather than a `sqlx::Type` impl
/// of its own — every `char(36)` column is bound and read back as `&str`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InodeId([u8; INODE_ID_LEN]);

impl InodeId {
    /// The well-known root inode id: 36 ASCII `'0'` characters.
    pub const ROOT: InodeId = InodeId([b'0'; INODE_ID_LEN]);

    /// Allocates a fresh, random inode id.
    ///
    /// Encodes a v4 UUID as 32 uppercase hex digits, left-padded with four
    /// more hex digits of randomness to fill the 36-character slot (the
    /// schema fixes `char(36)`; a plain hyphen-free UUID is only 32 hex
    /// digits long).
    pub fn generate() -> Self {
        let hi = Uuid::new_v4();
        let lo = Uuid::new_v4();
        let text = format!(
            "{:032X}{:04X}",
            hi.as_u128(),
            (lo.as_u128() & 0xFFFF) as u16
        );
        Self::from_str(&text).expect("generated id is always well-formed")
    }

    /// Returns the id as an uppercase ASCII string slice.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).expect("InodeId is always ASCII")
    }

    pub fn is_root(&self) -> bool {
        *self == Self::ROOT
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid inode id {0:?}: must be {INODE_ID_LEN} uppercase hex/ASCII characters")]
pub struct InvalidInodeId(String);

impl FromStr for InodeId {
    type Err = InvalidInodeId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != INODE_ID_LEN || !s.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(InvalidInodeId(s.to_string()));
        }
        let mut buf = [0u8; INODE_ID_LEN];
        buf.copy_from_slice(s.as_bytes());
        buf.make_ascii_uppercase();
        Ok(Self(buf))
    }
}

impl fmt::Display for InodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for InodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InodeId({})", self.as_str())
    }
}

/// POSIX mode high bits identifying the inode's type, per spec §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum InodeType {
    RegularFile = 0o100000,
    Directory = 0o040000,
    SymbolicLink = 0o120000,
}

impl InodeType {
    pub const S_IFMT: u32 = 0o170000;
    pub const PERM_MASK: u32 = 0o7777;

    /// Extracts the inode type from a full POSIX mode value.
    pub fn from_mode(mode: u32) -> Option<Self> {
        match mode & Self::S_IFMT {
            x if x == Self::RegularFile as u32 => Some(Self::RegularFile),
            x if x == Self::Directory as u32 => Some(Self::Directory),
            x if x == Self::SymbolicLink as u32 => Some(Self::SymbolicLink),
            _ => None,
        }
    }

    /// The permission bits (low 12 bits) of `mode`, independent of type.
    pub fn perm_bits(mode: u32) -> u32 {
        mode & Self::PERM_MASK
    }

    pub fn to_mode_bits(self) -> u32 {
        self as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_is_36_zeroes() {
        assert_eq!(InodeId::ROOT.as_str(), "0".repeat(36));
    }

    #[test]
    fn generate_round_trips_through_display() {
        let id = InodeId::generate();
        let text = id.to_string();
        let parsed: InodeId = text.parse().unwrap();
        assert_eq!(id, parsed);
        assert_eq!(text.len(), INODE_ID_LEN);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!("too-short".parse::<InodeId>().is_err());
    }

    #[test]
    fn type_from_mode() {
        assert_eq!(
            InodeType::from_mode(0o040755),
            Some(InodeType::Directory)
        );
        assert_eq!(InodeType::perm_bits(0o040755), 0o755);
    }
}
