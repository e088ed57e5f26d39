//! Per-inode, per-algorithm checksum records.

/// A single (algorithm, hex-digest) pair attached to an inode. An inode may
/// carry several, one per algorithm (spec §3 "Checksum").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumRecord {
    pub algorithm: ChecksumAlgorithm,
    pub hex_value: String,
}

/// The small set of checksum algorithms the schema's `itype` column encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "smallint")]
#[repr(i16)]
pub enum ChecksumAlgorithm {
    Adler32 = 1,
    Md5 = 2,
    Md4 = 3,
    Sha1 = 4,
}

impl ChecksumAlgorithm {
    pub fn code(self) -> i16 {
        self as i16
    }

    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            1 => Some(Self::Adler32),
            2 => Some(Self::Md5),
            3 => Some(Self::Md4),
            4 => Some(Self::Sha1),
            _ => None,
        }
    }
}
