//! Stat records and the defined-fields bitset used by `setInodeAttributes`.

use time::OffsetDateTime;

use crate::ids::InodeId;

/// A snapshot of an inode's (or an inode-level's) attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Stat {
    pub id: InodeId,
    pub level: u8,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub nlink: u32,
    pub size: u64,
    pub io_enabled: bool,
    pub atime: OffsetDateTime,
    pub ctime: OffsetDateTime,
    pub mtime: OffsetDateTime,
    pub crtime: OffsetDateTime,
    pub generation: u64,
    pub access_latency: Option<i32>,
    pub retention_policy: Option<i32>,
}

bitflags::bitflags! {
    /// Which fields of a [`StatUpdate`] the caller actually set, per Design
    /// Note §9: "optional fields ... are best modeled as a bitset beside the
    /// value record; the dynamic SQL builder reads the bitset."
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DefinedFields: u32 {
        const MODE             = 1 << 0;
        const UID              = 1 << 1;
        const GID              = 1 << 2;
        const SIZE             = 1 << 3;
        const ATIME            = 1 << 4;
        const CTIME             = 1 << 5;
        const MTIME            = 1 << 6;
        const IO_ENABLED       = 1 << 7;
        const ACCESS_LATENCY   = 1 << 8;
        const RETENTION_POLICY = 1 << 9;
    }
}

/// A partial attribute update, as consumed by `setInodeAttributes`.
///
/// Only fields whose bit is set in `defined` are ever read; the rest of the
/// struct's values are don't-cares. Use [`StatUpdate::builder`] to build one.
#[derive(Debug, Clone, Default)]
pub struct StatUpdate {
    pub defined: DefinedFields,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    pub atime: Option<OffsetDateTime>,
    pub ctime: Option<OffsetDateTime>,
    pub mtime: Option<OffsetDateTime>,
    pub io_enabled: bool,
    pub access_latency: Option<i32>,
    pub retention_policy: Option<i32>,
}

impl StatUpdate {
    pub fn builder() -> StatUpdateBuilder {
        StatUpdateBuilder::default()
    }

    pub fn is_defined(&self, field: DefinedFields) -> bool {
        self.defined.contains(field)
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatUpdateBuilder {
    inner: StatUpdate,
}

impl StatUpdateBuilder {
    pub fn mode(mut self, mode: u32) -> Self {
        self.inner.mode = mode;
        self.inner.defined |= DefinedFields::MODE;
        self
    }

    pub fn uid(mut self, uid: u32) -> Self {
        self.inner.uid = uid;
        self.inner.defined |= DefinedFields::UID;
        self
    }

    pub fn gid(mut self, gid: u32) -> Self {
        self.inner.gid = gid;
        self.inner.defined |= DefinedFields::GID;
        self
    }

    pub fn size(mut self, size: u64) -> Self {
        self.inner.size = size;
        self.inner.defined |= DefinedFields::SIZE;
        self
    }

    pub fn atime(mut self, t: OffsetDateTime) -> Self {
        self.inner.atime = Some(t);
        self.inner.defined |= DefinedFields::ATIME;
        self
    }

    pub fn ctime(mut self, t: OffsetDateTime) -> Self {
        self.inner.ctime = Some(t);
        self.inner.defined |= DefinedFields::CTIME;
        self
    }

    pub fn mtime(mut self, t: OffsetDateTime) -> Self {
        self.inner.mtime = Some(t);
        self.inner.defined |= DefinedFields::MTIME;
        self
    }

    pub fn io_enabled(mut self, enabled: bool) -> Self {
        self.inner.io_enabled = enabled;
        self.inner.defined |= DefinedFields::IO_ENABLED;
        self
    }

    pub fn access_latency(mut self, code: i32) -> Self {
        self.inner.access_latency = Some(code);
        self.inner.defined |= DefinedFields::ACCESS_LATENCY;
        self
    }

    pub fn retention_policy(mut self, code: i32) -> Self {
        self.inner.retention_policy = Some(code);
        self.inner.defined |= DefinedFields::RETENTION_POLICY;
        self
    }

    pub fn build(self) -> StatUpdate {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_tracks_only_set_fields() {
        let update = StatUpdate::builder().uid(1000).size(42).build();
        assert!(update.is_defined(DefinedFields::UID));
        assert!(update.is_defined(DefinedFields::SIZE));
        assert!(!update.is_defined(DefinedFields::MODE));
        assert!(!update.is_defined(DefinedFields::GID));
    }
}
