//! Access-control entries, ordered per inode.

use crate::ids::InodeId;

/// The resource an ACE applies to: the inode's own ACL (`Allow`/`Deny` on
/// the object itself) or its default ACL (inherited by new children).
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "smallint")]
#[repr(i16)]
pub enum RsType {
    Object = 0,
    DefaultObject = 1,
}

impl RsType {
    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(Self::Object),
            1 => Some(Self::DefaultObject),
            _ => None,
        }
    }
}

/// A single access-control entry, with the ordinal that preserves input
/// order across reads (`ace_order` in `t_acl`).
#[derive(Debug, Clone, PartialEq)]
pub struct Ace {
    pub rs_type: RsType,
    /// ALLOW / DENY / AUDIT, left as an opaque code: the engine stores ACEs,
    /// it does not evaluate them (spec §1 "Out of scope").
    pub ace_type: i16,
    pub flags: i32,
    pub mask: i32,
    /// Principal kind: USER, GROUP, EVERYONE, ... left opaque for the same
    /// reason.
    pub who: i32,
    pub who_id: i32,
    pub order: i32,
}

/// The ordered ACL for a single inode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Acl {
    pub inode: Option<InodeId>,
    pub entries: Vec<Ace>,
}

impl Acl {
    pub fn new(inode: Option<InodeId>, mut entries: Vec<Ace>) -> Self {
        entries.sort_by_key(|e| e.order);
        Self { inode, entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
