//! Identifier and value types shared by the namespace metadata engine.
//!
//! This crate has no database dependency of its own beyond the `sqlx::Type`
//! derives on a handful of enums (so `nsmeta-db` can bind them directly);
//! everything here is a plain, immutable value type, matching spec §5
//! ("stat/ACE/checksum value types are immutable after construction").

pub mod acl;
pub mod checksum;
pub mod error;
pub mod ids;
pub mod location;
pub mod stat;
pub mod tag;

pub use acl::{Ace, Acl, RsType};
pub use checksum::{ChecksumAlgorithm, ChecksumRecord};
pub use error::{NamespaceError, Result};
pub use ids::{InodeId, InodeType, INODE_ID_LEN};
pub use location::{LocationEntry, LocationState, DEFAULT_LOCATION_PRIORITY};
pub use stat::{DefinedFields, Stat, StatUpdate, StatUpdateBuilder};
pub use tag::{TagLink, TagValue};
