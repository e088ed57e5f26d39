//! SQL driver, schema migrations, path resolver and directory stream for the
//! namespace metadata engine.
//!
//! [`NamespaceDriver`] is the only component in this crate that issues
//! mutating SQL; [`resolver`] and [`stream`] are built entirely on top of its
//! public methods, matching the layering the spec draws between the driver
//! and everything above it.

pub mod dialect;
pub mod driver;
pub mod resolver;
pub mod stream;
pub mod tags;

pub use dialect::Dialect;
pub use driver::NamespaceDriver;
pub use resolver::{path2inode, path2inodes, ResolvedPath, MAX_SYMLINK_HOPS};
pub use stream::{DirEntry, DirectoryStream};

/// Embedded schema migrations (spec §6), applied with `sqlx::migrate!` at
/// startup by `nsmeta-cli`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
