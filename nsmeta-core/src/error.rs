//! The error taxonomy of spec §7, as a `thiserror`-derived enum.
//!
//! The teacher models its error taxonomy as one small `enum` per subsystem,
//! all implementing a shared `BaseError: Debug` marker trait
//! (`src/fzboot/err.rs`) because `no_std` leaves little else available. A
//! `std` crate gets to use the ecosystem's actual answer to that problem:
//! one `thiserror`-derived enum per crate, which is what the rest of the
//! example pack's database-backed services do as well.

/// SQLSTATE for a foreign-key violation (spec §6 "Selector for foreign-key
/// violation").
pub const FOREIGN_KEY_VIOLATION_SQLSTATE: &str = "23503";

#[derive(Debug, thiserror::Error)]
pub enum NamespaceError {
    #[error("not found")]
    NotFound,

    #[error("not a directory")]
    NotADirectory,

    #[error("not a file")]
    NotAFile,

    #[error("directory not empty")]
    DirectoryNotEmpty,

    #[error("invalid name: {0:?}")]
    InvalidName(String),

    #[error("duplicate entry")]
    Duplicate,

    #[error("foreign key violation")]
    ForeignKeyViolation,

    /// A database operation reported an affected-row count that disagrees
    /// with what the driver's invariants require. Fatal: per spec §7, this
    /// indicates schema corruption and the enclosing transaction must abort.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("I/O error reading inline data: {0}")]
    Io(String),

    /// `path2inode` exceeded the symlink-hop limit (Design Note §9(b)).
    #[error("too many levels of symbolic links")]
    TooManyLinks,

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl NamespaceError {
    /// Classifies a raw `sqlx::Error` into [`NamespaceError::ForeignKeyViolation`]
    /// when its SQLSTATE matches, or wraps it opaquely otherwise. Spec §7:
    /// "Foreign-key violations are a distinguished typed error derived from
    /// the database SQLSTATE. ... All other errors propagate as-is."
    pub fn from_db_error(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.code().as_deref() == Some(FOREIGN_KEY_VIOLATION_SQLSTATE) {
                return Self::ForeignKeyViolation;
            }
        }
        Self::Database(err)
    }
}

pub type Result<T> = std::result::Result<T, NamespaceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_fk_db_errors_pass_through() {
        let err = sqlx::Error::RowNotFound;
        match NamespaceError::from_db_error(err) {
            NamespaceError::Database(sqlx::Error::RowNotFound) => {}
            other => panic!("unexpected classification: {other:?}"),
        }
    }
}
