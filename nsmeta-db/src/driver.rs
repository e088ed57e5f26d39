//! The SQL driver: the sole mutator of the database (spec §4.1).
//!
//! Every public method takes a generic `sqlx::PgExecutor` so the caller can
//! pass either a bare `&PgPool` or a `&mut Transaction<'_, Postgres>` — spec
//! §5 expects every operation to run "from an already-open database
//! transaction provided by the caller's infrastructure"; this driver does not
//! open transactions itself, it just never requires more than one connection
//! per operation.

use sqlx::{PgExecutor, Row};
use time::OffsetDateTime;

use nsmeta_core::{
    DefinedFields, InodeId, InodeType, NamespaceError, Result, Stat, StatUpdate,
};

use crate::dialect::Dialect;

/// `.`/`..` are reserved and rejected from ordinary remove/move operations
/// (spec §3 "Directory entry").
pub fn is_reserved_name(name: &str) -> bool {
    name == "." || name == ".."
}

/// Synthetic size directories are given at creation (spec §3 "Inode").
pub const SYNTHETIC_DIR_SIZE: u64 = 512;

#[derive(Debug, Clone)]
pub struct NamespaceDriver {
    dialect: Dialect,
    /// Process-wide default for the `iio` column on newly created inodes
    /// (spec §6 "Environment").
    default_io_enabled: bool,
}

impl NamespaceDriver {
    pub fn new(dialect: Dialect, default_io_enabled: bool) -> Self {
        Self {
            dialect,
            default_io_enabled,
        }
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    fn check_name(name: &str) -> Result<()> {
        if name.is_empty() || is_reserved_name(name) {
            return Err(NamespaceError::InvalidName(name.to_string()));
        }
        Ok(())
    }

    /// `createFile(parent, name, uid, gid, mode, type)` (spec §4.1).
    ///
    /// Allocates a fresh inode, links it into `parent` under `name`, and
    /// bumps the parent's `nlink`/`mtime`/`ctime`/`generation`. Directories
    /// get `nlink = 2` and the synthetic 512-byte size; everything else gets
    /// `nlink = 1`. Directory self-references (`.`/`..`) are *not* inserted
    /// here — see [`NamespaceDriver::mkdir`].
    pub async fn create_file<'e, E>(
        &self,
        exec: E,
        parent: InodeId,
        name: &str,
        uid: u32,
        gid: u32,
        mode: u32,
        itype: InodeType,
    ) -> Result<InodeId>
    where
        E: PgExecutor<'e> + Clone,
    {
        Self::check_name(name)?;
        let id = InodeId::generate();
        let now = OffsetDateTime::now_utc();
        let (nlink, size): (i32, i64) = match itype {
            InodeType::Directory => (2, SYNTHETIC_DIR_SIZE as i64),
            _ => (1, 0),
        };

        sqlx::query(
            "insert into t_inodes \
             (ipnfsid, itype, imode, inlink, iuid, igid, isize, iio, \
              iatime, ictime, imtime, icrtime, igeneration) \
             values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9, $9, $9, 0)",
        )
        .bind(id.as_str())
        .bind(itype.to_mode_bits() as i32)
        .bind((itype.to_mode_bits() | (mode & InodeType::PERM_MASK)) as i32)
        .bind(nlink)
        .bind(uid as i32)
        .bind(gid as i32)
        .bind(size)
        .bind(self.default_io_enabled)
        .bind(now)
        .execute(exec.clone())
        .await
        .map_err(NamespaceError::from_db_error)?;

        let inserted = sqlx::query(
            "insert into t_dirs (iparent, iname, ipnfsid) values ($1, $2, $3) \
             on conflict do nothing",
        )
        .bind(parent.as_str())
        .bind(name)
        .bind(id.as_str())
        .execute(exec.clone())
        .await
        .map_err(NamespaceError::from_db_error)?;

        if inserted.rows_affected() == 0 {
            return Err(NamespaceError::Duplicate);
        }

        sqlx::query(
            "update t_inodes set inlink = inlink + 1, imtime = $1, ictime = $1, \
             igeneration = igeneration + 1 where ipnfsid = $2",
        )
        .bind(now)
        .bind(parent.as_str())
        .execute(exec)
        .await
        .map_err(NamespaceError::from_db_error)?;

        Ok(id)
    }

    /// `mkdir`: `createFile` with type `Directory`, plus the `.`/`..`
    /// self-references counted in the child's `nlink` (spec §3 "Directory
    /// entry").
    pub async fn mkdir<'e, E>(
        &self,
        exec: E,
        parent: InodeId,
        name: &str,
        uid: u32,
        gid: u32,
        mode: u32,
    ) -> Result<InodeId>
    where
        E: PgExecutor<'e> + Clone,
    {
        let id = self
            .create_file(exec.clone(), parent, name, uid, gid, mode, InodeType::Directory)
            .await?;

        sqlx::query("insert into t_dirs (iparent, iname, ipnfsid) values ($1, '.', $1)")
            .bind(id.as_str())
            .execute(exec.clone())
            .await
            .map_err(NamespaceError::from_db_error)?;

        sqlx::query("insert into t_dirs (iparent, iname, ipnfsid) values ($1, '..', $2)")
            .bind(id.as_str())
            .bind(parent.as_str())
            .execute(exec)
            .await
            .map_err(NamespaceError::from_db_error)?;

        Ok(id)
    }

    /// Resolves `name` inside `parent`. `.`/`..` resolve normally here (this
    /// is the raw lookup primitive used by the path resolver, not the
    /// name-validating entry points).
    pub async fn lookup_child<'e, E>(
        &self,
        exec: E,
        parent: InodeId,
        name: &str,
    ) -> Result<Option<InodeId>>
    where
        E: PgExecutor<'e>,
    {
        let row = sqlx::query("select ipnfsid from t_dirs where iparent = $1 and iname = $2")
            .bind(parent.as_str())
            .bind(name)
            .fetch_optional(exec)
            .await
            .map_err(NamespaceError::from_db_error)?;

        Ok(match row {
            Some(row) => Some(
                row.get::<String, _>("ipnfsid")
                    .parse()
                    .map_err(|_| NamespaceError::InvariantViolation("malformed child id".into()))?,
            ),
            None => None,
        })
    }

    /// `listDir`: names only, excluding `.`/`..` (spec §4.1 "Listing").
    pub async fn list_dir<'e, E>(&self, exec: E, dir: InodeId) -> Result<Vec<String>>
    where
        E: PgExecutor<'e>,
    {
        let rows = sqlx::query(
            "select iname from t_dirs where iparent = $1 and iname <> '.' and iname <> '..' \
             order by iname",
        )
        .bind(dir.as_str())
        .fetch_all(exec)
        .await
        .map_err(NamespaceError::from_db_error)?;

        Ok(rows.into_iter().map(|r| r.get("iname")).collect())
    }

    /// `remove(parent, name)` (spec §4.1 "Remove").
    ///
    /// The parent's `nlink` is decremented last, to minimize lock hold time
    /// on the parent row during bulk deletes in the same directory (spec §5
    /// "Ordering").
    pub async fn remove_named<'e, E>(&self, exec: E, parent: InodeId, name: &str) -> Result<()>
    where
        E: PgExecutor<'e> + Clone,
    {
        if is_reserved_name(name) {
            return Err(NamespaceError::InvalidName(name.to_string()));
        }

        let child = self
            .lookup_child(exec.clone(), parent, name)
            .await?
            .ok_or(NamespaceError::NotFound)?;

        let row = sqlx::query("select itype, inlink from t_inodes where ipnfsid = $1")
            .bind(child.as_str())
            .fetch_optional(exec.clone())
            .await
            .map_err(NamespaceError::from_db_error)?
            .ok_or_else(|| {
                NamespaceError::InvariantViolation(
                    "t_dirs entry references nonexistent inode".into(),
                )
            })?;

        let itype: i32 = row.get("itype");
        let nlink: i32 = row.get("inlink");
        let now = OffsetDateTime::now_utc();

        if InodeType::from_mode(itype as u32) == Some(InodeType::Directory) {
            if nlink > 2 {
                return Err(NamespaceError::DirectoryNotEmpty);
            }

            let deleted = sqlx::query(
                "delete from t_dirs where iparent = $1 and (iname = '.' or iname = '..')",
            )
            .bind(child.as_str())
            .execute(exec.clone())
            .await
            .map_err(NamespaceError::from_db_error)?;

            if deleted.rows_affected() != 2 {
                return Err(NamespaceError::InvariantViolation(format!(
                    "expected exactly 2 self-reference rows for directory {child}, found {}",
                    deleted.rows_affected()
                )));
            }

            sqlx::query("update t_inodes set inlink = inlink - 2 where ipnfsid = $1")
                .bind(child.as_str())
                .execute(exec.clone())
                .await
                .map_err(NamespaceError::from_db_error)?;

            crate::tags::remove_all_tags(exec.clone(), child).await?;
        } else {
            sqlx::query("update t_inodes set inlink = inlink - 1 where ipnfsid = $1")
                .bind(child.as_str())
                .execute(exec.clone())
                .await
                .map_err(NamespaceError::from_db_error)?;
        }

        sqlx::query("delete from t_dirs where iparent = $1 and iname = $2")
            .bind(parent.as_str())
            .bind(name)
            .execute(exec.clone())
            .await
            .map_err(NamespaceError::from_db_error)?;

        self.gc_if_unlinked(exec.clone(), child).await?;

        sqlx::query(
            "update t_inodes set inlink = inlink - 1, imtime = $1, ictime = $1, \
             igeneration = igeneration + 1 where ipnfsid = $2",
        )
        .bind(now)
        .bind(parent.as_str())
        .execute(exec)
        .await
        .map_err(NamespaceError::from_db_error)?;

        Ok(())
    }

    /// `remove(inode)`: zeroes `nlink`, walks every remaining parent link,
    /// decrements each parent, removes every `t_dirs` row that names this
    /// inode as child, and GCs (spec §4.1 "Remove", point 5).
    pub async fn remove_inode<'e, E>(&self, exec: E, inode: InodeId) -> Result<()>
    where
        E: PgExecutor<'e> + Clone,
    {
        let parents: Vec<String> = sqlx::query(
            "select distinct iparent from t_dirs where ipnfsid = $1 \
             and iname <> '.' and iname <> '..'",
        )
        .bind(inode.as_str())
        .fetch_all(exec.clone())
        .await
        .map_err(NamespaceError::from_db_error)?
        .into_iter()
        .map(|r| r.get("iparent"))
        .collect();

        sqlx::query("update t_inodes set inlink = 0 where ipnfsid = $1")
            .bind(inode.as_str())
            .execute(exec.clone())
            .await
            .map_err(NamespaceError::from_db_error)?;

        for parent in &parents {
            sqlx::query(
                "update t_inodes set inlink = inlink - 1, igeneration = igeneration + 1 \
                 where ipnfsid = $1",
            )
            .bind(parent)
            .execute(exec.clone())
            .await
            .map_err(NamespaceError::from_db_error)?;
        }

        let deleted = sqlx::query(
            "delete from t_dirs where ipnfsid = $1 and iname <> '.' and iname <> '..'",
        )
        .bind(inode.as_str())
        .execute(exec.clone())
        .await
        .map_err(NamespaceError::from_db_error)?;

        if deleted.rows_affected() as usize != parents.len() {
            return Err(NamespaceError::InvariantViolation(format!(
                "expected {} parent-link rows removed for inode {inode}, removed {}",
                parents.len(),
                deleted.rows_affected()
            )));
        }

        crate::tags::remove_all_tags(exec.clone(), inode).await?;
        self.gc_if_unlinked(exec, inode).await
    }

    async fn gc_if_unlinked<'e, E>(&self, exec: E, inode: InodeId) -> Result<()>
    where
        E: PgExecutor<'e>,
    {
        let nlink: Option<i32> = sqlx::query("select inlink from t_inodes where ipnfsid = $1")
            .bind(inode.as_str())
            .fetch_optional(exec.clone())
            .await
            .map_err(NamespaceError::from_db_error)?
            .map(|r| r.get("inlink"));

        if nlink == Some(0) {
            sqlx::query("delete from t_inodes_data where ipnfsid = $1")
                .bind(inode.as_str())
                .execute(exec.clone())
                .await
                .map_err(NamespaceError::from_db_error)?;
            sqlx::query("delete from t_inodes where ipnfsid = $1")
                .bind(inode.as_str())
                .execute(exec)
                .await
                .map_err(NamespaceError::from_db_error)?;
        }
        Ok(())
    }

    /// `move(srcDir, srcName, dstDir, dstName)` (spec §4.1 "Move").
    ///
    /// Updates the single `t_dirs` row in place; if the moved inode is a
    /// directory, also repoints its `..` entry. Per Design Note §9(a), this
    /// does *not* touch `nlink`/`mtime` on the source or destination parent
    /// — a known defect inherited unchanged from the original, not new
    /// behavior introduced here.
    pub async fn mv<'e, E>(
        &self,
        exec: E,
        src_dir: InodeId,
        src_name: &str,
        dst_dir: InodeId,
        dst_name: &str,
    ) -> Result<()>
    where
        E: PgExecutor<'e> + Clone,
    {
        Self::check_name(src_name)?;
        Self::check_name(dst_name)?;

        let child = self
            .lookup_child(exec.clone(), src_dir, src_name)
            .await?
            .ok_or(NamespaceError::NotFound)?;

        let updated = sqlx::query(
            "update t_dirs set iparent = $1, iname = $2 where iparent = $3 and iname = $4",
        )
        .bind(dst_dir.as_str())
        .bind(dst_name)
        .bind(src_dir.as_str())
        .bind(src_name)
        .execute(exec.clone())
        .await
        .map_err(NamespaceError::from_db_error)?;

        if updated.rows_affected() != 1 {
            return Err(NamespaceError::InvariantViolation(format!(
                "move updated {} rows, expected 1",
                updated.rows_affected()
            )));
        }

        let itype: Option<i32> = sqlx::query("select itype from t_inodes where ipnfsid = $1")
            .bind(child.as_str())
            .fetch_optional(exec.clone())
            .await
            .map_err(NamespaceError::from_db_error)?
            .map(|r| r.get("itype"));

        if itype.and_then(|t| InodeType::from_mode(t as u32)) == Some(InodeType::Directory) {
            sqlx::query("update t_dirs set ipnfsid = $1 where iparent = $2 and iname = '..'")
                .bind(dst_dir.as_str())
                .bind(child.as_str())
                .execute(exec)
                .await
                .map_err(NamespaceError::from_db_error)?;
        }

        Ok(())
    }

    /// `stat(inode, level)`: reads the inode (or level-N) row. Missing row
    /// returns `Ok(None)` (spec §4.1 "Stat and setattr").
    pub async fn stat<'e, E>(&self, exec: E, inode: InodeId, level: u8) -> Result<Option<Stat>>
    where
        E: PgExecutor<'e>,
    {
        if level == 0 {
            let row = sqlx::query(
                "select imode, iuid, igid, inlink, isize, iio, iatime, ictime, imtime, \
                 icrtime, igeneration, iaccess_latency, iretention_policy \
                 from t_inodes where ipnfsid = $1",
            )
            .bind(inode.as_str())
            .fetch_optional(exec)
            .await
            .map_err(NamespaceError::from_db_error)?;

            Ok(row.map(|row| Stat {
                id: inode,
                level: 0,
                mode: row.get::<i32, _>("imode") as u32,
                uid: row.get::<i32, _>("iuid") as u32,
                gid: row.get::<i32, _>("igid") as u32,
                nlink: row.get::<i32, _>("inlink") as u32,
                size: row.get::<i64, _>("isize") as u64,
                io_enabled: row.get("iio"),
                atime: row.get("iatime"),
                ctime: row.get("ictime"),
                mtime: row.get("imtime"),
                crtime: row.get("icrtime"),
                generation: row.get::<i64, _>("igeneration") as u64,
                access_latency: row.get("iaccess_latency"),
                retention_policy: row.get("iretention_policy"),
            }))
        } else {
            let table = level_table(level)?;
            let sql = format!(
                "select imode, iuid, igid, isize, iatime, ictime, imtime from {table} \
                 where ipnfsid = $1"
            );
            let row = sqlx::query(&sql)
                .bind(inode.as_str())
                .fetch_optional(exec)
                .await
                .map_err(NamespaceError::from_db_error)?;

            Ok(row.map(|row| Stat {
                id: inode,
                level,
                mode: row.get::<i32, _>("imode") as u32,
                uid: row.get::<i32, _>("iuid") as u32,
                gid: row.get::<i32, _>("igid") as u32,
                nlink: 1,
                size: row.get::<i64, _>("isize") as u64,
                io_enabled: false,
                atime: row.get("iatime"),
                ctime: row.get("ictime"),
                mtime: row.get("imtime"),
                crtime: row.get("ictime"),
                generation: 0,
                access_latency: None,
                retention_policy: None,
            }))
        }
    }

    /// `setInodeAttributes`: a dynamic `UPDATE` whose `SET` clause only
    /// includes attributes marked defined in `update.defined` (spec §4.1
    /// "Stat and setattr", Design Note §9).
    pub async fn set_inode_attributes<'e, E>(
        &self,
        exec: E,
        inode: InodeId,
        level: u8,
        update: &StatUpdate,
    ) -> Result<()>
    where
        E: PgExecutor<'e>,
    {
        if level != 0 && update.defined.contains(DefinedFields::SIZE) {
            return Err(NamespaceError::InvalidName(
                "size is only settable at level 0".into(),
            ));
        }

        let table = if level == 0 {
            "t_inodes"
        } else {
            level_table(level)?
        };

        let now = OffsetDateTime::now_utc();
        let ctime = if update.defined.contains(DefinedFields::CTIME) {
            update.ctime.unwrap_or(now)
        } else {
            now
        };

        let mut builder = sqlx::QueryBuilder::new(format!("update {table} set "));
        let mut first = true;
        macro_rules! set {
            ($col:literal, $val:expr) => {{
                if !first {
                    builder.push(", ");
                }
                first = false;
                builder.push($col).push(" = ").push_bind($val);
            }};
        }

        if update.defined.contains(DefinedFields::MODE) {
            set!("imode", update.mode as i32);
        }
        if update.defined.contains(DefinedFields::UID) {
            set!("iuid", update.uid as i32);
        }
        if update.defined.contains(DefinedFields::GID) {
            set!("igid", update.gid as i32);
        }
        let size_defined = level == 0 && update.defined.contains(DefinedFields::SIZE);
        if size_defined {
            set!("isize", update.size as i64);
            if !update.defined.contains(DefinedFields::MTIME) {
                if !first {
                    builder.push(", ");
                }
                first = false;
                builder.push("imtime = ictime");
            }
        }
        if level == 0 && update.defined.contains(DefinedFields::IO_ENABLED) {
            set!("iio", update.io_enabled);
        }
        if level == 0 {
            if let Some(al) = update
                .access_latency
                .filter(|_| update.defined.contains(DefinedFields::ACCESS_LATENCY))
            {
                set!("iaccess_latency", al);
            }
            if let Some(rp) = update
                .retention_policy
                .filter(|_| update.defined.contains(DefinedFields::RETENTION_POLICY))
            {
                set!("iretention_policy", rp);
            }
        }

        set!("ictime", ctime);

        if update.defined.contains(DefinedFields::ATIME) {
            if let Some(atime) = update.atime {
                set!("iatime", atime);
            }
        }
        if update.defined.contains(DefinedFields::MTIME) {
            if let Some(mtime) = update.mtime {
                set!("imtime", mtime);
            }
        }

        if level == 0 {
            if !first {
                builder.push(", ");
            }
            first = false;
            builder.push("igeneration = igeneration + 1");
        }

        if first {
            return Ok(());
        }

        builder.push(" where ipnfsid = ").push_bind(inode.as_str());
        if size_defined {
            builder.push(" and itype = ").push_bind(InodeType::RegularFile as i32);
        }

        let result = builder
            .build()
            .execute(exec)
            .await
            .map_err(NamespaceError::from_db_error)?;

        if result.rows_affected() == 0 {
            return Err(if size_defined {
                NamespaceError::NotAFile
            } else {
                NamespaceError::NotFound
            });
        }
        Ok(())
    }

    /// `write(inode, level, buf)`: replaces the level's blob wholesale.
    /// Per Design Note §9(c), the original `beginIndex`/`offset` parameters
    /// existed but were ignored; this redesign drops them rather than carry
    /// forward a misleading signature. After a level-0 write, `isize` is set
    /// to `buf.len()`.
    pub async fn write<'e, E>(&self, exec: E, inode: InodeId, level: u8, buf: &[u8]) -> Result<()>
    where
        E: PgExecutor<'e> + Clone,
    {
        if level == 0 {
            sqlx::query(
                "insert into t_inodes_data (ipnfsid, ifiledata) values ($1, $2) \
                 on conflict (ipnfsid) do update set ifiledata = excluded.ifiledata",
            )
            .bind(inode.as_str())
            .bind(buf)
            .execute(exec.clone())
            .await
            .map_err(NamespaceError::from_db_error)?;

            sqlx::query(
                "update t_inodes set isize = $1, igeneration = igeneration + 1 \
                 where ipnfsid = $2",
            )
            .bind(buf.len() as i64)
            .bind(inode.as_str())
            .execute(exec)
            .await
            .map_err(NamespaceError::from_db_error)?;
        } else {
            let table = level_table(level)?;
            let sql = format!(
                "insert into {table} (ipnfsid, imode, isize, iuid, igid, iatime, ictime, imtime, ifiledata) \
                 values ($1, 0, $2, 0, 0, now(), now(), now(), $3) \
                 on conflict (ipnfsid) do update set ifiledata = excluded.ifiledata, isize = excluded.isize, imtime = now()"
            );
            sqlx::query(&sql)
                .bind(inode.as_str())
                .bind(buf.len() as i64)
                .bind(buf)
                .execute(exec)
                .await
                .map_err(NamespaceError::from_db_error)?;
        }
        Ok(())
    }

    /// `read(inode, level, beginIndex, len)`: skips `begin_index` bytes of
    /// the blob, then reads up to `len` bytes.
    pub async fn read<'e, E>(
        &self,
        exec: E,
        inode: InodeId,
        level: u8,
        begin_index: usize,
        len: usize,
    ) -> Result<Vec<u8>>
    where
        E: PgExecutor<'e>,
    {
        let blob: Option<Vec<u8>> = if level == 0 {
            sqlx::query("select ifiledata from t_inodes_data where ipnfsid = $1")
                .bind(inode.as_str())
                .fetch_optional(exec)
                .await
                .map_err(NamespaceError::from_db_error)?
                .map(|r| r.get("ifiledata"))
        } else {
            let table = level_table(level)?;
            let sql = format!("select ifiledata from {table} where ipnfsid = $1");
            sqlx::query(&sql)
                .bind(inode.as_str())
                .fetch_optional(exec)
                .await
                .map_err(NamespaceError::from_db_error)?
                .and_then(|r| r.get("ifiledata"))
        };

        let blob = blob.unwrap_or_default();
        if begin_index >= blob.len() {
            return Ok(Vec::new());
        }
        let end = (begin_index + len).min(blob.len());
        Ok(blob[begin_index..end].to_vec())
    }

    /// `mkdirWithTagsAndAcl`: `mkdir`, then atomically inherits the parent's
    /// tags (as COW links, spec §4.1 "Tags") and copies the parent's ACL
    /// entries onto the new directory.
    pub async fn mkdir_with_tags_and_acl<'e, E>(
        &self,
        exec: E,
        parent: InodeId,
        name: &str,
        uid: u32,
        gid: u32,
        mode: u32,
    ) -> Result<InodeId>
    where
        E: PgExecutor<'e> + Clone,
    {
        let id = self
            .mkdir(exec.clone(), parent, name, uid, gid, mode)
            .await?;
        crate::tags::inherit_tags(exec.clone(), parent, id).await?;

        let parent_acl = self.get_acl(exec.clone(), parent).await?;
        if !parent_acl.is_empty() {
            self.set_acl(exec, id, &parent_acl).await?;
        }
        Ok(id)
    }

    /// `addInodeLocation` (spec §4.1 "Location info").
    pub async fn add_inode_location<'e, E>(
        &self,
        exec: E,
        inode: InodeId,
        location_type: i32,
        location: &str,
        priority: i32,
    ) -> Result<()>
    where
        E: PgExecutor<'e>,
    {
        let now = OffsetDateTime::now_utc();
        sqlx::query(
            "insert into t_locationinfo \
             (ipnfsid, itype, ilocation, ipriority, ictime, iatime, istate) \
             values ($1, $2, $3, $4, $5, $5, 1) \
             on conflict (ipnfsid, itype, ilocation) do update set \
             ipriority = excluded.ipriority, iatime = excluded.iatime",
        )
        .bind(inode.as_str())
        .bind(location_type)
        .bind(location)
        .bind(priority)
        .bind(now)
        .execute(exec)
        .await
        .map_err(NamespaceError::from_db_error)?;
        Ok(())
    }

    /// `getInodeLocations`: every known location of `inode`, optionally
    /// filtered to a single `location_type`.
    pub async fn get_inode_locations<'e, E>(
        &self,
        exec: E,
        inode: InodeId,
        location_type: Option<i32>,
    ) -> Result<Vec<nsmeta_core::LocationEntry>>
    where
        E: PgExecutor<'e>,
    {
        use nsmeta_core::LocationState;

        let rows = match location_type {
            Some(t) => {
                sqlx::query(
                    "select itype, ilocation, ipriority, ictime, iatime, istate \
                     from t_locationinfo where ipnfsid = $1 and itype = $2 \
                     order by ipriority desc",
                )
                .bind(inode.as_str())
                .bind(t)
                .fetch_all(exec)
                .await
            }
            None => {
                sqlx::query(
                    "select itype, ilocation, ipriority, ictime, iatime, istate \
                     from t_locationinfo where ipnfsid = $1 order by ipriority desc",
                )
                .bind(inode.as_str())
                .fetch_all(exec)
                .await
            }
        }
        .map_err(NamespaceError::from_db_error)?;

        rows.into_iter()
            .map(|row| {
                let state_code: i16 = row.get("istate");
                Ok(nsmeta_core::LocationEntry {
                    location_type: row.get("itype"),
                    location: row.get("ilocation"),
                    priority: row.get("ipriority"),
                    ctime: row.get("ictime"),
                    atime: row.get("iatime"),
                    state: LocationState::from_code(state_code).ok_or_else(|| {
                        NamespaceError::InvariantViolation(format!(
                            "unknown location state code {state_code}"
                        ))
                    })?,
                })
            })
            .collect()
    }

    /// `deleteInodeLocation` (spec §4.1 "Location info").
    pub async fn delete_inode_location<'e, E>(
        &self,
        exec: E,
        inode: InodeId,
        location_type: i32,
        location: &str,
    ) -> Result<()>
    where
        E: PgExecutor<'e>,
    {
        let deleted = sqlx::query(
            "delete from t_locationinfo where ipnfsid = $1 and itype = $2 and ilocation = $3",
        )
        .bind(inode.as_str())
        .bind(location_type)
        .bind(location)
        .execute(exec)
        .await
        .map_err(NamespaceError::from_db_error)?;

        if deleted.rows_affected() == 0 {
            return Err(NamespaceError::NotFound);
        }
        Ok(())
    }

    /// `setACL`: replaces the entire ACL of `inode` with `entries` (spec
    /// §4.1 "ACL").
    pub async fn set_acl<'e, E>(&self, exec: E, inode: InodeId, acl: &nsmeta_core::Acl) -> Result<()>
    where
        E: PgExecutor<'e> + Clone,
    {
        sqlx::query("delete from t_acl where rs_id = $1")
            .bind(inode.as_str())
            .execute(exec.clone())
            .await
            .map_err(NamespaceError::from_db_error)?;

        for ace in &acl.entries {
            sqlx::query(
                "insert into t_acl (rs_id, rs_type, ace_order, type, flags, access_msk, who, who_id) \
                 values ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(inode.as_str())
            .bind(ace.rs_type as i16)
            .bind(ace.order)
            .bind(ace.ace_type)
            .bind(ace.flags)
            .bind(ace.mask)
            .bind(ace.who)
            .bind(ace.who_id)
            .execute(exec.clone())
            .await
            .map_err(NamespaceError::from_db_error)?;
        }
        Ok(())
    }

    /// `getACL`: the full, order-sorted ACL of `inode`.
    pub async fn get_acl<'e, E>(&self, exec: E, inode: InodeId) -> Result<nsmeta_core::Acl>
    where
        E: PgExecutor<'e>,
    {
        use nsmeta_core::{Ace, RsType};

        let rows = sqlx::query(
            "select rs_type, ace_order, type, flags, access_msk, who, who_id \
             from t_acl where rs_id = $1 order by ace_order",
        )
        .bind(inode.as_str())
        .fetch_all(exec)
        .await
        .map_err(NamespaceError::from_db_error)?;

        let entries = rows
            .into_iter()
            .map(|row| {
                let rs_type_code: i16 = row.get("rs_type");
                Ok(Ace {
                    rs_type: RsType::from_code(rs_type_code).ok_or_else(|| {
                        NamespaceError::InvariantViolation(format!(
                            "unknown rs_type code {rs_type_code}"
                        ))
                    })?,
                    ace_type: row.get("type"),
                    flags: row.get("flags"),
                    mask: row.get("access_msk"),
                    who: row.get("who"),
                    who_id: row.get("who_id"),
                    order: row.get("ace_order"),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(nsmeta_core::Acl::new(Some(inode), entries))
    }

    /// `setStorageInfo` (spec §6 "Storage info").
    pub async fn set_storage_info<'e, E>(
        &self,
        exec: E,
        inode: InodeId,
        hsm_name: &str,
        storage_group: &str,
        storage_sub_group: &str,
    ) -> Result<()>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query(
            "insert into t_storageinfo (ipnfsid, ihsmName, istorageGroup, istorageSubGroup) \
             values ($1, $2, $3, $4) \
             on conflict (ipnfsid) do update set \
             ihsmName = excluded.ihsmName, istorageGroup = excluded.istorageGroup, \
             istorageSubGroup = excluded.istorageSubGroup",
        )
        .bind(inode.as_str())
        .bind(hsm_name)
        .bind(storage_group)
        .bind(storage_sub_group)
        .execute(exec)
        .await
        .map_err(NamespaceError::from_db_error)?;
        Ok(())
    }

    /// `getStorageInfo`.
    pub async fn get_storage_info<'e, E>(
        &self,
        exec: E,
        inode: InodeId,
    ) -> Result<Option<(String, String, String)>>
    where
        E: PgExecutor<'e>,
    {
        let row = sqlx::query(
            "select ihsmName, istorageGroup, istorageSubGroup from t_storageinfo \
             where ipnfsid = $1",
        )
        .bind(inode.as_str())
        .fetch_optional(exec)
        .await
        .map_err(NamespaceError::from_db_error)?;

        Ok(row.map(|row| {
            (
                row.get("ihsmName"),
                row.get("istorageGroup"),
                row.get("istorageSubGroup"),
            )
        }))
    }

    /// `setAccessLatency` using the single-column upsert from [`Dialect`]
    /// (the one statement shape the spec singles out as dialect-sensitive).
    pub async fn set_access_latency<'e, E>(&self, exec: E, inode: InodeId, code: i32) -> Result<()>
    where
        E: PgExecutor<'e>,
    {
        let sql = self
            .dialect
            .upsert_sql("t_access_latency", "iaccessLatency");
        sqlx::query(&sql)
            .bind(inode.as_str())
            .bind(code)
            .execute(exec)
            .await
            .map_err(NamespaceError::from_db_error)?;
        Ok(())
    }

    pub async fn get_access_latency<'e, E>(&self, exec: E, inode: InodeId) -> Result<Option<i32>>
    where
        E: PgExecutor<'e>,
    {
        let row = sqlx::query("select iaccessLatency from t_access_latency where ipnfsid = $1")
            .bind(inode.as_str())
            .fetch_optional(exec)
            .await
            .map_err(NamespaceError::from_db_error)?;
        Ok(row.map(|r| r.get("iaccessLatency")))
    }

    /// `setRetentionPolicy`, via the same dialect-sensitive upsert shape.
    pub async fn set_retention_policy<'e, E>(&self, exec: E, inode: InodeId, code: i32) -> Result<()>
    where
        E: PgExecutor<'e>,
    {
        let sql = self
            .dialect
            .upsert_sql("t_retention_policy", "iretentionPolicy");
        sqlx::query(&sql)
            .bind(inode.as_str())
            .bind(code)
            .execute(exec)
            .await
            .map_err(NamespaceError::from_db_error)?;
        Ok(())
    }

    pub async fn get_retention_policy<'e, E>(&self, exec: E, inode: InodeId) -> Result<Option<i32>>
    where
        E: PgExecutor<'e>,
    {
        let row =
            sqlx::query("select iretentionPolicy from t_retention_policy where ipnfsid = $1")
                .bind(inode.as_str())
                .fetch_optional(exec)
                .await
                .map_err(NamespaceError::from_db_error)?;
        Ok(row.map(|r| r.get("iretentionPolicy")))
    }

    /// `addChecksum` (spec §4.1 "Checksums"). Replaces any existing checksum
    /// of the same algorithm for this inode.
    pub async fn add_checksum<'e, E>(
        &self,
        exec: E,
        inode: InodeId,
        algorithm: nsmeta_core::ChecksumAlgorithm,
        hex_value: &str,
    ) -> Result<()>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query(
            "insert into t_inodes_checksum (ipnfsid, itype, isum) values ($1, $2, $3) \
             on conflict (ipnfsid, itype) do update set isum = excluded.isum",
        )
        .bind(inode.as_str())
        .bind(algorithm.code())
        .bind(hex_value)
        .execute(exec)
        .await
        .map_err(NamespaceError::from_db_error)?;
        Ok(())
    }

    /// `getChecksums`: every checksum recorded for `inode`.
    pub async fn get_checksums<'e, E>(
        &self,
        exec: E,
        inode: InodeId,
    ) -> Result<Vec<nsmeta_core::ChecksumRecord>>
    where
        E: PgExecutor<'e>,
    {
        use nsmeta_core::ChecksumAlgorithm;

        let rows = sqlx::query("select itype, isum from t_inodes_checksum where ipnfsid = $1")
            .bind(inode.as_str())
            .fetch_all(exec)
            .await
            .map_err(NamespaceError::from_db_error)?;

        rows.into_iter()
            .map(|row| {
                let code: i16 = row.get("itype");
                Ok(nsmeta_core::ChecksumRecord {
                    algorithm: ChecksumAlgorithm::from_code(code).ok_or_else(|| {
                        NamespaceError::InvariantViolation(format!(
                            "unknown checksum algorithm code {code}"
                        ))
                    })?,
                    hex_value: row.get("isum"),
                })
            })
            .collect()
    }

    /// `removeChecksum`.
    pub async fn remove_checksum<'e, E>(
        &self,
        exec: E,
        inode: InodeId,
        algorithm: nsmeta_core::ChecksumAlgorithm,
    ) -> Result<()>
    where
        E: PgExecutor<'e>,
    {
        let deleted = sqlx::query(
            "delete from t_inodes_checksum where ipnfsid = $1 and itype = $2",
        )
        .bind(inode.as_str())
        .bind(algorithm.code())
        .execute(exec)
        .await
        .map_err(NamespaceError::from_db_error)?;

        if deleted.rows_affected() == 0 {
            return Err(NamespaceError::NotFound);
        }
        Ok(())
    }
}

fn level_table(level: u8) -> Result<&'static str> {
    match level {
        1 => Ok("t_level_1"),
        2 => Ok("t_level_2"),
        3 => Ok("t_level_3"),
        4 => Ok("t_level_4"),
        5 => Ok("t_level_5"),
        6 => Ok("t_level_6"),
        7 => Ok("t_level_7"),
        _ => Err(NamespaceError::InvalidName(format!("invalid level {level}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_names_rejected() {
        assert!(is_reserved_name("."));
        assert!(is_reserved_name(".."));
        assert!(!is_reserved_name("a"));
    }

    #[test]
    fn level_table_bounds() {
        assert!(level_table(0).is_err());
        assert!(level_table(7).is_ok());
        assert!(level_table(8).is_err());
    }
}
