//! Tag copy-on-write semantics (spec §4.1 "Tags").
//!
//! A tag name inside a directory points at a `t_tags_inodes` row (the tag's
//! value blob). New subdirectories inherit their parent's tags by pointing at
//! the *same* `t_tags_inodes` row (`isorign = 0`, "inherited"); the directory
//! that first created the tag keeps `isorign = 1` ("origin"). Writing to an
//! inherited tag forks: a fresh `t_tags_inodes` row is allocated for that
//! directory alone, and every other directory's `t_tags` entry keeps pointing
//! at the original — bunching of writers is undone lazily, on first write.

use sqlx::{PgExecutor, Row};
use time::OffsetDateTime;

use nsmeta_core::{InodeId, NamespaceError, Result, TagValue};

/// Copies every tag of `parent` onto `child` as inherited links (spec
/// §4.1 "mkdirWithTagsAndAcl" / plain `mkdir` inheritance rule).
pub async fn inherit_tags<'e, E>(exec: E, parent: InodeId, child: InodeId) -> Result<()>
where
    E: PgExecutor<'e> + Clone,
{
    let rows = sqlx::query("select itagname, itagid from t_tags where ipnfsid = $1")
        .bind(parent.as_str())
        .fetch_all(exec.clone())
        .await
        .map_err(NamespaceError::from_db_error)?;

    for row in rows {
        let name: String = row.get("itagname");
        let tag_id: String = row.get("itagid");
        sqlx::query(
            "insert into t_tags (ipnfsid, itagname, itagid, isorign) values ($1, $2, $3, 0)",
        )
        .bind(child.as_str())
        .bind(&name)
        .bind(&tag_id)
        .execute(exec.clone())
        .await
        .map_err(NamespaceError::from_db_error)?;
    }
    Ok(())
}

/// Reads the value of a tag visible at `dir`, or `None` if no such tag name
/// is linked there.
pub async fn get_tag<'e, E>(exec: E, dir: InodeId, name: &str) -> Result<Option<TagValue>>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query(
        "select ti.itagid, ti.imode, ti.iuid, ti.igid, ti.isize, ti.iatime, ti.ictime, \
         ti.imtime, ti.ivalue \
         from t_tags t join t_tags_inodes ti on ti.itagid = t.itagid \
         where t.ipnfsid = $1 and t.itagname = $2",
    )
    .bind(dir.as_str())
    .bind(name)
    .fetch_optional(exec)
    .await
    .map_err(NamespaceError::from_db_error)?;

    Ok(row.map(|row| TagValue {
        tag_id: row.get("itagid"),
        mode: row.get::<i32, _>("imode") as u32,
        uid: row.get::<i32, _>("iuid") as u32,
        gid: row.get::<i32, _>("igid") as u32,
        size: row.get::<i64, _>("isize") as u64,
        atime: row.get("iatime"),
        ctime: row.get("ictime"),
        mtime: row.get("imtime"),
        value: row.get("ivalue"),
    }))
}

/// Lists every tag name visible at `dir`.
pub async fn list_tags<'e, E>(exec: E, dir: InodeId) -> Result<Vec<String>>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query("select itagname from t_tags where ipnfsid = $1 order by itagname")
        .bind(dir.as_str())
        .fetch_all(exec)
        .await
        .map_err(NamespaceError::from_db_error)?;
    Ok(rows.into_iter().map(|r| r.get("itagname")).collect())
}

/// `setTag`: writes `value` to the tag `name` on `dir`, creating it (as an
/// origin tag) if absent. If the tag is linked at `dir` as inherited
/// (`isorign = 0`), this forks a private, origin copy for `dir` rather than
/// mutating the shared blob, even if `dir` is the only directory left
/// pointing at it — the copy-on-write step described in spec §4.1.
pub async fn set_tag<'e, E>(
    exec: E,
    dir: InodeId,
    name: &str,
    uid: u32,
    gid: u32,
    mode: u32,
    value: &[u8],
) -> Result<()>
where
    E: PgExecutor<'e> + Clone,
{
    let now = OffsetDateTime::now_utc();
    let existing = sqlx::query(
        "select itagid, isorign from t_tags where ipnfsid = $1 and itagname = $2",
    )
    .bind(dir.as_str())
    .bind(name)
    .fetch_optional(exec.clone())
    .await
    .map_err(NamespaceError::from_db_error)?;

    let existing_tag_id: Option<String> = existing.as_ref().map(|r| r.get("itagid"));
    let owned = existing
        .as_ref()
        .map(|r| r.get::<i16, _>("isorign") != 0)
        .unwrap_or(false);

    if let Some(tag_id) = existing_tag_id.filter(|_| owned) {
        sqlx::query(
            "update t_tags_inodes set ivalue = $1, isize = $2, imtime = $3, ictime = $3 \
             where itagid = $4",
        )
        .bind(value)
        .bind(value.len() as i64)
        .bind(now)
        .bind(&tag_id)
        .execute(exec)
        .await
        .map_err(NamespaceError::from_db_error)?;
        return Ok(());
    }

    let new_tag_id = InodeId::generate().as_str().to_string();
    sqlx::query(
        "insert into t_tags_inodes \
         (itagid, imode, inlink, iuid, igid, isize, iatime, ictime, imtime, ivalue) \
         values ($1, $2, 1, $3, $4, $5, $6, $6, $6, $7)",
    )
    .bind(&new_tag_id)
    .bind(mode as i32)
    .bind(uid as i32)
    .bind(gid as i32)
    .bind(value.len() as i64)
    .bind(now)
    .bind(value)
    .execute(exec.clone())
    .await
    .map_err(NamespaceError::from_db_error)?;

    sqlx::query(
        "insert into t_tags (ipnfsid, itagname, itagid, isorign) values ($1, $2, $3, 1) \
         on conflict (ipnfsid, itagname) do update set itagid = excluded.itagid, isorign = 1",
    )
    .bind(dir.as_str())
    .bind(name)
    .bind(&new_tag_id)
    .execute(exec.clone())
    .await
    .map_err(NamespaceError::from_db_error)?;

    if let Some(old_tag_id) = existing_tag_id {
        sweep_tag(exec, &old_tag_id).await?;
    }

    Ok(())
}

/// Unlinks the tag `name` from `dir` and sweeps the backing
/// `t_tags_inodes` row if no directory references it any more.
pub async fn remove_tag<'e, E>(exec: E, dir: InodeId, name: &str) -> Result<()>
where
    E: PgExecutor<'e> + Clone,
{
    let row = sqlx::query("select itagid from t_tags where ipnfsid = $1 and itagname = $2")
        .bind(dir.as_str())
        .bind(name)
        .fetch_optional(exec.clone())
        .await
        .map_err(NamespaceError::from_db_error)?;

    let tag_id: String = match row {
        Some(row) => row.get("itagid"),
        None => return Err(NamespaceError::NotFound),
    };

    sqlx::query("delete from t_tags where ipnfsid = $1 and itagname = $2")
        .bind(dir.as_str())
        .bind(name)
        .execute(exec.clone())
        .await
        .map_err(NamespaceError::from_db_error)?;

    sweep_tag(exec, &tag_id).await
}

/// Removes every tag link owned by `inode` (called when `inode` itself is
/// removed — directories carry their own `t_tags` rows).
pub async fn remove_all_tags<'e, E>(exec: E, inode: InodeId) -> Result<()>
where
    E: PgExecutor<'e> + Clone,
{
    let tag_ids: Vec<String> = sqlx::query("select itagid from t_tags where ipnfsid = $1")
        .bind(inode.as_str())
        .fetch_all(exec.clone())
        .await
        .map_err(NamespaceError::from_db_error)?
        .into_iter()
        .map(|r| r.get("itagid"))
        .collect();

    sqlx::query("delete from t_tags where ipnfsid = $1")
        .bind(inode.as_str())
        .execute(exec.clone())
        .await
        .map_err(NamespaceError::from_db_error)?;

    for tag_id in tag_ids {
        sweep_tag(exec.clone(), &tag_id).await?;
    }
    Ok(())
}

async fn sweep_tag<'e, E>(exec: E, tag_id: &str) -> Result<()>
where
    E: PgExecutor<'e> + Clone,
{
    let remaining: i64 = sqlx::query("select count(*) as n from t_tags where itagid = $1")
        .bind(tag_id)
        .fetch_one(exec.clone())
        .await
        .map_err(NamespaceError::from_db_error)?
        .get("n");

    if remaining == 0 {
        sqlx::query("delete from t_tags_inodes where itagid = $1")
            .bind(tag_id)
            .execute(exec)
            .await
            .map_err(NamespaceError::from_db_error)?;
    }
    Ok(())
}
