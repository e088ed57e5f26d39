//! Integration tests against a disposable Postgres instance, one per test
//! (provisioned and torn down by `sqlx::test`). Exercises the driver
//! scenarios from spec.md §8.

use nsmeta_core::InodeId;
use nsmeta_db::{Dialect, NamespaceDriver};
use sqlx::PgPool;

fn driver() -> NamespaceDriver {
    NamespaceDriver::new(Dialect::default(), false)
}

async fn seed_root(pool: &PgPool) -> InodeId {
    let now = time::OffsetDateTime::now_utc();
    sqlx::query(
        "insert into t_inodes \
         (ipnfsid, itype, imode, inlink, iuid, igid, isize, iio, iatime, ictime, imtime, icrtime) \
         values ($1, 16384, 16877, 2, 0, 0, 512, false, $2, $2, $2, $2)",
    )
    .bind(InodeId::ROOT.as_str())
    .bind(now)
    .execute(pool)
    .await
    .unwrap();

    sqlx::query("insert into t_dirs (iparent, iname, ipnfsid) values ($1, '.', $1)")
        .bind(InodeId::ROOT.as_str())
        .execute(pool)
        .await
        .unwrap();
    sqlx::query("insert into t_dirs (iparent, iname, ipnfsid) values ($1, '..', $1)")
        .bind(InodeId::ROOT.as_str())
        .execute(pool)
        .await
        .unwrap();

    InodeId::ROOT
}

#[sqlx::test(migrations = "./migrations")]
async fn mkdir_then_remove_restores_initial_state(pool: PgPool) {
    let driver = driver();
    let root = seed_root(&pool).await;

    let before: i64 = sqlx::query_scalar("select count(*) from t_dirs")
        .fetch_one(&pool)
        .await
        .unwrap();

    driver.mkdir(&pool, root, "a", 0, 0, 0o755).await.unwrap();
    driver.remove_named(&pool, root, "a").await.unwrap();

    let after: i64 = sqlx::query_scalar("select count(*) from t_dirs")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(before, after);

    let root_stat = driver.stat(&pool, root, 0).await.unwrap().unwrap();
    assert_eq!(root_stat.nlink, 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn remove_nonempty_directory_fails(pool: PgPool) {
    let driver = driver();
    let root = seed_root(&pool).await;

    let a = driver.mkdir(&pool, root, "a", 0, 0, 0o755).await.unwrap();
    driver.mkdir(&pool, a, "b", 0, 0, 0o755).await.unwrap();

    let err = driver.remove_named(&pool, root, "a").await.unwrap_err();
    assert!(matches!(err, nsmeta_core::NamespaceError::DirectoryNotEmpty));
}

#[sqlx::test(migrations = "./migrations")]
async fn tag_write_forks_from_inherited_copy(pool: PgPool) {
    let driver = driver();
    let root = seed_root(&pool).await;

    let d1 = driver.mkdir(&pool, root, "d1", 0, 0, 0o755).await.unwrap();
    nsmeta_db::tags::set_tag(&pool, d1, "X", 0, 0, 0o644, b"v1")
        .await
        .unwrap();

    let d2 = driver
        .mkdir_with_tags_and_acl(&pool, d1, "d2", 0, 0, 0o755)
        .await
        .unwrap();

    let inherited = nsmeta_db::tags::get_tag(&pool, d2, "X").await.unwrap().unwrap();
    assert_eq!(inherited.value, b"v1");

    nsmeta_db::tags::set_tag(&pool, d2, "X", 0, 0, 0o644, b"v2")
        .await
        .unwrap();

    let d1_value = nsmeta_db::tags::get_tag(&pool, d1, "X").await.unwrap().unwrap();
    let d2_value = nsmeta_db::tags::get_tag(&pool, d2, "X").await.unwrap().unwrap();
    assert_eq!(d1_value.value, b"v1");
    assert_eq!(d2_value.value, b"v2");
}

#[sqlx::test(migrations = "./migrations")]
async fn symlink_is_transparently_resolved(pool: PgPool) {
    let driver = driver();
    let root = seed_root(&pool).await;

    let a = driver.mkdir(&pool, root, "a", 0, 0, 0o755).await.unwrap();
    let b = driver.mkdir(&pool, a, "b", 0, 0, 0o755).await.unwrap();
    let c = driver
        .create_file(&pool, b, "c", 0, 0, 0o644, nsmeta_core::InodeType::RegularFile)
        .await
        .unwrap();

    let link = driver
        .create_file(&pool, root, "l", 0, 0, 0o777, nsmeta_core::InodeType::SymbolicLink)
        .await
        .unwrap();
    driver.write(&pool, link, 0, b.as_str().as_bytes()).await.unwrap();

    let resolved = nsmeta_db::path2inode(&driver, &pool, root, "/l/c").await.unwrap();
    assert_eq!(resolved, c);
}
