//! Path resolution built on top of [`NamespaceDriver`] (spec §4.1 "Path
//! lookup").
//!
//! `path2inode`/`path2inodes` walk a `/`-separated path component by
//! component, starting at a caller-supplied root. A symlink encountered
//! along the way is dereferenced before its inode is used as a directory (or
//! returned as the final answer): its level-0 data holds the raw target
//! text, an absolute target (`/...`) restarts resolution from the
//! well-known root, and a relative target continues from the directory that
//! held the symlink.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use sqlx::PgExecutor;

use nsmeta_core::{InodeId, InodeType, NamespaceError, Result};

use crate::driver::NamespaceDriver;

/// Hops a single path resolution may dereference before giving up (Design
/// Note §9(b): "any reimplementation should impose one (e.g., 40 hops) and
/// fail with *too many links* when exceeded").
pub const MAX_SYMLINK_HOPS: u32 = 40;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Result of a full path resolution: every inode traversed, root first, and
/// the terminal inode (spec §4.1: "`path2inodes` returns the full sequence
/// including intermediate inodes and every symlink's root anchor").
pub struct ResolvedPath {
    pub chain: Vec<InodeId>,
    pub last: InodeId,
}

pub async fn path2inode<'e, E>(
    driver: &NamespaceDriver,
    exec: E,
    root: InodeId,
    path: &str,
) -> Result<InodeId>
where
    E: PgExecutor<'e> + Clone + Send + 'e,
{
    Ok(path2inodes(driver, exec, root, path).await?.last)
}

pub async fn path2inodes<'e, E>(
    driver: &NamespaceDriver,
    exec: E,
    root: InodeId,
    path: &str,
) -> Result<ResolvedPath>
where
    E: PgExecutor<'e> + Clone + Send + 'e,
{
    let hops = Arc::new(AtomicU32::new(0));
    let chain = walk(driver, exec, root, root, path.to_string(), hops).await?;
    let last = *chain.last().expect("walk always returns at least the start inode");
    Ok(ResolvedPath { chain, last })
}

/// Walks `path`'s components starting at directory `start`, dereferencing
/// symlinks (relative to the directory each was found in) at every hop,
/// including the last. Boxed because it mutually recurses with
/// [`dereference`] through arbitrarily long symlink chains. `hops` is an
/// `Arc` rather than a borrow so the recursion's lifetime doesn't have to
/// unify with `E`'s.
fn walk<'e, E>(
    driver: &'e NamespaceDriver,
    exec: E,
    root: InodeId,
    start: InodeId,
    path: String,
    hops: Arc<AtomicU32>,
) -> BoxFuture<'e, Vec<InodeId>>
where
    E: PgExecutor<'e> + Clone + Send + 'e,
{
    Box::pin(async move {
        let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
        let last_idx = components.len().checked_sub(1);

        let mut chain = vec![start];
        let mut dir = start;

        for (i, component) in components.into_iter().enumerate() {
            let child = driver
                .lookup_child(exec.clone(), dir, component)
                .await?
                .ok_or(NamespaceError::NotFound)?;

            let resolved =
                dereference(driver, exec.clone(), root, dir, child, hops.clone()).await?;
            chain.push(resolved);

            if Some(i) != last_idx {
                let stat = driver
                    .stat(exec.clone(), resolved, 0)
                    .await?
                    .ok_or(NamespaceError::NotFound)?;
                if InodeType::from_mode(stat.mode) != Some(InodeType::Directory) {
                    return Err(NamespaceError::NotADirectory);
                }
            }

            dir = resolved;
        }

        Ok(chain)
    })
}

/// Dereferences `inode` while it is a symlink. `anchor` is the directory the
/// symlink's name was looked up in, used to resolve a relative target; an
/// absolute target restarts from `root`.
fn dereference<'e, E>(
    driver: &'e NamespaceDriver,
    exec: E,
    root: InodeId,
    anchor: InodeId,
    inode: InodeId,
    hops: Arc<AtomicU32>,
) -> BoxFuture<'e, InodeId>
where
    E: PgExecutor<'e> + Clone + Send + 'e,
{
    Box::pin(async move {
        let stat = driver
            .stat(exec.clone(), inode, 0)
            .await?
            .ok_or(NamespaceError::NotFound)?;

        if InodeType::from_mode(stat.mode) != Some(InodeType::SymbolicLink) {
            return Ok(inode);
        }

        if hops.fetch_add(1, Ordering::Relaxed) + 1 > MAX_SYMLINK_HOPS {
            return Err(NamespaceError::TooManyLinks);
        }

        let raw = driver.read(exec.clone(), inode, 0, 0, stat.size as usize).await?;
        let target = String::from_utf8(raw)
            .map_err(|_| NamespaceError::InvariantViolation("symlink target is not UTF-8".into()))?;
        let target = target.trim().to_string();

        let chain = if let Some(rest) = target.strip_prefix('/') {
            walk(driver, exec.clone(), root, root, rest.to_string(), hops).await?
        } else {
            walk(driver, exec.clone(), root, anchor, target, hops).await?
        };

        Ok(*chain.last().expect("walk always returns at least the start inode"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hop_limit_is_generous_but_finite() {
        assert!(MAX_SYMLINK_HOPS > 1);
        assert!(MAX_SYMLINK_HOPS < 1000);
    }
}
