//! Directory tags: named, copy-on-write extended attributes.

use time::OffsetDateTime;

/// A tag's value payload and the metadata carried alongside it in
/// `t_tags_inodes` (mode/uid/gid/times mirror a miniature inode, since a tag
/// value is itself GC'd like one).
#[derive(Debug, Clone, PartialEq)]
pub struct TagValue {
    pub tag_id: String,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    pub atime: OffsetDateTime,
    pub ctime: OffsetDateTime,
    pub mtime: OffsetDateTime,
    pub value: Vec<u8>,
}

/// A single `t_tags` row: the (directory, name) -> tag-id mapping, with the
/// origin flag that distinguishes "this directory set the tag" from "this
/// directory inherited it by structural sharing."
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagLink<'a> {
    pub name: &'a str,
    pub is_origin: bool,
}
