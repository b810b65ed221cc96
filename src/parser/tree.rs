//! Rebuild the MIME part tree from the walker's flat, depth-first callbacks.

use std::path::Path;

use tracing::debug;

use crate::error::{MailError, Result};
use crate::model::mime::{MediaType, MimePart, MimeTree, PartId};
use crate::parser::walker::{self, PartDescriptor};

/// Incremental tree builder fed one walker callback at a time.
///
/// Only the length of each path is inspected: equal to the previous one
/// means a sibling, longer means a first child, shorter means a sibling of
/// an ancestor.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    parts: Vec<MimePart>,
    previous: Option<(PartId, usize)>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(
        &mut self,
        path: &[usize],
        descriptor: PartDescriptor,
        body: Option<Vec<u8>>,
    ) -> Result<PartId> {
        let id = PartId(self.parts.len());
        let mut part = MimePart::new(media_type_of(&descriptor, body.is_none()), descriptor.disposition);
        part.name = descriptor.name();
        part.charset = descriptor.charset();
        part.body = body;

        match self.previous {
            None => {}
            Some((prev, prev_len)) if path.len() == prev_len => {
                part.parent = self.parts[prev.0].parent;
                part.prev = Some(prev);
                self.parts[prev.0].next = Some(id);
            }
            Some((prev, prev_len)) if path.len() > prev_len => {
                if self.parts[prev.0].body.is_some() {
                    return Err(MailError::MalformedTree(format!(
                        "part {path:?} nested under a leaf"
                    )));
                }
                part.parent = Some(prev);
                self.parts[prev.0].child = Some(id);
            }
            Some((prev, prev_len)) => {
                let mut sibling = prev;
                for _ in 0..prev_len - path.len() {
                    sibling = self.parts[sibling.0].parent.ok_or_else(|| {
                        MailError::MalformedTree(format!("part {path:?} climbs above the root"))
                    })?;
                }
                part.parent = self.parts[sibling.0].parent;
                part.prev = Some(sibling);
                self.parts[sibling.0].next = Some(id);
            }
        }

        if self.previous.is_some() && part.parent.is_none() {
            return Err(MailError::MalformedTree(format!(
                "part {path:?} has no parent"
            )));
        }
        self.parts.push(part);
        self.previous = Some((id, path.len()));
        Ok(id)
    }

    pub fn finish(self) -> Result<MimeTree> {
        if self.parts.is_empty() {
            return Err(MailError::MalformedTree("message has no parts".into()));
        }
        Ok(MimeTree { parts: self.parts })
    }
}

/// Containers always carry a multipart tag: an unrecognised `multipart/*`
/// subtype that was split on its boundary is read as `multipart/mixed`.
fn media_type_of(descriptor: &PartDescriptor, is_container: bool) -> MediaType {
    let media_type = MediaType::from_mime(&descriptor.media_type);
    if is_container && !media_type.is_multipart() {
        debug!(media_type = %media_type, "Treating unknown multipart subtype as mixed");
        return MediaType::MultipartMixed;
    }
    media_type
}

/// Parse a complete message into its part tree.
pub fn parse_mime_tree(raw: &[u8], max_depth: usize) -> Result<MimeTree> {
    let mut builder = TreeBuilder::new();
    walker::walk_parts(raw, max_depth, &mut |path, descriptor, body| {
        builder.push(path, descriptor, body).map(|_| ())
    })?;
    builder.finish()
}

/// Read and parse the message stored at `path`.
pub fn parse_mime_tree_file(path: &Path, max_depth: usize) -> Result<MimeTree> {
    let raw = std::fs::read(path).map_err(|e| MailError::io(path, e))?;
    let tree = parse_mime_tree(&raw, max_depth)?;
    debug!(path = %path.display(), parts = tree.len(), "Parsed MIME tree");
    Ok(tree)
}
