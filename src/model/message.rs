//! A message stored in a maildir, identified by its path.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::flags::{self, Flags};
use crate::parser::header;

/// Listing metadata read from the header block.
#[derive(Debug, Clone, Default)]
pub struct Envelope {
    pub from: String,
    pub to: String,
    pub cc: String,
    pub reply_to: String,
    pub subject: String,
    pub date: Option<DateTime<Utc>>,
    /// File size in bytes.
    pub size: u64,
}

/// One maildir message.
///
/// The path is the durable state: its `:2,` suffix records the persisted
/// flags. `envelope` is `None` until the header block has been read.
#[derive(Debug, Clone)]
pub struct Message {
    path: PathBuf,
    pub flags: Flags,
    envelope: Option<Envelope>,
}

impl Message {
    /// A message known only by path. Flags come from the filename, which costs no I/O.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let flags = file_name(&path)
            .map(Flags::from_file_name)
            .unwrap_or_default();
        Self {
            path,
            flags,
            envelope: None,
        }
    }

    /// A message with its envelope read eagerly.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let mut msg = Self::from_path(path);
        msg.envelope = Some(header::read_envelope(&msg.path)?);
        Ok(msg)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path with the info suffix removed: stable across flag changes.
    pub fn identity(&self) -> PathBuf {
        match file_name(&self.path) {
            Some(name) => self.path.with_file_name(flags::split_info(name).0),
            None => self.path.clone(),
        }
    }

    /// Envelope if already loaded.
    pub fn envelope(&self) -> Option<&Envelope> {
        self.envelope.as_ref()
    }

    /// Envelope, reading the header block on first access.
    pub fn load_envelope(&mut self) -> Result<&Envelope> {
        if self.envelope.is_none() {
            self.envelope = Some(header::read_envelope(&self.path)?);
        }
        Ok(self.envelope.get_or_insert_with(Envelope::default))
    }

    pub fn is_loaded(&self) -> bool {
        self.envelope.is_some()
    }

    /// The filename this message should have given its current flags.
    pub fn canonical_path(&self) -> PathBuf {
        let identity = self.identity();
        let unique = file_name(&identity).unwrap_or_default();
        identity.with_file_name(flags::file_name_with_flags(unique, self.flags))
    }

    pub(crate) fn set_path(&mut self, path: PathBuf) {
        self.path = path;
    }
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path_reads_flags() {
        let msg = Message::from_path("/mail/inbox/cur/1700000000.42.host:2,RS");
        assert_eq!(msg.flags, Flags::REPLIED | Flags::SEEN);
        assert!(!msg.is_loaded());
    }

    #[test]
    fn test_identity_strips_suffix() {
        let msg = Message::from_path("/mail/inbox/cur/abc.host:2,S");
        assert_eq!(msg.identity(), PathBuf::from("/mail/inbox/cur/abc.host"));
    }

    #[test]
    fn test_canonical_path_follows_flags() {
        let mut msg = Message::from_path("/m/cur/abc:2,S");
        assert_eq!(msg.canonical_path(), msg.path());
        msg.flags |= Flags::FLAGGED | Flags::TAGGED;
        assert_eq!(msg.canonical_path(), PathBuf::from("/m/cur/abc:2,SF"));
    }

    #[test]
    fn test_canonical_path_adds_missing_marker() {
        let msg = Message::from_path("/m/cur/abc");
        assert_eq!(msg.canonical_path(), PathBuf::from("/m/cur/abc:2,"));
    }
}
