//! Maildir store: scans `cur/`, promotes arrivals from `new/` and persists
//! flag changes by renaming message files.
//!
//! The filename is the durable state of a message. Every rename or removal
//! failure is returned to the caller; nothing on that path is logged and
//! skipped.

use std::cmp::Ordering;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{MailError, Result};
use crate::model::flags::{self, Flags};
use crate::model::message::Message;

/// How much of each message is read when it enters the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadMode {
    /// Envelope read eagerly for every message.
    Active,
    /// Paths only, enough for counts in a sidebar.
    #[default]
    Passive,
}

/// Result of [`Maildir::apply_changes`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub renamed: usize,
    pub removed: usize,
}

/// Callback receiving `(done, total)` while `cur/` is scanned.
pub type ProgressFn<'a> = &'a dyn Fn(usize, usize);

/// An opened maildir and its messages in load order.
#[derive(Debug)]
pub struct Maildir {
    path: PathBuf,
    mode: LoadMode,
    messages: Vec<Message>,
}

impl Maildir {
    /// Open the maildir at `path`: scan `cur/`, then promote `new/`.
    pub fn open(path: impl AsRef<Path>, mode: LoadMode) -> Result<Self> {
        Self::open_with_progress(path, mode, None)
    }

    pub fn open_with_progress(
        path: impl AsRef<Path>,
        mode: LoadMode,
        progress: Option<ProgressFn<'_>>,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_dir() {
            return Err(MailError::MaildirNotFound(path));
        }
        for sub in ["cur", "new"] {
            let dir = path.join(sub);
            if !dir.is_dir() {
                return Err(MailError::MissingSubdir(dir));
            }
        }

        let names = list_message_files(&path.join("cur"))?;
        let total = names.len();
        let mut messages = Vec::with_capacity(total);
        for (i, name) in names.into_iter().enumerate() {
            messages.push(load_message(path.join("cur").join(name), mode));
            if let Some(cb) = progress {
                cb(i + 1, total);
            }
        }

        let mut maildir = Self {
            path,
            mode,
            messages,
        };
        maildir.promote_new()?;
        debug!(
            path = %maildir.path.display(),
            messages = maildir.messages.len(),
            mode = ?mode,
            "Opened maildir"
        );
        Ok(maildir)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> LoadMode {
        self.mode
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn message(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    pub fn message_mut(&mut self, index: usize) -> Option<&mut Message> {
        self.messages.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Messages without the Seen flag. Works in passive mode too, since
    /// flags come from filenames.
    pub fn unread_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| !m.flags.contains(Flags::SEEN))
            .count()
    }

    /// Switch load mode. Going active reads every missing envelope; going
    /// passive keeps what was already read.
    pub fn set_mode(&mut self, mode: LoadMode) {
        if mode == LoadMode::Active {
            for msg in self.messages.iter_mut().filter(|m| !m.is_loaded()) {
                if let Err(e) = msg.load_envelope() {
                    warn!(path = %msg.path().display(), error = %e, "Cannot read message");
                }
            }
        }
        self.mode = mode;
    }

    /// Move every file in `new/` to `cur/` and append it to the message
    /// list. Returns whether anything moved.
    ///
    /// A name without an info section gets an empty `:2,` suffix; a name that
    /// already carries `:2,<flags>` keeps those flags. A file already present
    /// under the target name in `cur/` is never replaced: that is an
    /// `AlreadyExists` rename error. Stops at the first failure; files moved
    /// before it stay moved and listed.
    pub fn promote_new(&mut self) -> Result<bool> {
        let new_dir = self.path.join("new");
        let cur_dir = self.path.join("cur");
        let names = list_message_files(&new_dir)?;
        let mut moved = 0;
        for name in names {
            let (unique, _) = flags::split_info(&name);
            let target_name = flags::file_name_with_flags(unique, Flags::from_file_name(&name));
            let from = new_dir.join(&name);
            let to = cur_dir.join(target_name);
            if to.exists() {
                return Err(MailError::Rename {
                    source: io::Error::new(io::ErrorKind::AlreadyExists, "target exists in cur/"),
                    from,
                    to,
                });
            }
            fs::rename(&from, &to).map_err(|source| MailError::Rename {
                from: from.clone(),
                to: to.clone(),
                source,
            })?;
            self.messages.push(load_message(to, self.mode));
            moved += 1;
        }
        if moved > 0 {
            info!(path = %self.path.display(), count = moved, "Promoted new messages");
        }
        Ok(moved > 0)
    }

    /// Write in-memory flags back to disk.
    ///
    /// Trashed messages are deleted. Others are renamed only when their
    /// canonical name differs from the current one. The first failure
    /// aborts; the list reflects everything done before it.
    pub fn apply_changes(&mut self) -> Result<ApplySummary> {
        let mut summary = ApplySummary::default();
        let mut i = 0;
        while i < self.messages.len() {
            let msg = &mut self.messages[i];
            if msg.flags.contains(Flags::TRASHED) {
                fs::remove_file(msg.path()).map_err(|source| MailError::Remove {
                    path: msg.path().to_path_buf(),
                    source,
                })?;
                debug!(path = %msg.path().display(), "Removed trashed message");
                self.messages.remove(i);
                summary.removed += 1;
                continue;
            }
            let target = msg.canonical_path();
            if target != msg.path() {
                fs::rename(msg.path(), &target).map_err(|source| MailError::Rename {
                    from: msg.path().to_path_buf(),
                    to: target.clone(),
                    source,
                })?;
                msg.set_path(target);
                summary.renamed += 1;
            }
            i += 1;
        }
        if summary != ApplySummary::default() {
            info!(
                path = %self.path.display(),
                renamed = summary.renamed,
                removed = summary.removed,
                "Applied flag changes"
            );
        }
        Ok(summary)
    }

    // ── Flag editing ────────────────────────────────────────────

    /// Flip `flag` on message `index`. Returns the new flags, or `None` for a bad index.
    pub fn toggle(&mut self, index: usize, flag: Flags) -> Option<Flags> {
        let msg = self.messages.get_mut(index)?;
        msg.flags.toggle(flag);
        Some(msg.flags)
    }

    pub fn set_flag(&mut self, index: usize, flag: Flags, on: bool) -> Option<Flags> {
        let msg = self.messages.get_mut(index)?;
        msg.flags.set(flag, on);
        Some(msg.flags)
    }

    pub fn toggle_tagged(&mut self, index: usize) -> Option<bool> {
        self.toggle(index, Flags::TAGGED)
            .map(|f| f.contains(Flags::TAGGED))
    }

    pub fn tagged_indices(&self) -> Vec<usize> {
        self.messages
            .iter()
            .enumerate()
            .filter(|(_, m)| m.flags.contains(Flags::TAGGED))
            .map(|(i, _)| i)
            .collect()
    }

    /// Set or clear `flag` on every tagged message. Returns how many were touched.
    pub fn apply_to_tagged(&mut self, flag: Flags, on: bool) -> usize {
        let mut count = 0;
        for msg in self.messages.iter_mut().filter(|m| m.flags.contains(Flags::TAGGED)) {
            msg.flags.set(flag, on);
            count += 1;
        }
        count
    }

    pub fn clear_tags(&mut self) {
        for msg in &mut self.messages {
            msg.flags.remove(Flags::TAGGED);
        }
    }

    /// Newest first. Messages without a known date go last, in their current order.
    pub fn sort_by_date(&mut self) {
        self.messages.sort_by(|a, b| {
            let date = |m: &Message| m.envelope().and_then(|e| e.date);
            match (date(a), date(b)) {
                (Some(x), Some(y)) => y.cmp(&x),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        });
    }

    /// Total bytes on disk of all listed messages.
    pub fn disk_size(&self) -> Result<u64> {
        self.messages.iter().try_fold(0u64, |acc, m| {
            let len = fs::metadata(m.path())
                .map_err(|e| MailError::io(m.path(), e))?
                .len();
            Ok(acc + len)
        })
    }
}

/// Message files in `dir`, sorted by name. Dotfiles and subdirectories are skipped.
fn list_message_files(dir: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(dir).map_err(|e| MailError::io(dir, e))?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| MailError::io(dir, e))?;
        let file_type = entry.file_type().map_err(|e| MailError::io(entry.path(), e))?;
        if file_type.is_dir() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) if !name.starts_with('.') => names.push(name),
            Ok(_) => {}
            Err(raw) => warn!(dir = %dir.display(), name = ?raw, "Skipping non-UTF-8 file name"),
        }
    }
    names.sort();
    Ok(names)
}

/// A message that cannot be parsed is still listed, path-only.
fn load_message(path: PathBuf, mode: LoadMode) -> Message {
    match mode {
        LoadMode::Passive => Message::from_path(path),
        LoadMode::Active => Message::load(&path).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "Cannot read message, listing path only");
            Message::from_path(path)
        }),
    }
}
