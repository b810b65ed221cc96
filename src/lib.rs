//! `maildirshell`: the core of a terminal reader for Maildir mailboxes.
//!
//! This crate provides the pieces a mail client is built on: a depth-limited
//! MIME part walker and tree builder, content selection that turns a part
//! tree into readable text, and a Maildir store that keeps message state in
//! filenames and watches for new mail.

pub mod compose;
pub mod config;
pub mod error;
pub mod model;
pub mod parser;
pub mod render;
pub mod status;
pub mod store;
