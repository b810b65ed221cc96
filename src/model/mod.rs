//! Core data model types: flags, messages, addresses and MIME part trees.

pub mod address;
pub mod flags;
pub mod message;
pub mod mime;
