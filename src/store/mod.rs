//! Maildir storage: scanning, flag persistence, new-mail monitoring and
//! lazily parsed message bodies.

pub mod body;
pub mod maildir;
pub mod monitor;
