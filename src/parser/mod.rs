//! Message parsing: header blocks, transfer decoding, the MIME part walker
//! and the tree builder on top of it.

pub mod encoding;
pub mod header;
pub mod tree;
pub mod walker;
