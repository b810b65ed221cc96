//! Turning parsed messages into text: content selection, HTML reduction,
//! part summaries and list rows.

pub mod html;
pub mod listing;
pub mod select;
pub mod summary;
