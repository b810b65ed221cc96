//! Message list rows: index, tag mark, flag column, sender, size, subject.

use serde::Serialize;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::model::flags::Flags;
use crate::model::message::Message;
use crate::render::summary::human_size;

/// Column widths for [`format_row`].
#[derive(Debug, Clone, Copy)]
pub struct ListWidths {
    pub from: usize,
    pub subject: usize,
}

impl Default for ListWidths {
    fn default() -> Self {
        Self {
            from: 25,
            subject: 75,
        }
    }
}

/// One message as shown in a list.
#[derive(Debug, Clone, Serialize)]
pub struct ListRow {
    pub index: usize,
    pub tagged: bool,
    pub flags: String,
    pub from: String,
    pub subject: String,
    pub date: Option<String>,
    pub size: u64,
    pub path: String,
}

impl ListRow {
    /// Build a row. Messages without an envelope show empty sender and subject.
    pub fn new(index: usize, message: &Message) -> Self {
        let envelope = message.envelope();
        Self {
            index,
            tagged: message.flags.contains(Flags::TAGGED),
            flags: message.flags.column(),
            from: envelope.map(|e| e.from.clone()).unwrap_or_default(),
            subject: envelope.map(|e| e.subject.clone()).unwrap_or_default(),
            date: envelope
                .and_then(|e| e.date)
                .map(|d| d.format("%Y-%m-%d %H:%M").to_string()),
            size: envelope.map_or(0, |e| e.size),
            path: message.path().display().to_string(),
        }
    }
}

pub fn list_rows(messages: &[Message]) -> Vec<ListRow> {
    messages
        .iter()
        .enumerate()
        .map(|(i, m)| ListRow::new(i, m))
        .collect()
}

/// `"3     *N  ! Jane Doe                  [ 2.0K] Lunch?"`
pub fn format_row(row: &ListRow, widths: ListWidths) -> String {
    let mark = if row.tagged { '*' } else { ' ' };
    format!(
        "{:<6}{mark}{:<5}{} [{:>5}] {}",
        row.index,
        row.flags,
        pad_to_width(&truncate_str(&row.from, widths.from), widths.from),
        human_size(row.size),
        truncate_str(&row.subject, widths.subject),
    )
}

/// Truncate to `max_width` display columns, ending in `...` when cut.
pub fn truncate_str(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }
    if max_width <= 3 {
        return take_width(s, max_width);
    }
    let mut out = take_width(s, max_width - 3);
    out.push_str("...");
    out
}

fn take_width(s: &str, max_width: usize) -> String {
    let mut used = 0;
    s.chars()
        .take_while(|c| {
            used += c.width().unwrap_or(0);
            used <= max_width
        })
        .collect()
}

fn pad_to_width(s: &str, width: usize) -> String {
    let pad = width.saturating_sub(s.width());
    format!("{s}{}", " ".repeat(pad))
}
