//! One-line part summaries, human-readable sizes and the structure view.

use std::fmt::Write;

use crate::model::mime::{MimePart, MimeTree};

/// Size with a one-decimal binary unit once it passes a tenth of that unit.
///
/// `2048` is `"2.0K"`, `100` stays `"100"`.
pub fn human_size(size: u64) -> String {
    const K: u64 = 1024;
    const M: u64 = 1024 * K;
    const G: u64 = 1024 * M;
    const T: u64 = 1024 * G;
    let fs = size as f64;
    match size {
        s if s > T / 10 => format!("{:.1}T", fs / T as f64),
        s if s > G / 10 => format!("{:.1}G", fs / G as f64),
        s if s > M / 10 => format!("{:.1}M", fs / M as f64),
        s if s > K / 10 => format!("{:.1}K", fs / K as f64),
        s => s.to_string(),
    }
}

/// Placeholder shown instead of a part's content, e.g.
/// `"\n[-- image/png - logo.png - (2.0K) --]\n"`.
pub fn part_summary(part: &MimePart) -> String {
    let name = part
        .name
        .as_deref()
        .map(|n| format!("- {n} "))
        .unwrap_or_default();
    format!(
        "\n[-- {} {name}- ({}) --]\n",
        part.media_type,
        human_size(part.body_len() as u64)
    )
}

/// One line per part in document order, indented with one `-` per nesting level.
pub fn render_structure(tree: &MimeTree) -> String {
    let mut out = String::new();
    for (id, depth) in tree.depth_first() {
        let _ = writeln!(out, "{}{}", "-".repeat(depth), tree.get(id).media_type);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::mime::{ContentDisposition, MediaType};
    use crate::parser::tree::parse_mime_tree;

    #[test]
    fn test_human_size_thresholds() {
        assert_eq!(human_size(0), "0");
        assert_eq!(human_size(102), "102");
        assert_eq!(human_size(103), "0.1K");
        assert_eq!(human_size(2048), "2.0K");
        assert_eq!(human_size(5 * 1024 * 1024), "5.0M");
        assert_eq!(human_size(3 * 1024 * 1024 * 1024), "3.0G");
    }

    #[test]
    fn test_part_summary_with_and_without_name() {
        let mut part = MimePart::new(MediaType::Other("image/png".into()), ContentDisposition::Attachment);
        part.body = Some(vec![0; 2048]);
        assert_eq!(part_summary(&part), "\n[-- image/png - (2.0K) --]\n");
        part.name = Some("logo.png".into());
        assert_eq!(part_summary(&part), "\n[-- image/png - logo.png - (2.0K) --]\n");
    }

    #[test]
    fn test_structure_prints_each_part_once() {
        let raw = b"Content-Type: multipart/mixed; boundary=o\r\n\r\n\
--o\r\nContent-Type: multipart/alternative; boundary=i\r\n\r\n\
--i\r\nContent-Type: text/plain\r\n\r\na\r\n\
--i\r\nContent-Type: text/html\r\n\r\nb\r\n--i--\r\n\
--o\r\nContent-Type: image/png\r\n\r\nx\r\n\
--o\r\nContent-Type: text/plain\r\n\r\ny\r\n--o--\r\n";
        let tree = parse_mime_tree(raw, 10).unwrap();
        assert_eq!(
            render_structure(&tree),
            "multipart/mixed\n-multipart/alternative\n--text/plain\n--text/html\n-image/png\n-text/plain\n"
        );
    }
}
