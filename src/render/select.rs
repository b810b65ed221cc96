//! Choose which parts of a MIME tree become the text a reader sees.

use crate::model::mime::{ContentDisposition, MediaType, MimePart, MimeTree, PartId};
use crate::parser::encoding;
use crate::render::html::HtmlToText;
use crate::render::summary::part_summary;

/// One displayable chunk of a message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    /// Decoded text of an inline part, UTF-8 with LF line endings.
    Text(Vec<u8>),
    /// Placeholder line for a part that is not shown inline.
    Summary(String),
}

impl Rendered {
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Text(bytes) => bytes,
            Self::Summary(line) => line.into_bytes(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(bytes) => bytes,
            Self::Summary(line) => line.as_bytes(),
        }
    }
}

/// Select the visible content of `tree`, in document order.
///
/// Mixed, related, parallel and digest containers show all their children.
/// An alternative shows one child: the last `text/plain`, else the last
/// `text/html`, else its last child. Attachments and non-text parts
/// become summary lines.
pub fn select_content(tree: &MimeTree, html: &dyn HtmlToText) -> Vec<Rendered> {
    let mut out = Vec::new();
    select_chain(tree, tree.root(), html, &mut out);
    out
}

fn select_chain(tree: &MimeTree, first: PartId, html: &dyn HtmlToText, out: &mut Vec<Rendered>) {
    for (id, part) in tree.siblings_from(first) {
        select_part(tree, id, part, html, out);
    }
}

fn select_part(
    tree: &MimeTree,
    id: PartId,
    part: &MimePart,
    html: &dyn HtmlToText,
    out: &mut Vec<Rendered>,
) {
    if part.media_type.is_multipart() {
        let Some(child) = part.child else {
            return;
        };
        // Digest parts default to message/rfc822, which is not handled; read as mixed.
        if part.media_type == MediaType::MultipartAlternative {
            select_alternative(tree, id, html, out);
        } else {
            select_chain(tree, child, html, out);
        }
        return;
    }
    out.push(render_leaf(part, html));
}

fn select_alternative(tree: &MimeTree, id: PartId, html: &dyn HtmlToText, out: &mut Vec<Rendered>) {
    let mut plain = None;
    let mut rich = None;
    let mut last = None;
    for (child_id, child) in tree.children(id) {
        match child.media_type {
            MediaType::TextPlain => plain = Some(child),
            MediaType::TextHtml => rich = Some(child),
            _ => {}
        }
        last = Some((child_id, child));
    }

    match (plain, rich, last) {
        (Some(part), _, _) | (None, Some(part), _) => out.push(render_leaf(part, html)),
        (None, None, Some((last_id, part))) if part.media_type.is_multipart() => {
            select_part(tree, last_id, part, html, out)
        }
        (None, None, Some((_, part))) => out.push(Rendered::Summary(part_summary(part))),
        (None, None, None) => {}
    }
}

fn render_leaf(part: &MimePart, html: &dyn HtmlToText) -> Rendered {
    if part.disposition != ContentDisposition::Inline {
        return Rendered::Summary(part_summary(part));
    }
    let body = part.body.as_deref().unwrap_or_default();
    match part.media_type {
        MediaType::TextPlain => Rendered::Text(inline_text(body, part.charset.as_deref())),
        MediaType::TextHtml => {
            let utf8 = encoding::to_utf8(body, part.charset.as_deref());
            let text = html.to_text(&String::from_utf8_lossy(&utf8));
            let mut bytes = text.into_bytes();
            if !bytes.ends_with(b"\n") {
                bytes.push(b'\n');
            }
            Rendered::Text(bytes)
        }
        _ => Rendered::Summary(part_summary(part)),
    }
}

/// Charset conversion plus CRLF to LF.
fn inline_text(body: &[u8], charset: Option<&str>) -> Vec<u8> {
    let utf8 = encoding::to_utf8(body, charset);
    let mut out = Vec::with_capacity(utf8.len());
    let mut bytes = utf8.iter().peekable();
    while let Some(&b) = bytes.next() {
        if b == b'\r' && bytes.peek() == Some(&&b'\n') {
            continue;
        }
        out.push(b);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::tree::parse_mime_tree;
    use std::cell::Cell;

    struct Counting {
        calls: Cell<usize>,
    }

    impl HtmlToText for Counting {
        fn to_text(&self, html: &str) -> String {
            self.calls.set(self.calls.get() + 1);
            format!("reduced:{html}")
        }
    }

    fn counting() -> Counting {
        Counting { calls: Cell::new(0) }
    }

    fn select(raw: &[u8], html: &dyn HtmlToText) -> Vec<Rendered> {
        select_content(&parse_mime_tree(raw, 10).unwrap(), html)
    }

    #[test]
    fn test_alternative_prefers_plain() {
        let raw = b"Content-Type: multipart/alternative; boundary=b\r\n\r\n\
--b\r\nContent-Type: text/plain\r\n\r\nplain body\r\n\
--b\r\nContent-Type: text/html\r\n\r\n<p>html</p>\r\n--b--\r\n";
        let html = counting();
        let out = select(raw, &html);
        assert_eq!(out, vec![Rendered::Text(b"plain body".to_vec())]);
        assert_eq!(html.calls.get(), 0);
    }

    #[test]
    fn test_alternative_falls_back_to_html() {
        let raw = b"Content-Type: multipart/alternative; boundary=b\r\n\r\n\
--b\r\nContent-Type: text/html\r\n\r\n<p>one</p>\r\n\
--b\r\nContent-Type: text/html\r\n\r\n<p>two</p>\r\n--b--\r\n";
        let html = counting();
        let out = select(raw, &html);
        assert_eq!(out, vec![Rendered::Text(b"reduced:<p>two</p>\n".to_vec())]);
        assert_eq!(html.calls.get(), 1);
    }

    #[test]
    fn test_alternative_last_child_summary() {
        let raw = b"Content-Type: multipart/alternative; boundary=b\r\n\r\n\
--b\r\nContent-Type: application/pdf\r\n\r\n%PDF\r\n\
--b\r\nContent-Type: image/png\r\n\r\npng\r\n--b--\r\n";
        let out = select(raw, &counting());
        assert_eq!(out, vec![Rendered::Summary("\n[-- image/png - (3) --]\n".into())]);
    }

    #[test]
    fn test_alternative_recurses_into_multipart_last_child() {
        let raw = b"Content-Type: multipart/alternative; boundary=b\r\n\r\n\
--b\r\nContent-Type: image/gif\r\n\r\ngif\r\n\
--b\r\nContent-Type: multipart/related; boundary=r\r\n\r\n\
--r\r\nContent-Type: text/plain\r\n\r\nnested\r\n--r--\r\n--b--\r\n";
        let out = select(raw, &counting());
        assert_eq!(out, vec![Rendered::Text(b"nested".to_vec())]);
    }

    #[test]
    fn test_mixed_with_attachment() {
        let raw = b"Content-Type: multipart/mixed; boundary=m\r\n\r\n\
--m\r\nContent-Type: text/plain; charset=iso-8859-1\r\n\r\ncaf\xe9\r\nline\r\n\
--m\r\nContent-Type: text/plain\r\nContent-Disposition: attachment; filename=notes.txt\r\n\r\nsecret\r\n--m--\r\n";
        let out = select(raw, &counting());
        assert_eq!(
            out,
            vec![
                Rendered::Text("café\nline".as_bytes().to_vec()),
                Rendered::Summary("\n[-- text/plain - notes.txt - (6) --]\n".into()),
            ]
        );
    }

    #[test]
    fn test_digest_parallel_related_render_like_mixed() {
        for subtype in ["digest", "parallel", "related"] {
            let raw = format!(
                "Content-Type: multipart/{subtype}; boundary=m\r\n\r\n\
--m\r\nContent-Type: text/plain\r\n\r\none\r\n\
--m\r\nContent-Type: text/html\r\n\r\n<p>two</p>\r\n\
--m\r\nContent-Type: image/png\r\n\r\npng\r\n--m--\r\n"
            );
            let html = counting();
            let out = select(raw.as_bytes(), &html);
            assert_eq!(
                out,
                vec![
                    Rendered::Text(b"one".to_vec()),
                    Rendered::Text(b"reduced:<p>two</p>\n".to_vec()),
                    Rendered::Summary("\n[-- image/png - (3) --]\n".into()),
                ],
                "multipart/{subtype}"
            );
            assert_eq!(html.calls.get(), 1);
        }
    }

    #[test]
    fn test_empty_multipart_shows_nothing() {
        let raw = b"Content-Type: multipart/mixed; boundary=m\r\n\r\nno parts here\r\n";
        assert!(select(raw, &counting()).is_empty());
    }

    #[test]
    fn test_single_html_message_is_reduced() {
        let raw = b"Content-Type: text/html\r\n\r\n<b>hi</b>";
        let html = counting();
        let out = select(raw, &html);
        assert_eq!(out[0].as_bytes(), b"reduced:<b>hi</b>\n");
    }
}
