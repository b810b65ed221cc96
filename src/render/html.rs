//! HTML to plain-text reduction for `text/html` parts.
//!
//! The content selector only depends on the [`HtmlToText`] trait, so a
//! caller with a real HTML renderer can plug it in. [`PlainHtml`] is a small
//! tag-stripping reducer good enough for typical newsletters and replies.

use unicode_width::UnicodeWidthStr;

/// Turns an HTML document into readable text.
pub trait HtmlToText {
    fn to_text(&self, html: &str) -> String;
}

/// Tag-stripping reducer that wraps paragraphs to `width` columns.
#[derive(Debug, Clone, Copy)]
pub struct PlainHtml {
    pub width: usize,
}

impl Default for PlainHtml {
    fn default() -> Self {
        Self { width: 80 }
    }
}

impl HtmlToText for PlainHtml {
    fn to_text(&self, html: &str) -> String {
        let flat = strip_tags(html);
        let mut out = String::with_capacity(flat.len());
        let mut blank = true;
        for line in flat.lines() {
            let line = collapse_spaces(line);
            if line.is_empty() {
                if !blank {
                    out.push('\n');
                    blank = true;
                }
                continue;
            }
            for wrapped in wrap(&line, self.width) {
                out.push_str(&wrapped);
                out.push('\n');
            }
            blank = false;
        }
        out.trim_end().to_string()
    }
}

const BLOCK_TAGS: [&str; 14] = [
    "p", "div", "tr", "table", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "blockquote", "pre",
];

/// One pass over the markup: drop tags, turn block boundaries into line
/// breaks, keep link targets and decode entities.
fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    let mut skip_until: Option<&'static str> = None;
    let mut pending_href: Option<String> = None;

    while let Some(open) = rest.find('<') {
        if skip_until.is_none() {
            out.push_str(&decode_entities(&rest[..open]));
        }
        let Some(close) = rest[open..].find('>') else {
            rest = "";
            break;
        };
        let tag = &rest[open + 1..open + close];
        rest = &rest[open + close + 1..];

        let (closing, name) = match tag.strip_prefix('/') {
            Some(t) => (true, tag_name(t)),
            None => (false, tag_name(tag)),
        };
        if let Some(end) = skip_until {
            if closing && name == end {
                skip_until = None;
            }
            continue;
        }
        match name.as_str() {
            "script" if !closing => skip_until = Some("script"),
            "style" if !closing => skip_until = Some("style"),
            "head" if !closing => skip_until = Some("head"),
            "br" => out.push('\n'),
            "li" if !closing => out.push_str("\n- "),
            "a" if !closing => pending_href = attribute(tag, "href"),
            "a" => {
                if let Some(href) = pending_href.take() {
                    if !href.starts_with('#') && !href.starts_with("mailto:") {
                        out.push_str(" [");
                        out.push_str(&href);
                        out.push(']');
                    }
                }
            }
            n if BLOCK_TAGS.contains(&n) => out.push('\n'),
            _ => {}
        }
    }
    if skip_until.is_none() {
        out.push_str(&decode_entities(rest));
    }
    out
}

fn tag_name(tag: &str) -> String {
    tag.trim_start()
        .split(|c: char| c.is_whitespace() || c == '/')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

fn attribute(tag: &str, name: &str) -> Option<String> {
    let lower = tag.to_ascii_lowercase();
    let start = lower.find(&format!("{name}="))? + name.len() + 1;
    let value = &tag[start..];
    let value = match value.chars().next()? {
        q @ ('"' | '\'') => value[1..].split(q).next()?,
        _ => value.split(|c: char| c.is_whitespace() || c == '>').next()?,
    };
    Some(decode_entities(value))
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| entity(&rest[1..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn entity(name: &str) -> Option<char> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse().ok()?,
        };
        return char::from_u32(code);
    }
    Some(match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        "copy" => '©',
        "hellip" => '…',
        "mdash" => '—',
        "ndash" => '–',
        _ => return None,
    })
}

fn collapse_spaces(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Greedy word wrap on display width. Words wider than `width` get a line of their own.
fn wrap(line: &str, width: usize) -> Vec<String> {
    if width == 0 || line.width() <= width {
        return vec![line.to_string()];
    }
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in line.split(' ') {
        if !current.is_empty() && current.width() + 1 + word.width() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(html: &str) -> String {
        PlainHtml::default().to_text(html)
    }

    #[test]
    fn test_paragraphs() {
        let out = text("<p>Hello <b>world</b></p><P>Second paragraph</P>");
        assert_eq!(out, "Hello world\n\nSecond paragraph");
    }

    #[test]
    fn test_entities() {
        assert_eq!(text("Tom &amp; Jerry &lt;3&gt; &#233;&#x41; &bogus; a&b"), "Tom & Jerry <3> éA &bogus; a&b");
    }

    #[test]
    fn test_scripts_and_styles_dropped() {
        let out = text("<style>p{}</style>Before<script>alert('x')</script>After");
        assert_eq!(out, "BeforeAfter");
    }

    #[test]
    fn test_links_and_lists() {
        let out = text("<ul><li>one</li><li><a href=\"https://x.org\">two</a></li></ul>");
        assert_eq!(out, "- one\n- two [https://x.org]");
    }

    #[test]
    fn test_wraps_to_width() {
        let out = PlainHtml { width: 10 }.to_text("<p>aaaa bbbb cccc dddd</p>");
        assert_eq!(out, "aaaa bbbb\ncccc dddd");
    }

    #[test]
    fn test_blank_lines_collapsed() {
        assert_eq!(text("a<br><br><br><br>b"), "a\n\nb");
    }
}
