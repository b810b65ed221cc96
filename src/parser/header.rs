//! RFC 5322 header blocks: unfolding, encoded-words and dates.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use base64::Engine;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use tracing::debug;

use crate::error::{MailError, Result};
use crate::model::message::Envelope;
use crate::parser::encoding::{self, MIME_BASE64};

/// Unfolded header fields in file order, names lowercased.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    fields: Vec<(String, String)>,
}

impl Headers {
    /// Parse a raw header block. Continuation lines are joined with a single
    /// space; lines that are neither a field nor a continuation are skipped.
    ///
    /// Each line is decoded on its own, so a stray 8-bit byte only affects
    /// the line it sits on.
    pub fn parse(raw: &[u8]) -> Self {
        let mut fields: Vec<(String, String)> = Vec::new();
        for raw_line in strip_bom(raw).split(|&b| b == b'\n') {
            let raw_line = raw_line.strip_suffix(b"\r").unwrap_or(raw_line);
            let text = encoding::lossless_text(raw_line);
            let line = text.as_str();
            if line.starts_with([' ', '\t']) {
                if let Some((_, value)) = fields.last_mut() {
                    value.push(' ');
                    value.push_str(line.trim());
                }
            } else if let Some((name, value)) = line.split_once(':') {
                fields.push((name.trim().to_ascii_lowercase(), value.trim().to_string()));
            }
        }
        Self { fields }
    }

    /// First value of `name` (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// First value of `name` with encoded-words decoded, or empty.
    pub fn decoded(&self, name: &str) -> String {
        self.get(name).map(decode_encoded_words).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

pub(crate) fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes)
}

/// Read the envelope of a message file, stopping at the end of its header block.
///
/// The file handle is dropped before returning on every path.
pub fn read_envelope(path: &Path) -> Result<Envelope> {
    let file = File::open(path).map_err(|e| MailError::io(path, e))?;
    let size = file
        .metadata()
        .map_err(|e| MailError::io(path, e))?
        .len();
    if size == 0 {
        return Err(MailError::Header(format!("{} is empty", path.display())));
    }

    let mut reader = BufReader::new(file);
    let mut block = Vec::with_capacity(4096);
    let mut line = Vec::with_capacity(256);
    loop {
        line.clear();
        let n = reader
            .read_until(b'\n', &mut line)
            .map_err(|e| MailError::io(path, e))?;
        if n == 0 || line == b"\n" || line == b"\r\n" {
            break;
        }
        block.extend_from_slice(&line);
    }

    let headers = Headers::parse(&block);
    debug!(path = %path.display(), fields = headers.len(), "Read envelope");
    Ok(Envelope {
        from: headers.decoded("from"),
        to: headers.decoded("to"),
        cc: headers.decoded("cc"),
        reply_to: headers.decoded("reply-to"),
        subject: headers.decoded("subject"),
        date: headers.get("date").and_then(parse_date),
        size,
    })
}

// ── Encoded words ───────────────────────────────────────────────

/// Decode RFC 2047 encoded-words in a header value.
///
/// Whitespace between two adjacent encoded-words is dropped. A malformed
/// word is kept verbatim.
pub fn decode_encoded_words(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    let mut after_word = false;
    while let Some(start) = rest.find("=?") {
        let gap = &rest[..start];
        if !(after_word && gap.trim().is_empty()) {
            out.push_str(gap);
        }
        match decode_word(&rest[start + 2..]) {
            Some((text, used)) => {
                out.push_str(&text);
                rest = &rest[start + 2 + used..];
                after_word = true;
            }
            None => {
                out.push_str("=?");
                rest = &rest[start + 2..];
                after_word = false;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Decode `charset?enc?text?=` (the leading `=?` already consumed).
/// Returns the text and the number of bytes consumed.
fn decode_word(s: &str) -> Option<(String, usize)> {
    let (charset, rest) = s.split_once('?')?;
    let (enc, rest) = rest.split_once('?')?;
    let end = rest.find("?=")?;
    let payload = &rest[..end];
    if payload.contains(char::is_whitespace) {
        return None;
    }
    let used = charset.len() + 1 + enc.len() + 1 + end + 2;
    // RFC 2231 language suffix: charset*lang
    let charset = charset.split('*').next().unwrap_or(charset);
    let bytes = match enc {
        "B" | "b" => MIME_BASE64.decode(payload).ok()?,
        "Q" | "q" => encoding::decode_q_word(payload),
        _ => return None,
    };
    let text = String::from_utf8_lossy(&encoding::to_utf8(&bytes, Some(charset))).into_owned();
    Some((text, used))
}

// ── Dates ───────────────────────────────────────────────────────

/// Parse a `Date:` value. Tries RFC 2822, RFC 3339, a handful of broken
/// real-world layouts, then `mail-parser` as a last resort.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    let no_weekday = value
        .split_once(", ")
        .filter(|(day, _)| day.len() == 3 && day.chars().all(char::is_alphabetic))
        .map_or(value, |(_, rest)| rest);
    let candidate = with_numeric_zone(no_weekday);
    const LAYOUTS: [&str; 5] = [
        "%d %b %Y %H:%M:%S %z",
        "%d %b %Y %H:%M %z",
        "%Y-%m-%d %H:%M:%S %z",
        "%d %b %Y %H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
    ];
    for layout in LAYOUTS {
        if let Ok(dt) = DateTime::parse_from_str(&candidate, layout) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(ndt) = NaiveDateTime::parse_from_str(&candidate, layout) {
            return Some(Utc.from_utc_datetime(&ndt));
        }
    }

    let fallback = mail_parser_date(value);
    if fallback.is_none() {
        debug!(date = value, "Could not parse date");
    }
    fallback
}

/// Replace a trailing zone abbreviation (and any `(comment)`) with an offset.
fn with_numeric_zone(value: &str) -> String {
    let value = match value.find(" (") {
        Some(pos) => value[..pos].trim_end(),
        None => value,
    };
    const ZONES: [(&str, &str); 10] = [
        ("UT", "+0000"),
        ("GMT", "+0000"),
        ("UTC", "+0000"),
        ("EST", "-0500"),
        ("EDT", "-0400"),
        ("CST", "-0600"),
        ("CDT", "-0500"),
        ("PST", "-0800"),
        ("PDT", "-0700"),
        ("CET", "+0100"),
    ];
    if let Some((head, zone)) = value.rsplit_once(' ') {
        if let Some((_, offset)) = ZONES.iter().find(|(name, _)| *name == zone) {
            return format!("{head} {offset}");
        }
    }
    value.to_string()
}

fn mail_parser_date(value: &str) -> Option<DateTime<Utc>> {
    let wrapped = format!("Date: {value}\n\n");
    let parsed = mail_parser::MessageParser::default().parse(wrapped.as_bytes())?;
    let rfc3339 = parsed.date()?.to_rfc3339();
    DateTime::parse_from_rfc3339(&rfc3339)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_unfold_and_lookup() {
        let headers = Headers::parse(b"Subject: a long\r\n\tsubject\r\nFROM: x@y.org\r\n");
        assert_eq!(headers.get("subject"), Some("a long subject"));
        assert_eq!(headers.get("From"), Some("x@y.org"));
        assert_eq!(headers.get("to"), None);
    }

    #[test]
    fn test_headers_decode_each_line_alone() {
        let headers = Headers::parse(b"Subject: Caf\xc3\xa9 cr\xc3\xa8me\r\nX-Legacy: na\xefve\r\nTo: a@b.c\r\n");
        assert_eq!(headers.get("subject"), Some("Café crème"));
        assert_eq!(headers.get("x-legacy"), Some("naïve"));
        assert_eq!(headers.get("to"), Some("a@b.c"));
    }

    #[test]
    fn test_decode_encoded_words() {
        assert_eq!(decode_encoded_words("=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?="), "Hola mundo");
        assert_eq!(decode_encoded_words("=?ISO-8859-1?Q?caf=E9?= noir"), "café noir");
        assert_eq!(decode_encoded_words("Re: plain"), "Re: plain");
        assert_eq!(decode_encoded_words("=?broken"), "=?broken");
    }

    #[test]
    fn test_parse_date_variants() {
        assert!(parse_date("Thu, 04 Jan 2024 10:00:00 +0000").is_some());
        assert!(parse_date("04 Jan 2024 10:00:00 EST").is_some());
        assert!(parse_date("2024-01-04T10:00:00Z").is_some());
        assert!(parse_date("Thu, 04 Jan 2024 10:00:00 +0000 (UTC)").is_some());
        assert!(parse_date("").is_none());
    }

    #[test]
    fn test_read_envelope() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("msg");
        std::fs::write(
            &path,
            "From: =?UTF-8?Q?Jos=C3=A9?= <jose@example.com>\r\nTo: a@b.c\r\nSubject: Hi\r\n\
             Date: Thu, 04 Jan 2024 10:00:00 +0000\r\n\r\nSubject: not a header\r\n",
        )
        .unwrap();
        let env = read_envelope(&path).unwrap();
        assert_eq!(env.from, "José <jose@example.com>");
        assert_eq!(env.subject, "Hi");
        assert!(env.date.is_some());
        assert_eq!(env.size, std::fs::metadata(&path).unwrap().len());
    }

    #[test]
    fn test_read_envelope_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty");
        std::fs::write(&path, "").unwrap();
        assert!(matches!(read_envelope(&path), Err(MailError::Header(_))));
    }
}
