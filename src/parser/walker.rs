//! Depth-first, depth-limited walk over the MIME parts of a message.
//!
//! The walker never builds anything itself: it hands every part to a visitor
//! together with its sibling-index path, its resolved content headers and,
//! for leaves, the transfer-decoded body. Containers are reported before
//! their children, so the visitor sees parts in document order.
//!
//! Structure and content headers come from `mail-parser`. Leaf bodies are
//! cut from the raw message at the part offsets and decoded here, so the
//! quoted-printable fallback stays under our control.

use std::collections::HashMap;

use mail_parser::{ContentType, MessageParser, MessagePart, MimeHeaders, PartType};
use tracing::trace;

use crate::error::{MailError, Result};
use crate::model::mime::ContentDisposition;
use crate::parser::encoding::{decode_body, TransferEncoding};
use crate::parser::header;

/// Nesting levels walked when the caller has no opinion.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Content headers of one part, as resolved by the walker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartDescriptor {
    /// Lowercase `type/subtype`. `text/plain` when Content-Type is absent or malformed.
    pub media_type: String,
    /// Content-Type parameters, keys lowercase.
    pub params: HashMap<String, String>,
    pub disposition: ContentDisposition,
    /// Content-Disposition parameters, keys lowercase.
    pub disposition_params: HashMap<String, String>,
}

impl Default for PartDescriptor {
    fn default() -> Self {
        Self {
            media_type: "text/plain".to_string(),
            params: HashMap::new(),
            disposition: ContentDisposition::Inline,
            disposition_params: HashMap::new(),
        }
    }
}

impl PartDescriptor {
    /// Resolve the Content-Type and Content-Disposition of a parsed part.
    pub fn from_part(part: &MessagePart<'_>) -> Self {
        let mut descriptor = Self::default();
        if let Some(media_type) = part.content_type().and_then(media_type_of) {
            descriptor.media_type = media_type;
            descriptor.params = part.content_type().map(params_of).unwrap_or_default();
        }
        if let Some(disposition) = part.content_disposition() {
            descriptor.disposition = ContentDisposition::from_token(disposition.ctype());
            descriptor.disposition_params = params_of(disposition);
        }
        descriptor
    }

    /// Display name: disposition `filename`, else Content-Type `name`.
    pub fn name(&self) -> Option<String> {
        self.disposition_params
            .get("filename")
            .or_else(|| self.params.get("name"))
            .map(|n| header::decode_encoded_words(n.trim()))
            .filter(|n| !n.is_empty())
    }

    pub fn charset(&self) -> Option<String> {
        self.params.get("charset").map(|c| c.trim().to_ascii_lowercase())
    }
}

/// `type/subtype`, lowercased. `None` when either token is malformed.
fn media_type_of(ct: &ContentType<'_>) -> Option<String> {
    let main = ct.ctype().trim().to_ascii_lowercase();
    let media_type = match ct.subtype() {
        Some(sub) => format!("{main}/{}", sub.trim().to_ascii_lowercase()),
        None => main,
    };
    let is_token = |s: &str| {
        !s.is_empty()
            && s.bytes()
                .all(|b| b.is_ascii_graphic() && !b"()<>@,;:\\\"/[]?=".contains(&b))
    };
    let valid = match media_type.split_once('/') {
        Some((main, sub)) => is_token(main) && is_token(sub),
        None => is_token(&media_type),
    };
    valid.then_some(media_type)
}

fn params_of(ct: &ContentType<'_>) -> HashMap<String, String> {
    ct.attributes()
        .unwrap_or_default()
        .iter()
        .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
        .collect()
}

/// Walk `raw`, a complete RFC 822 message, calling `visit` once per part.
///
/// `visit` receives the part's path (`[]` for the root, `[1, 0]` for the
/// first child of the second top-level part), its descriptor and, for
/// leaves only, the decoded body. Parts nested deeper than `max_depth`
/// levels are silently skipped. The first error from decoding or from
/// `visit` ends the walk.
pub fn walk_parts<F>(raw: &[u8], max_depth: usize, visit: &mut F) -> Result<()>
where
    F: FnMut(&[usize], PartDescriptor, Option<Vec<u8>>) -> Result<()>,
{
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Err(MailError::Header("message is empty".into()));
    }
    let raw = header::strip_bom(raw);
    let mut path = Vec::new();

    let Some(message) = MessageParser::default().parse(raw) else {
        // No header block at all: the whole input is one plain-text body.
        if max_depth == 0 {
            return Ok(());
        }
        trace!("Message has no headers, reading it as text");
        return visit(&path, PartDescriptor::default(), Some(raw.to_vec()));
    };

    walk_part(raw, &message.parts, 0, &mut path, max_depth, visit)
}

fn walk_part<F>(
    raw: &[u8],
    parts: &[MessagePart<'_>],
    id: usize,
    path: &mut Vec<usize>,
    depth: usize,
    visit: &mut F,
) -> Result<()>
where
    F: FnMut(&[usize], PartDescriptor, Option<Vec<u8>>) -> Result<()>,
{
    if depth == 0 {
        trace!(path = ?path, "Depth limit reached, skipping part");
        return Ok(());
    }
    let Some(part) = parts.get(id) else {
        trace!(id, "Part id out of range");
        return Ok(());
    };

    let descriptor = PartDescriptor::from_part(part);
    if let PartType::Multipart(children) = &part.body {
        visit(path, descriptor, None)?;
        for (index, &child) in children.iter().enumerate() {
            path.push(index);
            let result = walk_part(raw, parts, child, path, depth - 1, visit);
            path.pop();
            result?;
        }
        return Ok(());
    }

    let body = raw
        .get(part.offset_body..part.offset_end)
        .unwrap_or_default();
    let encoding = TransferEncoding::from_header(part.content_transfer_encoding());
    let decoded = decode_body(body, encoding)?;
    visit(path, descriptor, Some(decoded))
}
