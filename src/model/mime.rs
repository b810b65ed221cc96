//! MIME part tree: media types, dispositions and an index-linked arena of parts.

use std::fmt;

/// Media type of a part, with the multipart flavours the reader distinguishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaType {
    TextPlain,
    TextHtml,
    MultipartMixed,
    MultipartAlternative,
    MultipartDigest,
    MultipartParallel,
    MultipartRelated,
    /// Any other type, kept lowercase as it appeared (e.g. `"image/png"`).
    Other(String),
}

impl MediaType {
    /// Map a lowercase `type/subtype` string onto a tag.
    pub fn from_mime(s: &str) -> Self {
        match s {
            "text/plain" => Self::TextPlain,
            "text/html" => Self::TextHtml,
            "multipart/mixed" => Self::MultipartMixed,
            "multipart/alternative" => Self::MultipartAlternative,
            "multipart/digest" => Self::MultipartDigest,
            "multipart/parallel" => Self::MultipartParallel,
            "multipart/related" => Self::MultipartRelated,
            other => Self::Other(other.to_string()),
        }
    }

    /// `true` for the five multipart tags. `Other("multipart/x")` is not multipart.
    pub fn is_multipart(&self) -> bool {
        matches!(
            self,
            Self::MultipartMixed
                | Self::MultipartAlternative
                | Self::MultipartDigest
                | Self::MultipartParallel
                | Self::MultipartRelated
        )
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::TextPlain => "text/plain",
            Self::TextHtml => "text/html",
            Self::MultipartMixed => "multipart/mixed",
            Self::MultipartAlternative => "multipart/alternative",
            Self::MultipartDigest => "multipart/digest",
            Self::MultipartParallel => "multipart/parallel",
            Self::MultipartRelated => "multipart/related",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a part wants to be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentDisposition {
    #[default]
    Inline,
    Attachment,
}

impl ContentDisposition {
    /// Empty or `inline` means inline; any other token means attachment.
    pub fn from_token(token: &str) -> Self {
        if token.is_empty() || token.eq_ignore_ascii_case("inline") {
            Self::Inline
        } else {
            Self::Attachment
        }
    }
}

/// Index of a part inside its [`MimeTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartId(pub(crate) usize);

impl PartId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One node of the parse tree.
///
/// Container parts (`child.is_some()`) never carry a body.
#[derive(Debug, Clone)]
pub struct MimePart {
    pub media_type: MediaType,
    pub disposition: ContentDisposition,
    /// Display name from the disposition `filename` (or type `name`) parameter.
    pub name: Option<String>,
    /// `charset` Content-Type parameter, lowercase.
    pub charset: Option<String>,
    /// Decoded body. `None` for multipart containers.
    pub body: Option<Vec<u8>>,
    pub parent: Option<PartId>,
    pub child: Option<PartId>,
    pub next: Option<PartId>,
    pub prev: Option<PartId>,
}

impl MimePart {
    pub fn new(media_type: MediaType, disposition: ContentDisposition) -> Self {
        Self {
            media_type,
            disposition,
            name: None,
            charset: None,
            body: None,
            parent: None,
            child: None,
            next: None,
            prev: None,
        }
    }

    /// Decoded body length, zero for containers.
    pub fn body_len(&self) -> usize {
        self.body.as_ref().map_or(0, Vec::len)
    }
}

/// Arena holding a whole message's parts. The first part is the root.
#[derive(Debug, Clone)]
pub struct MimeTree {
    pub(crate) parts: Vec<MimePart>,
}

impl MimeTree {
    pub fn root(&self) -> PartId {
        PartId(0)
    }

    pub fn get(&self, id: PartId) -> &MimePart {
        &self.parts[id.0]
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Direct children of `id`, following the `next` chain from its first child.
    pub fn children(&self, id: PartId) -> Siblings<'_> {
        Siblings {
            tree: self,
            cursor: self.get(id).child,
        }
    }

    /// `id` and every sibling after it.
    pub fn siblings_from(&self, id: PartId) -> Siblings<'_> {
        Siblings {
            tree: self,
            cursor: Some(id),
        }
    }

    /// Every part in depth-first document order, with its nesting depth.
    pub fn depth_first(&self) -> Vec<(PartId, usize)> {
        let mut out = Vec::with_capacity(self.parts.len());
        let mut stack = vec![(self.root(), 0usize)];
        while let Some((id, depth)) = stack.pop() {
            out.push((id, depth));
            let part = self.get(id);
            if let Some(next) = part.next {
                stack.push((next, depth));
            }
            if let Some(child) = part.child {
                stack.push((child, depth + 1));
            }
        }
        out
    }
}

/// Iterator over a `next` chain.
pub struct Siblings<'a> {
    tree: &'a MimeTree,
    cursor: Option<PartId>,
}

impl<'a> Iterator for Siblings<'a> {
    type Item = (PartId, &'a MimePart);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let part = self.tree.get(id);
        self.cursor = part.next;
        Some((id, part))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_tags() {
        assert_eq!(MediaType::from_mime("text/plain"), MediaType::TextPlain);
        assert_eq!(
            MediaType::from_mime("image/png"),
            MediaType::Other("image/png".into())
        );
        assert!(MediaType::MultipartDigest.is_multipart());
        assert!(!MediaType::TextHtml.is_multipart());
        assert!(!MediaType::Other("multipart/signed".into()).is_multipart());
    }

    #[test]
    fn test_disposition_from_token() {
        assert_eq!(ContentDisposition::from_token(""), ContentDisposition::Inline);
        assert_eq!(ContentDisposition::from_token("INLINE"), ContentDisposition::Inline);
        assert_eq!(
            ContentDisposition::from_token("attachment"),
            ContentDisposition::Attachment
        );
        assert_eq!(
            ContentDisposition::from_token("form-data"),
            ContentDisposition::Attachment
        );
    }
}
