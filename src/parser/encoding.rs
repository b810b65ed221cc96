//! Content-Transfer-Encoding decoding and charset conversion.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use tracing::{debug, warn};

use crate::error::{MailError, Result};

/// Base64 as found in mail: padding optional, trailing bits tolerated.
pub(crate) const MIME_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Transfer encodings a leaf body may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    Base64,
    QuotedPrintable,
    /// `7bit`, `8bit`, `binary`, absent or unknown.
    Identity,
}

impl TransferEncoding {
    pub fn from_header(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("base64") => Self::Base64,
            Some("quoted-printable") => Self::QuotedPrintable,
            _ => Self::Identity,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Base64 => "base64",
            Self::QuotedPrintable => "quoted-printable",
            Self::Identity => "identity",
        }
    }
}

/// Decode a leaf body.
///
/// A quoted-printable failure is retried exactly once as identity; any other
/// failure is returned to the caller.
pub fn decode_body(raw: &[u8], encoding: TransferEncoding) -> Result<Vec<u8>> {
    match encoding {
        TransferEncoding::Base64 => decode_base64(raw),
        TransferEncoding::Identity => Ok(raw.to_vec()),
        TransferEncoding::QuotedPrintable => match decode_quoted_printable(raw) {
            Ok(decoded) => Ok(decoded),
            Err(e) => {
                debug!(error = %e, "quoted-printable body rejected, retrying as raw bytes");
                decode_body(raw, TransferEncoding::Identity)
            }
        },
    }
}

/// Base64 with line breaks and other whitespace ignored.
pub fn decode_base64(raw: &[u8]) -> Result<Vec<u8>> {
    let compact: Vec<u8> = raw
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    MIME_BASE64
        .decode(&compact)
        .map_err(|e| MailError::Decode {
            encoding: TransferEncoding::Base64.name(),
            reason: e.to_string(),
        })
}

/// Strict RFC 2045 quoted-printable.
///
/// `=XX` escapes in either hex case and soft line breaks are accepted. Any
/// other `=` sequence, an 8-bit byte or an over-long line is an error.
/// Hard line breaks come out as CRLF.
pub fn decode_quoted_printable(raw: &[u8]) -> Result<Vec<u8>> {
    quoted_printable::decode(raw, quoted_printable::ParseMode::Strict).map_err(|e| {
        MailError::Decode {
            encoding: TransferEncoding::QuotedPrintable.name(),
            reason: e.to_string(),
        }
    })
}

/// RFC 2047 `Q` encoding: `_` is a space and malformed escapes pass through.
pub(crate) fn decode_q_word(text: &str) -> Vec<u8> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'_' => out.push(b' '),
            b'=' => {
                let hex = (
                    bytes.get(i + 1).and_then(|c| hex_value(*c)),
                    bytes.get(i + 2).and_then(|c| hex_value(*c)),
                );
                if let (Some(hi), Some(lo)) = hex {
                    out.push((hi << 4) | lo);
                    i += 3;
                    continue;
                }
                out.push(b'=');
            }
            b => out.push(b),
        }
        i += 1;
    }
    out
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'A'..=b'F' => Some(c - b'A' + 10),
        b'a'..=b'f' => Some(c - b'a' + 10),
        _ => None,
    }
}

/// Convert bytes in `charset` to UTF-8.
///
/// UTF-8, ASCII and unknown labels return the input unchanged.
pub fn to_utf8(bytes: &[u8], charset: Option<&str>) -> Vec<u8> {
    let Some(label) = charset else {
        return bytes.to_vec();
    };
    let lower = label.trim().to_ascii_lowercase();
    if matches!(lower.as_str(), "utf-8" | "utf8" | "us-ascii" | "ascii") {
        return bytes.to_vec();
    }
    match encoding_rs::Encoding::for_label(lower.as_bytes()) {
        Some(encoding) => {
            let (decoded, _, _) = encoding.decode(bytes);
            decoded.into_owned().into_bytes()
        }
        None => {
            warn!(charset = label, "Unknown charset, leaving bytes untouched");
            bytes.to_vec()
        }
    }
}

/// Decode header-ish bytes: UTF-8 when valid, otherwise Windows-1252.
pub(crate) fn lossless_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}
