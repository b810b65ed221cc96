//! Outgoing mail: reply recipients, RFC 822 rendering and the transport seam.
//!
//! No transport ships with the crate. Whatever delivers mail (an SMTP
//! client, a sendmail pipe) implements [`MailTransport`].

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};

use crate::config::SmtpConfig;
use crate::error::{MailError, Result};
use crate::model::address::EmailAddress;
use crate::model::message::Envelope;

/// A message being written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutgoingMail {
    pub from: EmailAddress,
    pub to: Vec<EmailAddress>,
    pub cc: Vec<EmailAddress>,
    /// Receives the message but never appears in its headers.
    pub bcc: Vec<EmailAddress>,
    pub subject: String,
    pub body: String,
}

impl OutgoingMail {
    pub fn new(from: EmailAddress) -> Self {
        Self {
            from,
            ..Self::default()
        }
    }

    /// Start a reply to `original`. With `all`, everyone on To and Cc except
    /// `me` is copied.
    pub fn reply(original: &Envelope, from: EmailAddress, me: &[String], all: bool) -> Self {
        let subject = original.subject.trim();
        let subject = if subject.get(..3).is_some_and(|p| p.eq_ignore_ascii_case("re:")) {
            subject.to_string()
        } else {
            format!("Re: {subject}")
        };
        Self {
            from,
            to: reply_to(original),
            cc: if all { reply_all_cc(original, me) } else { Vec::new() },
            bcc: Vec::new(),
            subject,
            body: String::new(),
        }
    }

    /// Every envelope recipient: To, then Cc, then Bcc.
    pub fn recipients(&self) -> Vec<&EmailAddress> {
        self.to.iter().chain(&self.cc).chain(&self.bcc).collect()
    }

    /// Fails when there is nobody to deliver to.
    pub fn check(&self) -> Result<()> {
        if self.recipients().is_empty() {
            return Err(MailError::Transport("message has no recipients".into()));
        }
        Ok(())
    }

    pub fn to_rfc822(&self) -> Vec<u8> {
        self.render_at(Utc::now())
    }

    /// Render with a fixed `Date:`. Lines end in CRLF; Bcc is omitted.
    pub fn render_at(&self, date: DateTime<Utc>) -> Vec<u8> {
        let mut out = String::with_capacity(self.body.len() + 512);
        let mut header = |name: &str, value: &str| {
            out.push_str(name);
            out.push_str(": ");
            out.push_str(value);
            out.push_str("\r\n");
        };
        header("Date", &date.to_rfc2822());
        header("From", &format_address(&self.from));
        if !self.to.is_empty() {
            header("To", &format_list(&self.to));
        }
        if !self.cc.is_empty() {
            header("Cc", &format_list(&self.cc));
        }
        header("Subject", &encode_word(&self.subject));
        header("MIME-Version", "1.0");
        header("Content-Type", "text/plain; charset=utf-8");
        header("Content-Transfer-Encoding", "8bit");
        out.push_str("\r\n");
        for line in self.body.lines() {
            out.push_str(line);
            out.push_str("\r\n");
        }
        out.into_bytes()
    }
}

/// Delivers outgoing mail.
pub trait MailTransport {
    fn send(&self, mail: &OutgoingMail, smtp: &SmtpConfig) -> Result<()>;
}

/// The address a reply goes to: Reply-To when it parses, else From.
pub fn reply_to(original: &Envelope) -> Vec<EmailAddress> {
    [&original.reply_to, &original.from]
        .into_iter()
        .find_map(|raw| EmailAddress::parse(raw))
        .into_iter()
        .collect()
}

/// To and Cc of `original`, minus any address listed in `me`.
pub fn reply_all_cc(original: &Envelope, me: &[String]) -> Vec<EmailAddress> {
    EmailAddress::parse_list(&original.to)
        .into_iter()
        .chain(EmailAddress::parse_list(&original.cc))
        .filter(|addr| !me.iter().any(|mine| addr.is(mine)))
        .collect()
}

fn format_list(list: &[EmailAddress]) -> String {
    list.iter().map(format_address).collect::<Vec<_>>().join(", ")
}

fn format_address(addr: &EmailAddress) -> String {
    if addr.display_name.is_ascii() {
        return addr.to_string();
    }
    format!("{} <{}>", encode_word(&addr.display_name), addr.address)
}

/// RFC 2047 `B` encoding for non-ASCII header text.
fn encode_word(text: &str) -> String {
    if text.is_ascii() {
        return text.to_string();
    }
    format!("=?UTF-8?B?{}?=", STANDARD.encode(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::header::Headers;
    use chrono::TimeZone;

    fn envelope() -> Envelope {
        Envelope {
            from: "Alice <alice@example.com>".into(),
            to: "me@example.com, Bob <bob@example.com>".into(),
            cc: "\"Doe, Carol\" <carol@example.com>, ME@example.com".into(),
            subject: "Plans".into(),
            ..Envelope::default()
        }
    }

    #[test]
    fn test_reply_to_prefers_reply_to_header() {
        let mut env = envelope();
        assert_eq!(reply_to(&env)[0].address, "alice@example.com");
        env.reply_to = "list@example.com".into();
        assert_eq!(reply_to(&env)[0].address, "list@example.com");
        env.reply_to = "garbage".into();
        assert_eq!(reply_to(&env)[0].address, "alice@example.com");
    }

    #[test]
    fn test_reply_all_excludes_me() {
        let cc = reply_all_cc(&envelope(), &["me@example.com".to_string()]);
        let addrs: Vec<_> = cc.iter().map(|a| a.address.as_str()).collect();
        assert_eq!(addrs, ["bob@example.com", "carol@example.com"]);
    }

    #[test]
    fn test_reply_subject_prefix_once() {
        let from = EmailAddress::new("", "me@example.com");
        let mail = OutgoingMail::reply(&envelope(), from.clone(), &[], false);
        assert_eq!(mail.subject, "Re: Plans");
        assert!(mail.cc.is_empty());
        let mut env = envelope();
        env.subject = "RE: Plans".into();
        assert_eq!(OutgoingMail::reply(&env, from, &[], true).subject, "RE: Plans");
    }

    #[test]
    fn test_render_omits_bcc_and_encodes_subject() {
        let mail = OutgoingMail {
            from: EmailAddress::new("José", "jose@example.com"),
            to: vec![EmailAddress::new("", "a@example.com")],
            cc: Vec::new(),
            bcc: vec![EmailAddress::new("", "hidden@example.com")],
            subject: "Café".into(),
            body: "line one\nline two".into(),
        };
        let date = Utc.with_ymd_and_hms(2024, 1, 4, 10, 0, 0).unwrap();
        let raw = mail.render_at(date);
        let text = String::from_utf8(raw.clone()).unwrap();
        assert!(!text.contains("hidden@example.com"));
        assert!(text.ends_with("\r\n\r\nline one\r\nline two\r\n"));

        let head = text.split("\r\n\r\n").next().unwrap();
        let headers = Headers::parse(head.as_bytes());
        assert_eq!(headers.decoded("subject"), "Café");
        assert_eq!(headers.decoded("from"), "José <jose@example.com>");
        assert_eq!(headers.get("to"), Some("<a@example.com>"));
        assert_eq!(mail.recipients().len(), 2);
    }

    #[test]
    fn test_check_requires_recipients() {
        let mail = OutgoingMail::new(EmailAddress::new("", "me@example.com"));
        assert!(matches!(mail.check(), Err(MailError::Transport(_))));
    }
}
