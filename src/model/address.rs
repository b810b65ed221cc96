//! Mailbox addresses as they appear in `From`, `To`, `Cc` and `Reply-To`.

/// A parsed address: `"Name <user@host>"` or a bare `user@host`.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct EmailAddress {
    /// Human-readable name, possibly empty.
    pub display_name: String,
    /// The `local@domain` part.
    pub address: String,
}

impl EmailAddress {
    pub fn new(display_name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            address: address.into(),
        }
    }

    /// Parse one address. Returns `None` when there is no `@` to be found,
    /// since such a value cannot be replied to.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let (Some(open), Some(close)) = (raw.rfind('<'), raw.rfind('>')) {
            if close > open {
                let address = raw[open + 1..close].trim();
                if !address.contains('@') {
                    return None;
                }
                let name = raw[..open].trim().trim_matches('"').trim();
                return Some(Self::new(name, address));
            }
        }
        if raw.contains('@') && !raw.contains(char::is_whitespace) {
            return Some(Self::new("", raw));
        }
        None
    }

    /// Parse a comma-separated list, honouring commas inside quotes and angle brackets.
    /// Unparseable entries are dropped.
    pub fn parse_list(raw: &str) -> Vec<Self> {
        let mut out = Vec::new();
        let mut start = 0;
        let mut quoted = false;
        let mut angled = false;
        for (i, ch) in raw.char_indices() {
            match ch {
                '"' => quoted = !quoted,
                '<' if !quoted => angled = true,
                '>' if !quoted => angled = false,
                ',' if !quoted && !angled => {
                    out.extend(Self::parse(&raw[start..i]));
                    start = i + 1;
                }
                _ => {}
            }
        }
        out.extend(Self::parse(&raw[start..]));
        out
    }

    /// Case-insensitive comparison of the bare address against `other`.
    pub fn is(&self, other: &str) -> bool {
        self.address.eq_ignore_ascii_case(other.trim())
    }

    /// Short form for list columns: the name if there is one, else the address.
    pub fn short(&self) -> &str {
        if self.display_name.is_empty() {
            &self.address
        } else {
            &self.display_name
        }
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.display_name.is_empty() {
            write!(f, "<{}>", self.address)
        } else if self.display_name.contains([',', ';', '"', '<', '>']) {
            write!(f, "\"{}\" <{}>", self.display_name.replace('"', "'"), self.address)
        } else {
            write!(f, "{} <{}>", self.display_name, self.address)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_and_angle() {
        assert_eq!(EmailAddress::parse("a@b.com"), Some(EmailAddress::new("", "a@b.com")));
        assert_eq!(EmailAddress::parse("<a@b.com>"), Some(EmailAddress::new("", "a@b.com")));
    }

    #[test]
    fn test_parse_named() {
        let addr = EmailAddress::parse("\"Doe, Jane\" <jane@example.com>").unwrap();
        assert_eq!(addr.display_name, "Doe, Jane");
        assert_eq!(addr.address, "jane@example.com");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(EmailAddress::parse("undisclosed-recipients:;"), None);
        assert_eq!(EmailAddress::parse(""), None);
    }

    #[test]
    fn test_parse_list_quoted_comma() {
        let list = EmailAddress::parse_list("\"Doe, Jane\" <jane@x.org>, bob@y.org, junk");
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].display_name, "Doe, Jane");
        assert_eq!(list[1].address, "bob@y.org");
    }

    #[test]
    fn test_display_quotes_specials() {
        let addr = EmailAddress::new("Doe, Jane", "jane@x.org");
        assert_eq!(addr.to_string(), "\"Doe, Jane\" <jane@x.org>");
        assert_eq!(EmailAddress::new("", "a@b").to_string(), "<a@b>");
    }

    #[test]
    fn test_is_case_insensitive() {
        assert!(EmailAddress::new("", "Me@Example.com").is("me@example.com "));
    }
}
