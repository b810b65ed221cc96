//! Per-message state flags and the maildir `:2,<flags>` filename suffix.

use bitflags::bitflags;

/// Marker separating a maildir unique name from its info section.
pub const INFO_MARKER: &str = ":2,";

bitflags! {
    /// Message state. All flags except [`Flags::TAGGED`] are persisted in the filename.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Flags: u8 {
        /// `P`: resent, forwarded or bounced.
        const PASSED = 1 << 0;
        /// `R`: replied to.
        const REPLIED = 1 << 1;
        /// `S`: viewed.
        const SEEN = 1 << 2;
        /// `T`: marked for deletion on the next flush.
        const TRASHED = 1 << 3;
        /// `D`: draft.
        const DRAFT = 1 << 4;
        /// `F`: user-flagged.
        const FLAGGED = 1 << 5;
        /// In-memory multi-select mark. Never written to disk.
        const TAGGED = 1 << 6;
    }
}

/// Persisted flags in canonical suffix order.
const SUFFIX_ORDER: [(Flags, char); 6] = [
    (Flags::PASSED, 'P'),
    (Flags::REPLIED, 'R'),
    (Flags::SEEN, 'S'),
    (Flags::TRASHED, 'T'),
    (Flags::DRAFT, 'D'),
    (Flags::FLAGGED, 'F'),
];

impl Flags {
    /// The subset of flags that survives on disk.
    pub fn persisted(self) -> Self {
        self.difference(Flags::TAGGED)
    }

    /// Parse the characters following `:2,`.
    ///
    /// Order does not matter and unknown characters are ignored.
    pub fn from_suffix(info: &str) -> Self {
        info.chars()
            .filter_map(|c| {
                SUFFIX_ORDER
                    .iter()
                    .find(|(_, code)| *code == c)
                    .map(|(flag, _)| *flag)
            })
            .fold(Flags::empty(), |acc, flag| acc | flag)
    }

    /// Canonical flag characters (`PRSTDF` order), without the `:2,` marker.
    pub fn to_suffix(self) -> String {
        SUFFIX_ORDER
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, code)| *code)
            .collect()
    }

    /// Flags recorded in a message filename. No marker means no flags.
    pub fn from_file_name(file_name: &str) -> Self {
        match split_info(file_name).1 {
            Some(info) => Self::from_suffix(info),
            None => Flags::empty(),
        }
    }

    /// Four-column status indicator for message lists.
    ///
    /// Column 0: `N` unseen, `r` replied, `p` passed. Column 1: `D` trashed.
    /// Column 2: `d` draft. Column 3: `!` flagged.
    pub fn column(self) -> String {
        let read_state = if !self.contains(Flags::SEEN) {
            'N'
        } else if self.contains(Flags::REPLIED) {
            'r'
        } else if self.contains(Flags::PASSED) {
            'p'
        } else {
            ' '
        };
        let pick = |flag: Flags, c: char| if self.contains(flag) { c } else { ' ' };
        [
            read_state,
            pick(Flags::TRASHED, 'D'),
            pick(Flags::DRAFT, 'd'),
            pick(Flags::FLAGGED, '!'),
        ]
        .iter()
        .collect()
    }
}

/// Split a filename into its unique part and optional info section.
///
/// `"1234.host:2,RS"` → `("1234.host", Some("RS"))`.
pub fn split_info(file_name: &str) -> (&str, Option<&str>) {
    match file_name.rfind(INFO_MARKER) {
        Some(pos) => (&file_name[..pos], Some(&file_name[pos + INFO_MARKER.len()..])),
        None => (file_name, None),
    }
}

/// Filename for a unique name carrying `flags`.
pub fn file_name_with_flags(unique: &str, flags: Flags) -> String {
    format!("{unique}{INFO_MARKER}{}", flags.persisted().to_suffix())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffix_round_trip_all_subsets() {
        for bits in 0u8..64 {
            let flags = Flags::from_bits_truncate(bits);
            assert_eq!(Flags::from_suffix(&flags.to_suffix()), flags, "bits {bits:#08b}");
        }
    }

    #[test]
    fn test_suffix_canonical_order() {
        let flags = Flags::FLAGGED | Flags::SEEN | Flags::PASSED | Flags::TRASHED;
        assert_eq!(flags.to_suffix(), "PSTF");
    }

    #[test]
    fn test_parse_tolerates_order_and_unknown() {
        let flags = Flags::from_suffix("FxSa,R");
        assert_eq!(flags, Flags::FLAGGED | Flags::SEEN | Flags::REPLIED);
    }

    #[test]
    fn test_tagged_never_persisted() {
        let flags = Flags::SEEN | Flags::TAGGED;
        assert_eq!(file_name_with_flags("abc", flags), "abc:2,S");
    }

    #[test]
    fn test_from_file_name() {
        assert_eq!(Flags::from_file_name("123.host:2,ST"), Flags::SEEN | Flags::TRASHED);
        assert_eq!(Flags::from_file_name("123.host:2,"), Flags::empty());
        assert_eq!(Flags::from_file_name("123.host"), Flags::empty());
    }

    #[test]
    fn test_split_info() {
        assert_eq!(split_info("a.b:2,FS"), ("a.b", Some("FS")));
        assert_eq!(split_info("a.b"), ("a.b", None));
    }

    #[test]
    fn test_column() {
        assert_eq!(Flags::empty().column(), "N   ");
        assert_eq!((Flags::SEEN | Flags::REPLIED).column(), "r   ");
        assert_eq!((Flags::SEEN | Flags::PASSED | Flags::FLAGGED).column(), "p  !");
        assert_eq!((Flags::SEEN | Flags::TRASHED | Flags::DRAFT).column(), " Dd ");
    }
}
