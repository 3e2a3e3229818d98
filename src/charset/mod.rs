//! Translation between the three ways MySQL identifies a character set
//! (server charset name, wire collation index, error-message language) and
//! the host encoding used to convert statement text to bytes.
//!
//! Collation IDs are assigned without much apparent rhyme or reason,
//! mostly just sequential with unexplained gaps, so the full catalog is
//! spelled out in [`table`] rather than derived. The registry is immutable
//! after startup and needs no locking.

mod table;

use encoding_rs::Encoding;
use once_cell::sync::Lazy;

use crate::connection::ServerVersion;

use self::table::{
    CharsetEntry, CHARSETS, COLLATION_INDEX, COLLATION_INDEX_MAX, COLLATION_INDEX_RANGES,
    LANGUAGE_TO_CHARSET, PUNTED_INDEXES,
};

/// Host encoding used when a best-effort lookup cannot resolve.
pub const FALLBACK_ENCODING: &str = "windows-1252";

fn gate_satisfied(since: Option<(u16, u16, u16)>, version: &ServerVersion) -> bool {
    match since {
        Some((major, minor, patch)) => version.meets(major, minor, patch),
        None => true,
    }
}

/// Resolve a server charset name to a host encoding label.
///
/// With a known connection version, the first version-satisfied entry for
/// the name wins; with an unknown version, gates are ignored and the first
/// entry wins.
#[must_use]
pub fn host_encoding_for(
    server_charset: &str,
    version: Option<&ServerVersion>,
) -> Option<&'static str> {
    let name = server_charset.trim();

    if name.is_empty() {
        return None;
    }

    // 4.1 made latin1 mean the Windows-1252 superset; the table carries
    // both entries but the override is load-bearing enough to be explicit.
    if name.eq_ignore_ascii_case("latin1") {
        if let Some(version) = version {
            return Some(if version.meets(4, 1, 0) { "windows-1252" } else { "iso-8859-1" });
        }
    }

    let mut candidates =
        CHARSETS.iter().filter(|entry| entry.server.eq_ignore_ascii_case(name));

    match version {
        None => candidates.next().map(|entry| entry.host),
        Some(version) => candidates
            .find(|entry| gate_satisfied(entry.since, version))
            .map(|entry| entry.host),
    }
}

/// Inverse lookup: the server charset name for a host encoding label.
///
/// When several server names map from one host encoding, prefer (in
/// order): an entry marked preferred and version-satisfied; otherwise the
/// most recent version-gated entry whose gate matches the next candidate's;
/// otherwise the first version-satisfied entry. An unknown version skips
/// filtering entirely.
#[must_use]
pub fn server_charset_for(
    host_encoding: &str,
    version: Option<&ServerVersion>,
) -> Option<&'static str> {
    let mut candidates =
        CHARSETS.iter().filter(|entry| entry.host.eq_ignore_ascii_case(host_encoding));

    let Some(version) = version else {
        return candidates.next().map(|entry| entry.server);
    };

    let satisfied: Vec<&CharsetEntry> =
        candidates.filter(|entry| gate_satisfied(entry.since, version)).collect();

    if let Some(entry) = satisfied.iter().find(|entry| entry.preferred) {
        return Some(entry.server);
    }

    let mut tied: Option<&CharsetEntry> = None;

    for pair in satisfied.windows(2) {
        if pair[0].since.is_some() && pair[0].since == pair[1].since {
            tied = Some(pair[0]);
        }
    }

    tied.or_else(|| satisfied.first().copied()).map(|entry| entry.server)
}

/// Can naive byte escaping corrupt values in this encoding?
///
/// Case-insensitive over host encoding labels.
#[must_use]
pub fn is_multibyte(host_encoding: &str) -> bool {
    CHARSETS
        .iter()
        .any(|entry| entry.multibyte && entry.host.eq_ignore_ascii_case(host_encoding))
}

/// Best-effort mapping from a server error-message language directory
/// (e.g. `/usr/share/mysql/russian/`) to the host encoding of the message
/// catalog. Never fails: anything unresolvable degrades to
/// [`FALLBACK_ENCODING`], since this only affects diagnostic text.
#[must_use]
pub fn error_message_encoding_for(
    language_dir: &str,
    version: Option<&ServerVersion>,
) -> &'static str {
    let trimmed = language_dir.trim().trim_end_matches(['/', '\\']);
    let language = trimmed.rsplit(['/', '\\']).next().unwrap_or("");

    if language.is_empty() {
        tracing::debug!("no language in error-message directory {language_dir:?}; using fallback");
        return FALLBACK_ENCODING;
    }

    let charset = LANGUAGE_TO_CHARSET
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(language))
        .map(|(_, charset)| *charset);

    match charset.and_then(|charset| host_encoding_for(charset, version)) {
        Some(host) => host,
        None => {
            log::warn!("unknown error-message language {language:?}; using fallback");
            FALLBACK_ENCODING
        }
    }
}

static INDEX_TO_CHARSET: Lazy<[Option<&'static str>; COLLATION_INDEX_MAX + 1]> = Lazy::new(|| {
    let mut index_table = [None; COLLATION_INDEX_MAX + 1];

    let mut set = |index: u16, server: &'static str| {
        let host = host_encoding_for(server, None).unwrap_or_else(|| {
            panic!("collation index {index} maps to unknown server charset {server:?}")
        });

        index_table[index as usize] = Some(host);
    };

    for &(index, server) in COLLATION_INDEX {
        set(index, server);
    }

    for &(start, end, server) in COLLATION_INDEX_RANGES {
        for index in start..=end {
            set(index, server);
        }
    }

    // startup invariant: every non-punted index in the valid range must
    // resolve to a host encoding
    for index in 1..=COLLATION_INDEX_MAX {
        if index_table[index].is_none() && !PUNTED_INDEXES.contains(&(index as u16)) {
            panic!("collation index {index} left unmapped");
        }
    }

    index_table
});

/// Host encoding for a wire collation index, or `None` for reserved and
/// out-of-range indices.
#[must_use]
pub fn collation_index_to_charset(index: u16) -> Option<&'static str> {
    INDEX_TO_CHARSET.get(usize::from(index)).copied().flatten()
}

/// Resolve a host encoding label to a converter.
///
/// Labels that name encodings outside the WHATWG set (cp850, swe7,
/// x-mac-ce, utf-32, …) convert through Windows-1252 as a byte-transparent
/// single-byte stand-in; their registry identities stay distinct.
#[must_use]
pub fn encoding_for_label(label: &str) -> &'static Encoding {
    Encoding::for_label(label.as_bytes()).unwrap_or(encoding_rs::WINDOWS_1252)
}

/// Convert text to bytes in the given encoding.
#[must_use]
pub fn encode_str(text: &str, encoding: &'static Encoding) -> Vec<u8> {
    let (bytes, _, _) = encoding.encode(text);
    bytes.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ServerVersion;

    #[test]
    fn latin1_is_cp1252_on_modern_servers() {
        let old = ServerVersion::new(4, 0, 27);
        let new = ServerVersion::new(4, 1, 0);

        assert_eq!(host_encoding_for("latin1", Some(&old)), Some("iso-8859-1"));
        assert_eq!(host_encoding_for("latin1", Some(&new)), Some("windows-1252"));
        assert_eq!(host_encoding_for("LATIN1", Some(&new)), Some("windows-1252"));
    }

    #[test]
    fn utf8_prefers_utf8_over_utf8mb4() {
        let version = ServerVersion::new(5, 6, 4);

        assert_eq!(server_charset_for("utf-8", Some(&version)), Some("utf8"));
        assert_eq!(server_charset_for("UTF-8", None), Some("utf8"));
    }

    #[test]
    fn version_gate_filters_candidates() {
        // gb18030 appeared in 5.7.4
        let old = ServerVersion::new(5, 6, 0);
        let new = ServerVersion::new(5, 7, 4);

        assert_eq!(host_encoding_for("gb18030", Some(&old)), None);
        assert_eq!(host_encoding_for("gb18030", Some(&new)), Some("gb18030"));
    }

    #[test]
    fn multibyte_classification_is_case_symmetric() {
        for entry in super::table::CHARSETS {
            let upper = entry.host.to_ascii_uppercase();
            assert_eq!(
                is_multibyte(entry.host),
                is_multibyte(&upper),
                "asymmetric classification for {:?}",
                entry.host,
            );
        }

        assert!(is_multibyte("utf-8"));
        assert!(is_multibyte("SHIFT_JIS"));
        assert!(!is_multibyte("windows-1252"));
    }

    #[test]
    fn collation_index_table_is_complete() {
        for index in 1..=super::table::COLLATION_INDEX_MAX as u16 {
            let mapped = collation_index_to_charset(index);

            if super::table::PUNTED_INDEXES.contains(&index) {
                assert_eq!(mapped, None, "reserved index {index} should not map");
            } else {
                let host = mapped.unwrap_or_else(|| panic!("index {index} unmapped"));
                assert!(
                    host_encoding_for(
                        server_charset_for(host, None).expect("host reverses"),
                        None
                    )
                    .is_some(),
                    "index {index} does not round-trip through the registry"
                );
            }
        }

        assert_eq!(collation_index_to_charset(0), None);
        assert_eq!(collation_index_to_charset(u16::MAX), None);
    }

    #[test]
    fn binary_collation_is_index_63() {
        assert_eq!(collation_index_to_charset(63), Some("iso-8859-1"));
    }

    #[test]
    fn error_message_lookup_degrades_to_fallback() {
        let version = ServerVersion::new(5, 0, 0);

        assert_eq!(
            error_message_encoding_for("/usr/share/mysql/russian/", Some(&version)),
            "koi8-r"
        );
        assert_eq!(error_message_encoding_for("german", Some(&version)), "windows-1252");
        assert_eq!(error_message_encoding_for("", Some(&version)), FALLBACK_ENCODING);
        assert_eq!(error_message_encoding_for("///", None), FALLBACK_ENCODING);
        assert_eq!(error_message_encoding_for("klingon", None), FALLBACK_ENCODING);
    }

    #[test]
    fn encode_str_converts_through_the_label() {
        let encoding = encoding_for_label("windows-1252");

        assert_eq!(encode_str("O'Brien", encoding), b"O'Brien".to_vec());
        assert_eq!(encode_str("\u{00e9}", encoding), vec![0xe9]);
    }
}
