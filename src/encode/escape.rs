//! Escaping and hex-literal formatting for quoted SQL literals.
//!
//! Escaping happens at the character level for host strings (safe for
//! multibyte charsets, since the escaped characters are ASCII) and at the
//! byte level for raw byte runs, which is only sound for single-byte
//! connection charsets.

/// Does this byte run contain anything a quoted literal must escape?
///
/// The set is {NUL, LF, CR, `\`, `'`, `"`, SUB}.
pub(crate) fn needs_escaping(bytes: &[u8]) -> bool {
    memchr::memchr3(b'\0', b'\n', b'\r', bytes).is_some()
        || memchr::memchr3(b'\\', b'\'', b'"', bytes).is_some()
        || memchr::memchr(0x1a, bytes).is_some()
}

/// Escape a raw byte run into `out`, without surrounding quotes.
pub(crate) fn escape_bytes_into(src: &[u8], ansi_quotes: bool, out: &mut Vec<u8>) {
    for &byte in src {
        match byte {
            b'\0' => out.extend_from_slice(b"\\0"),
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'\'' => out.extend_from_slice(b"\\'"),
            b'"' if !ansi_quotes => out.extend_from_slice(b"\\\""),
            0x1a => out.extend_from_slice(b"\\Z"),
            _ => out.push(byte),
        }
    }
}

/// Escape string content into `out` at the character level, without
/// surrounding quotes.
pub(crate) fn escape_str_into(src: &str, ansi_quotes: bool, out: &mut String) {
    for c in src.chars() {
        match c {
            '\0' => out.push_str("\\0"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' if !ansi_quotes => out.push_str("\\\""),
            '\u{1a}' => out.push_str("\\Z"),
            _ => out.push(c),
        }
    }
}

/// Open a hexadecimal literal: `x'` on 4.1+ servers, the universally
/// accepted `0x` form otherwise.
pub(crate) fn hex_open(modern: bool, out: &mut Vec<u8>) {
    out.extend_from_slice(if modern { b"x'" } else { b"0x" });
}

/// Append the body of a hexadecimal literal: two uppercase digits per
/// source byte.
pub(crate) fn hex_body(src: &[u8], out: &mut Vec<u8>) {
    out.extend_from_slice(hex::encode_upper(src).as_bytes());
}

pub(crate) fn hex_close(modern: bool, out: &mut Vec<u8>) {
    if modern {
        out.push(b'\'');
    }
}

/// Format a whole byte run as one hexadecimal literal.
pub(crate) fn hex_literal(src: &[u8], modern: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(src.len() * 2 + 3);

    hex_open(modern, &mut out);
    hex_body(src, &mut out);
    hex_close(modern, &mut out);

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_the_full_set() {
        let mut out = String::new();
        escape_str_into("a\0b\nc\rd\\e'f\"g\u{1a}h", false, &mut out);

        assert_eq!(out, "a\\0b\\nc\\rd\\\\e\\'f\\\"g\\Zh");
    }

    #[test]
    fn ansi_mode_leaves_double_quotes_alone() {
        let mut out = String::new();
        escape_str_into(r#"say "hi""#, true, &mut out);

        assert_eq!(out, r#"say "hi""#);
    }

    #[test]
    fn clean_runs_need_no_escaping() {
        assert!(!needs_escaping(b"hello world 123"));
        assert!(needs_escaping(b"O'Brien"));
        assert!(needs_escaping(b"nul\0byte"));
    }

    #[test]
    fn hex_literal_round_trips_nul_bytes() {
        let original = b"\x00\x01\xffabc\x00";
        let literal = hex_literal(original, true);

        let body = std::str::from_utf8(&literal[2..literal.len() - 1]).unwrap();
        assert!(body.bytes().all(|b| b.is_ascii_digit() || b.is_ascii_uppercase()));

        let decoded = hex::decode(body).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn legacy_hex_form_has_no_quotes() {
        assert_eq!(hex_literal(b"\xab", false), b"0xAB".to_vec());
        assert_eq!(hex_literal(b"\xab", true), b"x'AB'".to_vec());
    }
}
