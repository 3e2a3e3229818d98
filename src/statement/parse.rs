use std::time::Instant;

use bytes::Bytes;
use smallvec::SmallVec;

use crate::charset;
use crate::connection::{ConnectionContext, SqlMode};
use crate::error::{Error, Result};

/// Coarse statement classification, derived once per parse from the first
/// significant character and a literal prefix check.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    LoadData,
    Other,
}

/// The immutable result of scanning a SQL template once.
///
/// `fragments` holds the static byte runs between placeholders
/// (`parameter_count + 1` of them); concatenating `fragments[i]` with the
/// encoded parameter `i` for every `i`, then the final fragment,
/// reconstitutes a directly executable statement. Shared read-only across
/// statement instances via the statement cache.
#[derive(Debug)]
pub struct ParsedStatement {
    pub(crate) fragments: Vec<Bytes>,
    pub(crate) parameter_count: usize,
    pub(crate) first_char: char,
    pub(crate) has_limit: bool,
    pub(crate) is_load_data: bool,
    pub(crate) statement_length: usize,
    pub(crate) created_at: Instant,
    pub(crate) sql: String,
}

impl ParsedStatement {
    /// Scan `sql` once, locating placeholders and splitting the template
    /// into charset-encoded static fragments.
    pub fn parse(sql: &str, context: &ConnectionContext) -> Result<Self> {
        let bytes = sql.as_bytes();
        let no_backslash = context.sql_mode.contains(SqlMode::NO_BACKSLASH_ESCAPES);
        let quote_char = context.quote_char;

        let trimmed = sql.trim_start();
        let first_char = trimmed.chars().next().unwrap_or('\0').to_ascii_uppercase();
        let is_load_data = first_char == 'L' && starts_with_keyword(trimmed, "LOAD DATA");

        // half-open fragment boundaries around each placeholder
        let mut boundaries: SmallVec<[usize; 8]> = SmallVec::new();
        let mut has_limit = false;

        let mut in_string: Option<u8> = None;
        let mut in_identifier = false;
        let mut i = 0;

        while i < bytes.len() {
            let c = bytes[i];

            if let Some(quote) = in_string {
                if c == b'\\' && !no_backslash {
                    // the escaped character is never a quote or delimiter
                    i += 2;
                    continue;
                }

                if c == quote {
                    if bytes.get(i + 1) == Some(&quote) {
                        // doubled quote inside a string is one literal quote
                        i += 2;
                        continue;
                    }

                    in_string = None;
                }

                i += 1;
                continue;
            }

            if in_identifier {
                if c == quote_char {
                    in_identifier = false;
                }

                i += 1;
                continue;
            }

            match c {
                b'\'' | b'"' => in_string = Some(c),

                c if c == quote_char => in_identifier = true,

                b'\\' if !no_backslash => {
                    i += 2;
                    continue;
                }

                b'?' => boundaries.push(i),

                b'L' | b'l' => {
                    if !has_limit
                        && i + 5 <= bytes.len()
                        && bytes[i..i + 5].eq_ignore_ascii_case(b"LIMIT")
                    {
                        has_limit = true;
                    }
                }

                _ => {}
            }

            i += 1;
        }

        if in_string.is_some() {
            return Err(Error::syntax("string literal is not terminated"));
        }

        if in_identifier {
            return Err(Error::syntax("quoted identifier is not terminated"));
        }

        // bulk-load payloads bypass charset negotiation; their fragments
        // go out in the platform default encoding (raw UTF-8 here)
        let encode = |fragment: &str| -> Bytes {
            if is_load_data {
                Bytes::copy_from_slice(fragment.as_bytes())
            } else {
                Bytes::from(charset::encode_str(fragment, context.encoding))
            }
        };

        let mut fragments = Vec::with_capacity(boundaries.len() + 1);
        let mut fragment_start = 0;

        for &boundary in &boundaries {
            fragments.push(encode(&sql[fragment_start..boundary]));
            fragment_start = boundary + 1;
        }

        fragments.push(encode(&sql[fragment_start..]));

        Ok(Self {
            parameter_count: boundaries.len(),
            fragments,
            first_char,
            has_limit,
            is_load_data,
            statement_length: sql.len(),
            created_at: Instant::now(),
            sql: sql.to_owned(),
        })
    }

    pub fn parameter_count(&self) -> usize {
        self.parameter_count
    }

    pub fn first_char(&self) -> char {
        self.first_char
    }

    pub fn has_limit_clause(&self) -> bool {
        self.has_limit
    }

    pub fn is_load_data(&self) -> bool {
        self.is_load_data
    }

    pub fn statement_length(&self) -> usize {
        self.statement_length
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Statement classification; cached trivially since it derives from
    /// immutable parse state.
    pub fn kind(&self) -> StatementKind {
        let trimmed = self.sql.trim_start();

        match self.first_char {
            'S' if starts_with_keyword(trimmed, "SELECT") => StatementKind::Select,
            'I' if starts_with_keyword(trimmed, "INSERT") => StatementKind::Insert,
            'U' if starts_with_keyword(trimmed, "UPDATE") => StatementKind::Update,
            'D' if starts_with_keyword(trimmed, "DELETE") => StatementKind::Delete,
            'L' if self.is_load_data => StatementKind::LoadData,
            _ => StatementKind::Other,
        }
    }
}

fn starts_with_keyword(sql: &str, keyword: &str) -> bool {
    let bytes = sql.as_bytes();

    bytes.len() >= keyword.len() && bytes[..keyword.len()].eq_ignore_ascii_case(keyword.as_bytes())
}

/// Locate the `VALUES (...)` tuple of an INSERT statement: the first
/// `VALUES` keyword outside quotes, its first `(`, and the statement's
/// last `)`. Returns the byte range of the parenthesized tuple.
pub(crate) fn find_values_clause(sql: &str, context: &ConnectionContext) -> Option<(usize, usize)> {
    let bytes = sql.as_bytes();
    let no_backslash = context.sql_mode.contains(SqlMode::NO_BACKSLASH_ESCAPES);
    let quote_char = context.quote_char;

    let mut in_string: Option<u8> = None;
    let mut in_identifier = false;
    let mut values_at: Option<usize> = None;
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];

        if let Some(quote) = in_string {
            if c == b'\\' && !no_backslash {
                i += 2;
                continue;
            }

            if c == quote {
                if bytes.get(i + 1) == Some(&quote) {
                    i += 2;
                    continue;
                }

                in_string = None;
            }

            i += 1;
            continue;
        }

        if in_identifier {
            if c == quote_char {
                in_identifier = false;
            }

            i += 1;
            continue;
        }

        match c {
            b'\'' | b'"' => in_string = Some(c),
            c if c == quote_char => in_identifier = true,

            b'\\' if !no_backslash => {
                i += 2;
                continue;
            }

            b'V' | b'v' => {
                if i + 6 <= bytes.len() && bytes[i..i + 6].eq_ignore_ascii_case(b"VALUES") {
                    values_at = Some(i);
                    break;
                }
            }

            _ => {}
        }

        i += 1;
    }

    let values_at = values_at?;
    let open = values_at + memchr::memchr(b'(', &bytes[values_at..])?;
    let close = memchr::memrchr(b')', bytes)?;

    if close <= open {
        return None;
    }

    Some((open, close + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{ConnectionContext, ServerVersion, SqlMode};

    fn context() -> ConnectionContext {
        ConnectionContext::new(ServerVersion::new(8, 0, 32), "utf8").unwrap()
    }

    #[test]
    fn counts_placeholders_in_simple_insert() -> anyhow::Result<()> {
        let parsed = ParsedStatement::parse("INSERT INTO t (a,b) VALUES (?, ?)", &context())?;

        assert_eq!(parsed.parameter_count(), 2);
        assert_eq!(parsed.first_char(), 'I');
        assert_eq!(parsed.kind(), StatementKind::Insert);
        assert!(!parsed.has_limit_clause());
        assert!(!parsed.is_load_data());
        assert_eq!(parsed.fragments.len(), 3);

        Ok(())
    }

    #[test]
    fn quoted_question_marks_are_not_placeholders() -> anyhow::Result<()> {
        let parsed =
            ParsedStatement::parse("SELECT * FROM t WHERE a = ? AND b = '?'", &context())?;

        assert_eq!(parsed.parameter_count(), 1);

        let parsed = ParsedStatement::parse("SELECT `odd?name` FROM t WHERE a = ?", &context())?;

        assert_eq!(parsed.parameter_count(), 1);

        Ok(())
    }

    #[test]
    fn doubled_quotes_stay_inside_the_string() -> anyhow::Result<()> {
        let parsed =
            ParsedStatement::parse("SELECT 'it''s a ?' FROM t WHERE a = ?", &context())?;

        assert_eq!(parsed.parameter_count(), 1);

        Ok(())
    }

    #[test]
    fn backslash_escape_hides_the_quote() -> anyhow::Result<()> {
        let parsed =
            ParsedStatement::parse(r"SELECT 'a\'? still a string' FROM t WHERE b = ?", &context())?;

        assert_eq!(parsed.parameter_count(), 1);

        // with escapes disabled the backslash is literal, so the string
        // ends at the second quote and the first ? is a placeholder
        let context =
            context().with_sql_mode(SqlMode::NO_BACKSLASH_ESCAPES | SqlMode::ANSI_QUOTES);
        let parsed =
            ParsedStatement::parse(r"SELECT 'a\', b FROM t WHERE b = ?", &context)?;

        assert_eq!(parsed.parameter_count(), 1);

        Ok(())
    }

    #[test]
    fn detects_limit_clause() -> anyhow::Result<()> {
        let parsed = ParsedStatement::parse("SELECT * FROM t LIMIT ?", &context())?;

        assert!(parsed.has_limit_clause());
        assert_eq!(parsed.parameter_count(), 1);

        let parsed = ParsedStatement::parse("SELECT 'LIMIT' FROM t", &context())?;

        assert!(!parsed.has_limit_clause());

        Ok(())
    }

    #[test]
    fn detects_load_data() -> anyhow::Result<()> {
        let parsed = ParsedStatement::parse(
            "LOAD DATA INFILE 'x.csv' INTO TABLE t",
            &context(),
        )?;

        assert!(parsed.is_load_data());
        assert_eq!(parsed.kind(), StatementKind::LoadData);

        Ok(())
    }

    #[test]
    fn fragments_reconstruct_the_template() -> anyhow::Result<()> {
        let sql = "INSERT INTO t (a,b) VALUES (?, ?)";
        let parsed = ParsedStatement::parse(sql, &context())?;

        let mut rebuilt = Vec::new();

        for (i, fragment) in parsed.fragments.iter().enumerate() {
            rebuilt.extend_from_slice(fragment);

            if i < parsed.parameter_count() {
                rebuilt.extend_from_slice(b"X");
            }
        }

        assert_eq!(rebuilt, sql.replace('?', "X").into_bytes());

        Ok(())
    }

    #[test]
    fn unterminated_string_is_a_syntax_error() {
        assert!(matches!(
            ParsedStatement::parse("SELECT 'oops FROM t", &context()),
            Err(crate::Error::Syntax(_))
        ));

        assert!(matches!(
            ParsedStatement::parse("SELECT `oops FROM t", &context()),
            Err(crate::Error::Syntax(_))
        ));
    }

    #[test]
    fn empty_statement_parses_to_one_fragment() -> anyhow::Result<()> {
        let parsed = ParsedStatement::parse("", &context())?;

        assert_eq!(parsed.parameter_count(), 0);
        assert_eq!(parsed.fragments.len(), 1);
        assert_eq!(parsed.first_char(), '\0');

        Ok(())
    }

    #[test]
    fn finds_values_clause() {
        let context = context();
        let sql = "INSERT INTO t (a,b) VALUES (?, ?)";
        let (start, end) = find_values_clause(sql, &context).unwrap();

        assert_eq!(&sql[start..end], "(?, ?)");

        // VALUES inside a string literal does not count
        assert_eq!(find_values_clause("UPDATE t SET a = 'VALUES (1)'", &context), None);
    }
}
