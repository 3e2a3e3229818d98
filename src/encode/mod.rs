//! Conversion of host values into wire-ready SQL literal bytes.
//!
//! Every supported host type has one deterministic encoding path; the
//! produced bytes substitute verbatim for a placeholder, so they carry
//! their own quoting, escaping, or hex formatting.

mod escape;
mod stream;
mod temporal;

use std::borrow::Cow;

use bigdecimal::BigDecimal;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};

use crate::charset;
use crate::connection::{ConnectionContext, SqlMode};
use crate::error::{Error, Result};

pub(crate) use self::escape::{escape_bytes_into, hex_literal, needs_escaping};
pub(crate) use self::stream::encode_stream;
pub use self::temporal::TemporalKind;
pub(crate) use self::temporal::{
    encode_date, encode_datetime, encode_temporal_text, encode_time, encode_timestamp,
};

/// Every bindable host value, as one closed sum.
///
/// [`encode`][Self::encode] is the single exhaustive match over the
/// supported kinds; adding a kind without an encoding path is a compile
/// error.
#[derive(Debug, Clone)]
pub enum BindValue<'q> {
    Null,
    Bool(bool),
    TinyInt(i8),
    SmallInt(i16),
    Int(i32),
    BigInt(i64),
    UInt(u64),
    Float(f32),
    Double(f64),
    Decimal(BigDecimal),
    Text(Cow<'q, str>),
    /// National-character string: forced through UTF-8 with a charset
    /// introducer, independent of the connection charset.
    NationalText(Cow<'q, str>),
    Bytes(Cow<'q, [u8]>),
    Date(Date),
    Time(Time),
    DateTime(PrimitiveDateTime),
    Timestamp(OffsetDateTime),
    /// Free-form date/time text; the pattern is inferred.
    TemporalText(Cow<'q, str>),
    /// Pre-serialized opaque object, bound as binary. Escape hatch of
    /// last resort.
    Serialized(Cow<'q, [u8]>),
}

impl BindValue<'_> {
    /// Produce the literal bytes for this value.
    pub fn encode(&self, context: &ConnectionContext) -> Result<Vec<u8>> {
        match self {
            Self::Null => Ok(b"NULL".to_vec()),
            Self::Bool(value) => Ok(encode_bool(*value, context)),

            Self::TinyInt(value) => Ok(encode_int(i64::from(*value))),
            Self::SmallInt(value) => Ok(encode_int(i64::from(*value))),
            Self::Int(value) => Ok(encode_int(i64::from(*value))),
            Self::BigInt(value) => Ok(encode_int(*value)),
            Self::UInt(value) => Ok(encode_uint(*value)),

            Self::Float(value) => encode_float(f64::from(*value), format!("{value:?}"), context),
            Self::Double(value) => encode_float(*value, format!("{value:?}"), context),
            Self::Decimal(value) => Ok(value.to_string().into_bytes()),

            Self::Text(text) => Ok(encode_text(text, context)),
            Self::NationalText(text) => Ok(encode_national_text(text, context)),
            Self::Bytes(bytes) | Self::Serialized(bytes) => Ok(encode_bytes(bytes, context)),

            Self::Date(value) => encode_date(*value),
            Self::Time(value) => encode_time(*value),
            Self::DateTime(value) => encode_datetime(*value),
            Self::Timestamp(value) => encode_timestamp(*value, context.session_offset),
            Self::TemporalText(text) => encode_temporal_text(text),
        }
    }
}

fn encode_int(value: i64) -> Vec<u8> {
    let mut buffer = itoa::Buffer::new();

    buffer.format(value).as_bytes().to_vec()
}

fn encode_uint(value: u64) -> Vec<u8> {
    let mut buffer = itoa::Buffer::new();

    buffer.format(value).as_bytes().to_vec()
}

/// Booleans are `1`/`0` on servers with real boolean literal support and
/// quoted `'t'`/`'f'` on ancient ones.
fn encode_bool(value: bool, context: &ConnectionContext) -> Vec<u8> {
    if context.version.meets(3, 21, 23) {
        if value { b"1".to_vec() } else { b"0".to_vec() }
    } else if value {
        b"'t'".to_vec()
    } else {
        b"'f'".to_vec()
    }
}

/// Locale-independent float formatting with the exponent fixed up to the
/// `E+nn` form. NaN and infinities are rejected unless explicitly allowed.
fn encode_float(value: f64, repr: String, context: &ConnectionContext) -> Result<Vec<u8>> {
    if !value.is_finite() && !context.options.allow_nan_and_infinity {
        return Err(Error::encode(format!("{value} is not a valid numeric literal")));
    }

    Ok(fix_decimal_exponent(repr).into_bytes())
}

fn fix_decimal_exponent(repr: String) -> String {
    let Some(position) = repr.find(['e', 'E']) else {
        return repr;
    };

    let (mantissa, exponent) = repr.split_at(position);
    let exponent = &exponent[1..];

    if exponent.starts_with(['+', '-']) {
        format!("{mantissa}E{exponent}")
    } else {
        format!("{mantissa}E+{exponent}")
    }
}

fn encode_text(text: &str, context: &ConnectionContext) -> Vec<u8> {
    let no_backslash = context.sql_mode.contains(SqlMode::NO_BACKSLASH_ESCAPES);
    let ansi_quotes = context.sql_mode.contains(SqlMode::ANSI_QUOTES);

    if no_backslash {
        let encoded = charset::encode_str(text, context.encoding);

        // fast path: nothing needs escaping, wrap and pass through
        if !needs_escaping(&encoded) {
            let mut out = Vec::with_capacity(encoded.len() + 2);
            out.push(b'\'');
            out.extend_from_slice(&encoded);
            out.push(b'\'');

            return out;
        }

        // escaping without backslashes: fall through to the binary-safe
        // hex path
        return hex_literal(&encoded, context.version.meets(4, 1, 0));
    }

    let mut escaped = String::with_capacity(text.len() + 8);
    escape::escape_str_into(text, ansi_quotes, &mut escaped);

    let encoded = charset::encode_str(&escaped, context.encoding);

    let mut out = Vec::with_capacity(encoded.len() + 2);
    out.push(b'\'');
    out.extend_from_slice(&encoded);
    out.push(b'\'');

    out
}

/// National strings go out as UTF-8 behind a `_utf8` introducer unless the
/// connection charset already is UTF-8.
fn encode_national_text(text: &str, context: &ConnectionContext) -> Vec<u8> {
    if context.encoding == encoding_rs::UTF_8 {
        return encode_text(text, context);
    }

    let no_backslash = context.sql_mode.contains(SqlMode::NO_BACKSLASH_ESCAPES);
    let ansi_quotes = context.sql_mode.contains(SqlMode::ANSI_QUOTES);

    if no_backslash && needs_escaping(text.as_bytes()) {
        // hex literals carry no charset ambiguity, so no introducer
        return hex_literal(text.as_bytes(), context.version.meets(4, 1, 0));
    }

    let mut escaped = String::with_capacity(text.len() + 8);

    if no_backslash {
        escaped.push_str(text);
    } else {
        escape::escape_str_into(text, ansi_quotes, &mut escaped);
    }

    let mut out = Vec::with_capacity(escaped.len() + 8);
    out.extend_from_slice(b"_utf8'");
    out.extend_from_slice(escaped.as_bytes());
    out.push(b'\'');

    out
}

/// Byte arrays escape like strings on single-byte connections, and fall
/// back to an unambiguous hex literal when the connection charset is
/// multibyte or backslash escapes are disabled.
fn encode_bytes(bytes: &[u8], context: &ConnectionContext) -> Vec<u8> {
    let no_backslash = context.sql_mode.contains(SqlMode::NO_BACKSLASH_ESCAPES);

    if context.multibyte || no_backslash {
        return hex_literal(bytes, context.version.meets(4, 1, 0));
    }

    let ansi_quotes = context.sql_mode.contains(SqlMode::ANSI_QUOTES);

    let mut out = Vec::with_capacity(bytes.len() + 8);
    out.push(b'\'');
    escape_bytes_into(bytes, ansi_quotes, &mut out);
    out.push(b'\'');

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{ConnectionContext, ServerVersion, SqlMode};

    fn context() -> ConnectionContext {
        ConnectionContext::new(ServerVersion::new(8, 0, 32), "latin1").unwrap()
    }

    #[test]
    fn escapes_obrien() -> anyhow::Result<()> {
        let encoded = BindValue::Text("O'Brien".into()).encode(&context())?;

        assert_eq!(encoded, b"'O\\'Brien'".to_vec());

        Ok(())
    }

    #[test]
    fn no_backslash_mode_uses_the_hex_path_when_needed() -> anyhow::Result<()> {
        let context = context().with_sql_mode(SqlMode::NO_BACKSLASH_ESCAPES);

        let clean = BindValue::Text("plain".into()).encode(&context)?;
        assert_eq!(clean, b"'plain'".to_vec());

        let dirty = BindValue::Text("O'Brien".into()).encode(&context)?;
        assert_eq!(dirty, b"x'4F27427269656E'".to_vec());

        Ok(())
    }

    #[test]
    fn ansi_quotes_leaves_double_quotes_unescaped() -> anyhow::Result<()> {
        let context = context().with_sql_mode(SqlMode::ANSI_QUOTES);

        let encoded = BindValue::Text(r#"a"b"#.into()).encode(&context)?;
        assert_eq!(encoded, b"'a\"b'".to_vec());

        let encoded = BindValue::Text(r#"a"b"#.into()).encode(&self::context())?;
        assert_eq!(encoded, b"'a\\\"b'".to_vec());

        Ok(())
    }

    #[test]
    fn bytes_hex_escape_on_multibyte_connections() -> anyhow::Result<()> {
        let multibyte = ConnectionContext::new(ServerVersion::new(8, 0, 32), "utf8")?;

        let encoded = BindValue::Bytes(b"\x00\xff".as_slice().into()).encode(&multibyte)?;
        assert_eq!(encoded, b"x'00FF'".to_vec());

        // single-byte connections escape instead
        let encoded = BindValue::Bytes(b"\x00\xff".as_slice().into()).encode(&context())?;
        assert_eq!(encoded, vec![b'\'', b'\\', b'0', 0xff, b'\'']);

        Ok(())
    }

    #[test]
    fn legacy_servers_get_the_0x_form() -> anyhow::Result<()> {
        let legacy = ConnectionContext::new(ServerVersion::new(4, 0, 18), "utf8")?;

        let encoded = BindValue::Bytes(b"\xab".as_slice().into()).encode(&legacy)?;
        assert_eq!(encoded, b"0xAB".to_vec());

        Ok(())
    }

    #[test]
    fn numeric_literals() -> anyhow::Result<()> {
        let context = context();

        assert_eq!(BindValue::Int(-42).encode(&context)?, b"-42".to_vec());
        assert_eq!(BindValue::UInt(u64::MAX).encode(&context)?, b"18446744073709551615".to_vec());
        assert_eq!(BindValue::Double(1.5).encode(&context)?, b"1.5".to_vec());
        assert_eq!(BindValue::Double(1e300).encode(&context)?, b"1E+300".to_vec());

        let decimal: BigDecimal = "123456.789".parse().unwrap();
        assert_eq!(BindValue::Decimal(decimal).encode(&context)?, b"123456.789".to_vec());

        Ok(())
    }

    #[test]
    fn nan_requires_the_permitting_option() {
        let strict = context();

        assert!(BindValue::Double(f64::NAN).encode(&strict).is_err());
        assert!(BindValue::Double(f64::INFINITY).encode(&strict).is_err());

        let permissive = strict.with_options(
            crate::options::MySqlOptions::default().allow_nan_and_infinity(true),
        );

        assert_eq!(BindValue::Double(f64::NAN).encode(&permissive).unwrap(), b"NaN".to_vec());
    }

    #[test]
    fn booleans_follow_the_server_version() -> anyhow::Result<()> {
        let modern = context();
        let ancient = ConnectionContext::new(ServerVersion::new(3, 21, 0), "latin1")?;

        assert_eq!(BindValue::Bool(true).encode(&modern)?, b"1".to_vec());
        assert_eq!(BindValue::Bool(false).encode(&modern)?, b"0".to_vec());
        assert_eq!(BindValue::Bool(true).encode(&ancient)?, b"'t'".to_vec());
        assert_eq!(BindValue::Bool(false).encode(&ancient)?, b"'f'".to_vec());

        Ok(())
    }

    #[test]
    fn national_text_gets_an_introducer() -> anyhow::Result<()> {
        let latin1 = context();
        let utf8 = ConnectionContext::new(ServerVersion::new(8, 0, 32), "utf8")?;

        let encoded = BindValue::NationalText("приве́т".into()).encode(&latin1)?;
        assert!(encoded.starts_with(b"_utf8'"));
        assert!(encoded.ends_with(b"'"));

        // already UTF-8: plain string path
        let encoded = BindValue::NationalText("hi".into()).encode(&utf8)?;
        assert_eq!(encoded, b"'hi'".to_vec());

        Ok(())
    }

    #[test]
    fn temporal_text_is_normalized() -> anyhow::Result<()> {
        let encoded = BindValue::TemporalText("2024-6-1 8:30".into()).encode(&context())?;

        assert_eq!(encoded, b"'2024-06-01 08:30:00'".to_vec());

        Ok(())
    }
}
