//! Chunked encoding of stream parameters.
//!
//! Stream sources are read through a fixed-size buffer and escaped (or
//! hex-formatted) chunk by chunk straight into the outbound statement
//! buffer, so a large value is never materialized twice.

use std::io::Read;

use crate::arguments::StreamKind;
use crate::charset;
use crate::connection::{ConnectionContext, SqlMode};
use crate::error::{Error, Result};

use super::escape::{escape_bytes_into, escape_str_into, hex_body, hex_close, hex_open};

pub(crate) const STREAM_BUFFER_SIZE: usize = 4096;

/// Drain a stream parameter into `out` as one quoted or hex literal.
///
/// A declared length bounds the read when `use_stream_lengths` is set;
/// otherwise the source is drained to end-of-stream.
pub(crate) fn encode_stream(
    source: &mut dyn Read,
    declared_len: Option<u64>,
    kind: StreamKind,
    context: &ConnectionContext,
    out: &mut Vec<u8>,
) -> Result<()> {
    let limit = declared_len.filter(|_| context.options.use_stream_lengths);

    match kind {
        StreamKind::Binary => encode_binary_stream(source, limit, context, out),
        StreamKind::Text => encode_text_stream(source, limit, context, out),
    }
}

fn encode_binary_stream(
    source: &mut dyn Read,
    limit: Option<u64>,
    context: &ConnectionContext,
    out: &mut Vec<u8>,
) -> Result<()> {
    let no_backslash = context.sql_mode.contains(SqlMode::NO_BACKSLASH_ESCAPES);
    let ansi_quotes = context.sql_mode.contains(SqlMode::ANSI_QUOTES);

    // byte-level escaping is unsound on multibyte connections
    let as_hex = context.multibyte || no_backslash;
    let modern = context.version.meets(4, 1, 0);

    if as_hex {
        hex_open(modern, out);
    } else {
        out.push(b'\'');
    }

    let mut buffer = [0_u8; STREAM_BUFFER_SIZE];
    let mut remaining = limit;

    loop {
        let want = match remaining {
            Some(0) => break,
            Some(n) => buffer.len().min(usize::try_from(n).unwrap_or(buffer.len())),
            None => buffer.len(),
        };

        let read = source.read(&mut buffer[..want]).map_err(Error::Io)?;

        if read == 0 {
            break;
        }

        if let Some(n) = remaining.as_mut() {
            *n -= read as u64;
        }

        if as_hex {
            hex_body(&buffer[..read], out);
        } else {
            escape_bytes_into(&buffer[..read], ansi_quotes, out);
        }
    }

    if as_hex {
        hex_close(modern, out);
    } else {
        out.push(b'\'');
    }

    Ok(())
}

fn encode_text_stream(
    source: &mut dyn Read,
    limit: Option<u64>,
    context: &ConnectionContext,
    out: &mut Vec<u8>,
) -> Result<()> {
    let no_backslash = context.sql_mode.contains(SqlMode::NO_BACKSLASH_ESCAPES);
    let ansi_quotes = context.sql_mode.contains(SqlMode::ANSI_QUOTES);
    let modern = context.version.meets(4, 1, 0);

    // character data arrives in the configured clob encoding (UTF-8 when
    // unset) and leaves in the connection charset
    let source_encoding = context
        .options
        .clob_character_encoding
        .as_deref()
        .map_or(encoding_rs::UTF_8, charset::encoding_for_label);

    let mut decoder = source_encoding.new_decoder();

    if no_backslash {
        hex_open(modern, out);
    } else {
        out.push(b'\'');
    }

    let mut buffer = [0_u8; STREAM_BUFFER_SIZE];
    let mut text = String::new();
    let mut escaped = String::new();
    let mut remaining = limit;

    loop {
        let want = match remaining {
            Some(0) => break,
            Some(n) => buffer.len().min(usize::try_from(n).unwrap_or(buffer.len())),
            None => buffer.len(),
        };

        let read = source.read(&mut buffer[..want]).map_err(Error::Io)?;

        if read == 0 {
            break;
        }

        if let Some(n) = remaining.as_mut() {
            *n -= read as u64;
        }

        decode_chunk(&mut decoder, &buffer[..read], false, &mut text);
        push_text_chunk(&text, no_backslash, ansi_quotes, context, &mut escaped, out);
        text.clear();
    }

    // flush any partial multibyte sequence held back by the decoder
    decode_chunk(&mut decoder, &[], true, &mut text);
    push_text_chunk(&text, no_backslash, ansi_quotes, context, &mut escaped, out);

    if no_backslash {
        hex_close(modern, out);
    } else {
        out.push(b'\'');
    }

    Ok(())
}

fn decode_chunk(
    decoder: &mut encoding_rs::Decoder,
    input: &[u8],
    last: bool,
    text: &mut String,
) {
    text.reserve(decoder.max_utf8_buffer_length(input.len()).unwrap_or(input.len() * 3) + 1);

    let (_, read, _) = decoder.decode_to_string(input, text, last);
    debug_assert_eq!(read, input.len());
}

fn push_text_chunk(
    text: &str,
    as_hex: bool,
    ansi_quotes: bool,
    context: &ConnectionContext,
    escaped: &mut String,
    out: &mut Vec<u8>,
) {
    if text.is_empty() {
        return;
    }

    if as_hex {
        hex_body(&charset::encode_str(text, context.encoding), out);
        return;
    }

    escaped.clear();
    escape_str_into(text, ansi_quotes, escaped);
    out.extend_from_slice(&charset::encode_str(escaped, context.encoding));
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::connection::{ConnectionContext, ServerVersion};

    fn context() -> ConnectionContext {
        ConnectionContext::new(ServerVersion::new(8, 0, 32), "latin1").unwrap()
    }

    #[test]
    fn binary_stream_is_escaped_and_quoted() -> anyhow::Result<()> {
        let mut out = Vec::new();
        let mut source = Cursor::new(b"it's".to_vec());

        encode_stream(&mut source, Some(4), StreamKind::Binary, &context(), &mut out)?;

        assert_eq!(out, b"'it\\'s'".to_vec());

        Ok(())
    }

    #[test]
    fn declared_length_truncates_the_read() -> anyhow::Result<()> {
        let mut out = Vec::new();
        let mut source = Cursor::new(b"abcdef".to_vec());

        encode_stream(&mut source, Some(3), StreamKind::Binary, &context(), &mut out)?;

        assert_eq!(out, b"'abc'".to_vec());

        Ok(())
    }

    #[test]
    fn unknown_length_drains_to_eof() -> anyhow::Result<()> {
        let mut out = Vec::new();
        let mut source = Cursor::new(b"abcdef".to_vec());

        encode_stream(&mut source, None, StreamKind::Binary, &context(), &mut out)?;

        assert_eq!(out, b"'abcdef'".to_vec());

        Ok(())
    }

    #[test]
    fn multibyte_connection_forces_hex() -> anyhow::Result<()> {
        let context = ConnectionContext::new(ServerVersion::new(8, 0, 32), "utf8")?;

        let mut out = Vec::new();
        let mut source = Cursor::new(b"\x00\x01".to_vec());

        encode_stream(&mut source, None, StreamKind::Binary, &context, &mut out)?;

        assert_eq!(out, b"x'0001'".to_vec());

        Ok(())
    }

    #[test]
    fn text_stream_transcodes_to_the_connection_charset() -> anyhow::Result<()> {
        // é arrives as UTF-8, leaves as one Latin-1 byte
        let mut out = Vec::new();
        let mut source = Cursor::new("caf\u{00e9}".as_bytes().to_vec());

        encode_stream(&mut source, None, StreamKind::Text, &context(), &mut out)?;

        assert_eq!(out, vec![b'\'', b'c', b'a', b'f', 0xe9, b'\'']);

        Ok(())
    }
}
