use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

use encoding_rs::Encoding;
use time::UtcOffset;

use crate::charset;
use crate::error::Error;
use crate::options::MySqlOptions;
use crate::query_result::MySqlQueryResult;

/// The server version triple, as negotiated during the handshake.
///
/// Parsed from the version banner (e.g. `8.0.32-log`); everything after
/// the patch number is ignored.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ServerVersion {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
}

impl ServerVersion {
    #[must_use]
    pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
        Self { major, minor, patch }
    }

    /// Does this version meet the given minimum?
    #[must_use]
    pub fn meets(&self, major: u16, minor: u16, patch: u16) -> bool {
        *self >= Self::new(major, minor, patch)
    }
}

impl FromStr for ServerVersion {
    type Err = Error;

    fn from_str(banner: &str) -> Result<Self, Error> {
        // take the numeric prefix of each dot-separated part; the patch
        // component often carries a suffix ("32-log", "5-10.4.13-MariaDB")
        let mut parts = banner.splitn(3, '.').map(|part| {
            let digits: &str = part.split(|c: char| !c.is_ascii_digit()).next().unwrap_or("");
            digits.parse::<u16>()
        });

        match (parts.next(), parts.next(), parts.next()) {
            (Some(Ok(major)), Some(Ok(minor)), Some(Ok(patch))) => {
                Ok(Self::new(major, minor, patch))
            }

            _ => Err(err_protocol!("invalid server version banner: {banner:?}")),
        }
    }
}

impl Display for ServerVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

bitflags::bitflags! {
    /// Subset of the server SQL modes that change how statement text and
    /// literals must be produced.
    ///
    /// <https://dev.mysql.com/doc/refman/8.0/en/sql-mode.html>
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
    pub struct SqlMode: u32 {
        /// Backslash is an ordinary character, not an escape introducer.
        const NO_BACKSLASH_ESCAPES = 1 << 0;

        /// Double quote delimits identifiers, not string literals.
        const ANSI_QUOTES = 1 << 1;
    }
}

/// Negotiated per-connection session state, consumed read-only by the
/// statement engine.
///
/// The connection itself (handshake, authentication, packet framing) is an
/// external collaborator; statements share this descriptor via [`Arc`].
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    pub(crate) version: ServerVersion,
    pub(crate) charset: String,
    pub(crate) encoding: &'static Encoding,
    pub(crate) multibyte: bool,
    pub(crate) quote_char: u8,
    pub(crate) sql_mode: SqlMode,
    pub(crate) max_allowed_packet: usize,
    pub(crate) read_only: bool,
    pub(crate) session_offset: UtcOffset,
    pub(crate) options: MySqlOptions,
}

impl ConnectionContext {
    /// Build a session descriptor for the given server version and
    /// negotiated server charset name.
    ///
    /// Fails if the charset does not resolve to a known host encoding.
    pub fn new(version: ServerVersion, server_charset: &str) -> Result<Self, Error> {
        let host = charset::host_encoding_for(server_charset, Some(&version)).ok_or_else(
            || Error::Configuration(format!("unsupported server charset: {server_charset:?}")),
        )?;

        Ok(Self {
            version,
            charset: server_charset.to_ascii_lowercase(),
            encoding: charset::encoding_for_label(host),
            multibyte: charset::is_multibyte(host),
            quote_char: b'`',
            sql_mode: SqlMode::empty(),
            max_allowed_packet: 4 * 1024 * 1024,
            read_only: false,
            session_offset: UtcOffset::UTC,
            options: MySqlOptions::default(),
        })
    }

    pub fn version(&self) -> &ServerVersion {
        &self.version
    }

    pub fn charset(&self) -> &str {
        &self.charset
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    pub fn sql_mode(&self) -> SqlMode {
        self.sql_mode
    }

    pub fn options(&self) -> &MySqlOptions {
        &self.options
    }

    pub fn max_allowed_packet(&self) -> usize {
        self.max_allowed_packet
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Replace the SQL mode flags (from a `SELECT @@sql_mode` round trip).
    #[must_use]
    pub fn with_sql_mode(mut self, sql_mode: SqlMode) -> Self {
        self.sql_mode = sql_mode;
        self
    }

    /// Replace the identifier quote character (`` ` `` by default, `"`
    /// when the server reports ANSI quoting).
    #[must_use]
    pub fn with_quote_char(mut self, quote_char: u8) -> Self {
        self.quote_char = quote_char;
        self
    }

    #[must_use]
    pub fn with_max_allowed_packet(mut self, max: usize) -> Self {
        self.max_allowed_packet = max;
        self
    }

    #[must_use]
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Replace the session time zone offset used for `TIMESTAMP` encoding.
    #[must_use]
    pub fn with_session_offset(mut self, offset: UtcOffset) -> Self {
        self.session_offset = offset;
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: MySqlOptions) -> Self {
        self.options = options;
        self
    }

    /// Finish a builder chain; statements hold the shared handle.
    #[must_use]
    pub fn share(self) -> Arc<Self> {
        Arc::new(self)
    }
}

/// The send-packet primitive: accepts one fully assembled statement byte
/// buffer and returns the server's execution result.
///
/// Taking `&mut self` is the connection-wide exclusion contract: two
/// statements cannot interleave bytes on one connection without an
/// explicit outer lock.
pub trait Executor {
    fn send_statement(&mut self, statement: &[u8]) -> Result<MySqlQueryResult, Error>;
}

impl<E: Executor + ?Sized> Executor for &mut E {
    fn send_statement(&mut self, statement: &[u8]) -> Result<MySqlQueryResult, Error> {
        (**self).send_statement(statement)
    }
}
