use std::io;
use std::result::Result as StdResult;

/// A specialized `Result` type for this crate.
pub type Result<T> = StdResult<T, Error>;

/// Update-count sentinel: the entry executed successfully but the server
/// reported one aggregate count for a rewritten statement, so no per-entry
/// count is available.
pub const SUCCESS_NO_INFO: i64 = -2;

/// Update-count sentinel: the entry was attempted and failed.
pub const EXECUTE_FAILED: i64 = -3;

/// Update-count sentinel: execution stopped before reaching the entry.
pub const NOT_ATTEMPTED: i64 = -1;

/// Represents all the ways statement preparation, binding, or execution
/// can fail.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An unknown option name or a value that does not parse for the
    /// option's declared kind.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Parameter index outside `1..=parameter_count`.
    #[error("parameter index out of range: the index is {index}, but the statement has {count} parameter(s)")]
    ParameterIndexOutOfBounds { index: usize, count: usize },

    /// A parameter slot was never bound before execution.
    #[error("no value specified for parameter {index}")]
    ParameterNotSet { index: usize },

    /// A value could not be encoded for the wire (NaN without the
    /// permitting option, unsupported encoding, formatting failure).
    #[error("could not encode parameter value: {0}")]
    Encode(String),

    /// Statement text is not well formed (e.g. an unterminated quote).
    #[error("malformed statement: {0}")]
    Syntax(String),

    /// A free-form date/time string did not classify as any supported
    /// temporal pattern.
    #[error("cannot parse {0:?} as a date, time, or timestamp")]
    MalformedTemporal(String),

    /// Unexpected or invalid data encountered while talking to the server.
    #[error("encountered unexpected or invalid data: {0}")]
    Protocol(String),

    /// Error communicating with the server.
    #[error("error communicating with the server: {0}")]
    Io(#[from] io::Error),

    /// The assembled statement does not fit in one packet.
    #[error("statement of {size} bytes exceeds max_allowed_packet ({max})")]
    PacketTooLarge { size: usize, max: usize },

    /// A data-modifying statement was executed on a read-only session.
    #[error("connection is read-only; only statements that do not modify data are allowed")]
    ReadOnly,

    /// Execution exceeded the configured per-statement timeout.
    #[error("statement execution exceeded the configured timeout")]
    Timeout,

    /// Error returned from the database server.
    #[error("{code}: {message}")]
    Database {
        code: u16,
        message: String,
        sql_state: Option<String>,
    },

    /// Composite batch failure carrying the per-entry update counts
    /// accumulated before (and sentinels at and after) the failure point.
    #[error("batch execution failed: {source}")]
    Batch {
        update_counts: Vec<i64>,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    #[inline]
    pub(crate) fn encode(message: impl std::fmt::Display) -> Self {
        Error::Encode(message.to_string())
    }

    #[inline]
    pub(crate) fn syntax(message: impl std::fmt::Display) -> Self {
        Error::Syntax(message.to_string())
    }
}

// Format an error message as a `Protocol` error
macro_rules! err_protocol {
    ($expr:expr) => {
        $crate::error::Error::Protocol($expr.into())
    };

    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::Error::Protocol(format!($fmt, $($arg)*))
    };
}
