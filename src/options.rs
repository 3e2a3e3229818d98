use crate::error::Error;

/// Engine configuration consumed read-only at bind and execute time.
///
/// Every option is enumerated in [`OPTION_SCHEMA`]; [`MySqlOptions::set`]
/// applies a string-valued option by name, which is how the surrounding
/// connection layer forwards `key=value` configuration.
#[derive(Debug, Clone)]
pub struct MySqlOptions {
    pub(crate) allow_nan_and_infinity: bool,
    pub(crate) use_stream_lengths: bool,
    pub(crate) continue_batch_on_error: bool,
    pub(crate) rewrite_batched_statements: bool,
    pub(crate) auto_close_streams: bool,
    pub(crate) clob_character_encoding: Option<String>,
    pub(crate) statement_cache_capacity: usize,
}

impl Default for MySqlOptions {
    fn default() -> Self {
        Self {
            allow_nan_and_infinity: false,
            use_stream_lengths: true,
            continue_batch_on_error: false,
            rewrite_batched_statements: false,
            auto_close_streams: false,
            clob_character_encoding: None,
            statement_cache_capacity: 25,
        }
    }
}

impl MySqlOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Permit binding `NaN` and `±Infinity` floats as bare literals.
    #[must_use]
    pub fn allow_nan_and_infinity(mut self, on: bool) -> Self {
        self.allow_nan_and_infinity = on;
        self
    }

    /// Honor declared stream lengths instead of draining to end-of-stream.
    #[must_use]
    pub fn use_stream_lengths(mut self, on: bool) -> Self {
        self.use_stream_lengths = on;
        self
    }

    /// Keep executing remaining batch entries after one fails.
    #[must_use]
    pub fn continue_batch_on_error(mut self, on: bool) -> Self {
        self.continue_batch_on_error = on;
        self
    }

    /// Fold batched INSERT executions into multi-value statements.
    #[must_use]
    pub fn rewrite_batched_statements(mut self, on: bool) -> Self {
        self.rewrite_batched_statements = on;
        self
    }

    /// Drop parameter streams as soon as they have been sent.
    #[must_use]
    pub fn auto_close_streams(mut self, on: bool) -> Self {
        self.auto_close_streams = on;
        self
    }

    /// Source encoding for character streams, overriding UTF-8.
    #[must_use]
    pub fn clob_character_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.clob_character_encoding = Some(encoding.into());
        self
    }

    /// Number of parsed statements retained per connection.
    #[must_use]
    pub fn statement_cache_capacity(mut self, capacity: usize) -> Self {
        self.statement_cache_capacity = capacity;
        self
    }

    /// Apply a string-valued option by schema name.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), Error> {
        match name {
            "allowNanAndInf" => self.allow_nan_and_infinity = parse_bool(name, value)?,
            "useStreamLengthsInPrepStmts" => self.use_stream_lengths = parse_bool(name, value)?,
            "continueBatchOnError" => self.continue_batch_on_error = parse_bool(name, value)?,
            "rewriteBatchedStatements" => {
                self.rewrite_batched_statements = parse_bool(name, value)?;
            }
            "autoClosePStmtStreams" => self.auto_close_streams = parse_bool(name, value)?,
            "clobCharacterEncoding" => self.clob_character_encoding = Some(value.to_owned()),
            "prepStmtCacheSize" => {
                self.statement_cache_capacity = value.parse().map_err(|_| {
                    Error::Configuration(format!("option {name:?} expects an integer, got {value:?}"))
                })?;
            }

            _ => {
                return Err(Error::Configuration(format!("unknown option: {name:?}")));
            }
        }

        Ok(())
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool, Error> {
    match value {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),

        _ => Err(Error::Configuration(format!(
            "option {name:?} expects a boolean, got {value:?}"
        ))),
    }
}

/// The value kind an option accepts.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OptionKind {
    Bool,
    Int,
    Str,
}

/// One entry of the enumerated configuration schema.
#[derive(Debug, Copy, Clone)]
pub struct OptionDescriptor {
    pub name: &'static str,
    pub kind: OptionKind,
    pub default: &'static str,
    pub description: &'static str,
}

/// Every option the engine understands, as an explicit table.
pub static OPTION_SCHEMA: &[OptionDescriptor] = &[
    OptionDescriptor {
        name: "allowNanAndInf",
        kind: OptionKind::Bool,
        default: "false",
        description: "Permit binding NaN and infinite floating-point values",
    },
    OptionDescriptor {
        name: "useStreamLengthsInPrepStmts",
        kind: OptionKind::Bool,
        default: "true",
        description: "Honor declared stream lengths when sending stream parameters",
    },
    OptionDescriptor {
        name: "continueBatchOnError",
        kind: OptionKind::Bool,
        default: "false",
        description: "Keep executing remaining batch entries after a failure",
    },
    OptionDescriptor {
        name: "rewriteBatchedStatements",
        kind: OptionKind::Bool,
        default: "false",
        description: "Fold batched INSERTs into multi-value statements",
    },
    OptionDescriptor {
        name: "autoClosePStmtStreams",
        kind: OptionKind::Bool,
        default: "false",
        description: "Drop parameter streams as soon as they have been sent",
    },
    OptionDescriptor {
        name: "clobCharacterEncoding",
        kind: OptionKind::Str,
        default: "",
        description: "Source encoding for character streams (UTF-8 when unset)",
    },
    OptionDescriptor {
        name: "prepStmtCacheSize",
        kind: OptionKind::Int,
        default: "25",
        description: "Number of parsed statements retained per connection",
    },
];

/// Look up a schema entry by name.
#[must_use]
pub fn option_descriptor(name: &str) -> Option<&'static OptionDescriptor> {
    OPTION_SCHEMA.iter().find(|descriptor| descriptor.name == name)
}
