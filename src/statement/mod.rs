//! Client-side prepared statements over the text protocol.
//!
//! A statement owns one immutable parse result (possibly shared through
//! the statement cache), a parameter binding table, and its batch list.
//! At send time the static fragments and pre-encoded parameter bytes are
//! concatenated in placeholder order into the single buffer handed to the
//! connection, which is the only bit-exact wire contract in this crate.

pub(crate) mod batch;
mod parse;

use std::io::Read;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bigdecimal::BigDecimal;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};

pub use self::parse::{ParsedStatement, StatementKind};

use crate::arguments::{MySqlArguments, ParamSlot, StreamKind};
use crate::cache::StatementCache;
use crate::connection::{ConnectionContext, Executor};
use crate::encode::{self, BindValue};
use crate::error::{Error, Result};
use crate::query_result::MySqlQueryResult;

use self::batch::BatchEntry;

/// A prepared statement bound to one connection's session state.
pub struct MySqlStatement {
    context: Arc<ConnectionContext>,
    parsed: Arc<ParsedStatement>,
    arguments: MySqlArguments,
    batch: Vec<BatchEntry>,
    generated_keys: Vec<u64>,
    timeout: Option<Duration>,
}

impl MySqlStatement {
    /// Parse `sql` and prepare it against the given session.
    pub fn prepare(context: Arc<ConnectionContext>, sql: &str) -> Result<Self> {
        let parsed = Arc::new(ParsedStatement::parse(sql, &context)?);

        Ok(Self::from_parsed(context, parsed))
    }

    /// Prepare through the statement cache, reusing a previous parse of
    /// identical SQL text.
    pub fn prepare_cached(
        context: Arc<ConnectionContext>,
        cache: &mut StatementCache,
        sql: &str,
    ) -> Result<Self> {
        if let Some(parsed) = cache.get(sql) {
            return Ok(Self::from_parsed(context, parsed));
        }

        let parsed = Arc::new(ParsedStatement::parse(sql, &context)?);
        cache.put(sql.to_owned(), Arc::clone(&parsed));

        Ok(Self::from_parsed(context, parsed))
    }

    /// Adopt an already-parsed statement (shared read-only).
    #[must_use]
    pub fn from_parsed(context: Arc<ConnectionContext>, parsed: Arc<ParsedStatement>) -> Self {
        let arguments = MySqlArguments::new(parsed.parameter_count());

        Self {
            context,
            parsed,
            arguments,
            batch: Vec::new(),
            generated_keys: Vec::new(),
            timeout: None,
        }
    }

    #[must_use]
    pub fn parsed(&self) -> &ParsedStatement {
        &self.parsed
    }

    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.parsed.parameter_count()
    }

    /// Per-statement execution timeout. Cancellation is best-effort: the
    /// execute call fails with [`Error::Timeout`] once the deadline has
    /// passed, even if the network call itself returned normally.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    // --- parameter setters ------------------------------------------------

    /// Bind any supported value; the single entry point the typed setters
    /// forward to.
    pub fn set_bind_value(&mut self, index: usize, value: &BindValue<'_>) -> Result<()> {
        let encoded = value.encode(&self.context)?;

        self.arguments.set_value(index, encoded)
    }

    pub fn set_null(&mut self, index: usize) -> Result<()> {
        self.arguments.set_null(index)
    }

    pub fn set_bool(&mut self, index: usize, value: bool) -> Result<()> {
        self.set_bind_value(index, &BindValue::Bool(value))
    }

    pub fn set_i8(&mut self, index: usize, value: i8) -> Result<()> {
        self.set_bind_value(index, &BindValue::TinyInt(value))
    }

    pub fn set_i16(&mut self, index: usize, value: i16) -> Result<()> {
        self.set_bind_value(index, &BindValue::SmallInt(value))
    }

    pub fn set_i32(&mut self, index: usize, value: i32) -> Result<()> {
        self.set_bind_value(index, &BindValue::Int(value))
    }

    pub fn set_i64(&mut self, index: usize, value: i64) -> Result<()> {
        self.set_bind_value(index, &BindValue::BigInt(value))
    }

    pub fn set_u64(&mut self, index: usize, value: u64) -> Result<()> {
        self.set_bind_value(index, &BindValue::UInt(value))
    }

    pub fn set_f32(&mut self, index: usize, value: f32) -> Result<()> {
        self.set_bind_value(index, &BindValue::Float(value))
    }

    pub fn set_f64(&mut self, index: usize, value: f64) -> Result<()> {
        self.set_bind_value(index, &BindValue::Double(value))
    }

    pub fn set_decimal(&mut self, index: usize, value: &BigDecimal) -> Result<()> {
        self.set_bind_value(index, &BindValue::Decimal(value.clone()))
    }

    pub fn set_str(&mut self, index: usize, value: &str) -> Result<()> {
        self.set_bind_value(index, &BindValue::Text(value.into()))
    }

    pub fn set_national_str(&mut self, index: usize, value: &str) -> Result<()> {
        self.set_bind_value(index, &BindValue::NationalText(value.into()))
    }

    pub fn set_bytes(&mut self, index: usize, value: &[u8]) -> Result<()> {
        self.set_bind_value(index, &BindValue::Bytes(value.into()))
    }

    pub fn set_date(&mut self, index: usize, value: Date) -> Result<()> {
        self.set_bind_value(index, &BindValue::Date(value))
    }

    pub fn set_time(&mut self, index: usize, value: Time) -> Result<()> {
        self.set_bind_value(index, &BindValue::Time(value))
    }

    pub fn set_datetime(&mut self, index: usize, value: PrimitiveDateTime) -> Result<()> {
        self.set_bind_value(index, &BindValue::DateTime(value))
    }

    pub fn set_timestamp(&mut self, index: usize, value: OffsetDateTime) -> Result<()> {
        self.set_bind_value(index, &BindValue::Timestamp(value))
    }

    /// Bind a free-form date/time string; the pattern is inferred from
    /// the digit-run shape of the text.
    pub fn set_temporal_text(&mut self, index: usize, value: &str) -> Result<()> {
        self.set_bind_value(index, &BindValue::TemporalText(value.into()))
    }

    /// Bind pre-serialized opaque bytes (sent through the binary path).
    pub fn set_serialized(&mut self, index: usize, value: &[u8]) -> Result<()> {
        self.set_bind_value(index, &BindValue::Serialized(value.into()))
    }

    /// Bind a raw byte stream. `declared_len` of `None` drains the source
    /// to end-of-stream at send time.
    pub fn set_binary_stream(
        &mut self,
        index: usize,
        source: impl Read + Send + 'static,
        declared_len: Option<u64>,
    ) -> Result<()> {
        self.arguments.set_stream(index, Box::new(source), declared_len, StreamKind::Binary)
    }

    /// Bind a character stream, decoded per the clob encoding option
    /// (UTF-8 by default) and transcoded to the connection charset.
    pub fn set_text_stream(
        &mut self,
        index: usize,
        source: impl Read + Send + 'static,
        declared_len: Option<u64>,
    ) -> Result<()> {
        self.arguments.set_stream(index, Box::new(source), declared_len, StreamKind::Text)
    }

    #[must_use]
    pub fn is_null(&self, index: usize) -> bool {
        self.arguments.is_null(index)
    }

    /// Reset every parameter slot. Required between logically unrelated
    /// executions of the same statement object.
    pub fn clear_parameters(&mut self) {
        self.arguments.clear();
    }

    // --- execution --------------------------------------------------------

    /// Assemble and send the statement, returning the server's result.
    pub fn execute(&mut self, mut executor: impl Executor) -> Result<MySqlQueryResult> {
        self.check_read_only()?;

        let packet = assemble(&self.context, &self.parsed, &mut self.arguments)?;
        let started = Instant::now();

        tracing::debug!(bytes = packet.len(), "executing statement");

        let outcome = executor.send_statement(&packet);

        // best-effort cancellation: the deadline wins even when the
        // network call itself came back
        if let Some(timeout) = self.timeout {
            if started.elapsed() > timeout {
                return Err(Error::Timeout);
            }
        }

        let result = outcome?;

        self.generated_keys.clear();
        self.generated_keys.extend(result.inserted_id());

        Ok(result)
    }

    /// Execute and return only the affected-row count.
    pub fn execute_update(&mut self, executor: impl Executor) -> Result<u64> {
        self.execute(executor).map(|result| result.rows_affected())
    }

    pub(crate) fn check_read_only(&self) -> Result<()> {
        // only plain queries (and SET/SHOW/EXPLAIN) pass a read-only
        // session; everything else is presumed to modify data
        if self.context.read_only && !matches!(self.parsed.first_char(), 'S' | 'E') {
            return Err(Error::ReadOnly);
        }

        Ok(())
    }

    /// Keys generated by the last (batch or single) execution, in entry
    /// order.
    #[must_use]
    pub fn generated_keys(&self) -> &[u64] {
        &self.generated_keys
    }

    // --- batching ---------------------------------------------------------

    /// Snapshot the current parameter bindings as the next batch entry.
    pub fn add_batch(&mut self) {
        let snapshot = self.arguments.snapshot();
        self.batch.push(BatchEntry::Bindings(snapshot));
    }

    /// Queue a plain SQL statement in the batch (forces serial
    /// execution).
    pub fn add_batch_sql(&mut self, sql: impl Into<String>) {
        self.batch.push(BatchEntry::Sql(sql.into()));
    }

    pub fn clear_batch(&mut self) {
        self.batch.clear();
    }

    #[must_use]
    pub fn batch_len(&self) -> usize {
        self.batch.len()
    }

    // --- diagnostics ------------------------------------------------------

    /// Render the statement with current bindings substituted, for
    /// logging and debugging. Unbound and stream parameters show marker
    /// text instead of failing.
    #[must_use]
    pub fn as_sql(&self) -> String {
        let decode =
            |bytes: &[u8]| -> String { self.context.encoding.decode(bytes).0.into_owned() };

        let mut out = String::with_capacity(self.parsed.statement_length() + 16);

        for (i, fragment) in self.parsed.fragments.iter().enumerate() {
            out.push_str(&decode(fragment));

            if i < self.parsed.parameter_count() {
                match &self.arguments.slots()[i] {
                    ParamSlot::Unset => out.push_str("** NOT SPECIFIED **"),
                    ParamSlot::Null => out.push_str("NULL"),
                    ParamSlot::Value(bytes) => out.push_str(&decode(bytes)),
                    ParamSlot::Stream { .. } => out.push_str("** STREAM DATA **"),
                }
            }
        }

        out
    }
}

/// Concatenate fragments and bound parameters, in ascending placeholder
/// order, into one executable statement buffer.
///
/// Stream slots are drained (and consumed) during assembly; an unset slot
/// raises [`Error::ParameterNotSet`] with its 1-based index. The result is
/// checked against the session packet limit before any I/O happens.
pub(crate) fn assemble(
    context: &ConnectionContext,
    parsed: &ParsedStatement,
    arguments: &mut MySqlArguments,
) -> Result<Vec<u8>> {
    let parameter_count = parsed.parameter_count();

    debug_assert_eq!(parameter_count, arguments.len());

    let mut out = Vec::with_capacity(parsed.statement_length() + 32);

    for index in 0..parameter_count {
        out.extend_from_slice(&parsed.fragments[index]);

        let slot = &mut arguments.slots_mut()[index];

        match slot {
            ParamSlot::Unset => return Err(Error::ParameterNotSet { index: index + 1 }),
            ParamSlot::Null => out.extend_from_slice(b"NULL"),
            ParamSlot::Value(bytes) => out.extend_from_slice(bytes),

            ParamSlot::Stream { .. } => {
                let ParamSlot::Stream { mut source, declared_len, kind } =
                    std::mem::replace(slot, ParamSlot::Unset)
                else {
                    unreachable!()
                };

                encode::encode_stream(&mut *source, declared_len, kind, context, &mut out)?;
            }
        }
    }

    out.extend_from_slice(&parsed.fragments[parameter_count]);

    if out.len() > context.max_allowed_packet {
        return Err(Error::PacketTooLarge {
            size: out.len(),
            max: context.max_allowed_packet,
        });
    }

    Ok(out)
}
