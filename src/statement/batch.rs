//! Batch execution: multi-value INSERT rewriting with a serial fallback.
//!
//! Rewriting folds many logically identical INSERT executions into fewer
//! multi-value statements sized to respect the session packet limit. It
//! only applies when every batch entry is parameter-bound, the statement
//! classifies as an INSERT, and its `VALUES (...)` tuple can be isolated;
//! anything else degrades to serial execution.

use std::sync::Arc;
use std::time::Instant;

use crate::arguments::{MySqlArguments, ParamSlot};
use crate::connection::{ConnectionContext, Executor};
use crate::error::{Error, Result, EXECUTE_FAILED, NOT_ATTEMPTED, SUCCESS_NO_INFO};
use crate::statement::parse::{find_values_clause, ParsedStatement, StatementKind};
use crate::statement::{assemble, MySqlStatement};

/// One queued batch execution: a snapshot of the binding table, or plain
/// SQL text for non-parameterized entries.
pub(crate) enum BatchEntry {
    Bindings(MySqlArguments),
    Sql(String),
}

impl MySqlStatement {
    /// Execute every queued batch entry, in insertion order, returning
    /// one update count per entry.
    ///
    /// The returned array always has one element per entry added since
    /// the last [`clear_batch`][MySqlStatement::clear_batch], whichever
    /// execution path was taken. Rewritten entries report
    /// [`SUCCESS_NO_INFO`], since the server returns one aggregate count
    /// per rewritten statement.
    pub fn execute_batch(&mut self, mut executor: impl Executor) -> Result<Vec<i64>> {
        self.check_read_only()?;

        let entries = std::mem::take(&mut self.batch);

        if entries.is_empty() {
            return Ok(Vec::new());
        }

        self.generated_keys.clear();

        let outcome = match self.rewrite_plan(&entries) {
            Some(plan) => self.execute_rewritten(entries, plan, &mut executor),
            None => self.execute_serially(entries, &mut executor),
        };

        // the binding table was reused for snapshots; leave it clean
        self.arguments.clear();

        outcome
    }

    /// Check the rewrite preconditions and extract the values-clause
    /// template. `None` means serial execution.
    fn rewrite_plan(&self, entries: &[BatchEntry]) -> Option<RewritePlan> {
        if !self.context.options.rewrite_batched_statements {
            return None;
        }

        if self.parsed.kind() != StatementKind::Insert {
            return None;
        }

        if entries.iter().any(|entry| matches!(entry, BatchEntry::Sql(_))) {
            tracing::debug!("batch mixes plain SQL entries; executing serially");
            return None;
        }

        let (start, end) = find_values_clause(self.parsed.sql(), &self.context)?;
        let clause = self.parsed.sql()[start..end].to_owned();

        // a clause holding fewer placeholders than the statement (e.g.
        // ON DUPLICATE KEY UPDATE with its own parameters) cannot be
        // rebound positionally
        let clause_parameters =
            ParsedStatement::parse(&clause, &self.context).ok()?.parameter_count();

        if clause_parameters != self.parsed.parameter_count() {
            tracing::debug!("placeholders outside the VALUES clause; executing serially");
            return None;
        }

        Some(RewritePlan { clause })
    }

    fn execute_rewritten(
        &mut self,
        mut entries: Vec<BatchEntry>,
        plan: RewritePlan,
        executor: &mut impl Executor,
    ) -> Result<Vec<i64>> {
        let context = Arc::clone(&self.context);
        let sql = self.parsed.sql();

        let sizes: Vec<&MySqlArguments> = entries
            .iter()
            .map(|entry| match entry {
                BatchEntry::Bindings(arguments) => arguments,
                BatchEntry::Sql(_) => unreachable!("checked by rewrite_plan"),
            })
            .collect();

        let cap = compute_batch_size(
            &sizes,
            plan.clause.len(),
            sql.len(),
            context.max_allowed_packet,
        );

        let total = entries.len();

        tracing::debug!(total, cap, "rewriting batched insert");

        let started = Instant::now();
        let mut done = 0;

        // the full-cap statement is parsed once and reused; only the
        // remainder needs a second parse
        let mut prepared: Option<(usize, Arc<ParsedStatement>)> = None;

        while done < total {
            let group = (total - done).min(cap);

            let rewritten = match &prepared {
                Some((size, statement)) if *size == group => Arc::clone(statement),
                _ => {
                    let statement = self.rewritten_statement(sql, &plan.clause, group)?;
                    prepared = Some((group, Arc::clone(&statement)));

                    statement
                }
            };
            let mut combined = MySqlArguments::new(rewritten.parameter_count());
            let mut position = 1;

            for entry in &mut entries[done..done + group] {
                let BatchEntry::Bindings(arguments) = entry else {
                    unreachable!("checked by rewrite_plan")
                };

                for slot in arguments.slots_mut() {
                    match std::mem::replace(slot, ParamSlot::Unset) {
                        ParamSlot::Unset => {
                            return Err(self.batch_error(
                                total,
                                done,
                                group,
                                Error::ParameterNotSet { index: position },
                            ));
                        }
                        ParamSlot::Null => combined.set_null(position)?,
                        ParamSlot::Value(bytes) => combined.set_value(position, bytes)?,
                        ParamSlot::Stream { source, declared_len, kind } => {
                            combined.set_stream(position, source, declared_len, kind)?;
                        }
                    }

                    position += 1;
                }
            }

            let outcome = assemble(&context, &rewritten, &mut combined)
                .and_then(|packet| executor.send_statement(&packet))
                .and_then(|result| match self.timeout {
                    Some(timeout) if started.elapsed() > timeout => Err(Error::Timeout),
                    _ => Ok(result),
                });

            match outcome {
                Ok(result) => {
                    if let Some(first_id) = result.inserted_id() {
                        self.generated_keys
                            .extend((0..group as u64).map(|offset| first_id + offset));
                    }
                }

                Err(error) => return Err(self.batch_error(total, done, group, error)),
            }

            done += group;
        }

        Ok(vec![SUCCESS_NO_INFO; total])
    }

    /// Original statement text plus `group - 1` comma-joined copies of
    /// the values clause.
    fn rewritten_statement(
        &self,
        sql: &str,
        clause: &str,
        group: usize,
    ) -> Result<Arc<ParsedStatement>> {
        if group == 1 {
            return Ok(Arc::clone(&self.parsed));
        }

        let mut rewritten = String::with_capacity(sql.len() + (clause.len() + 1) * (group - 1));
        rewritten.push_str(sql);

        for _ in 1..group {
            rewritten.push(',');
            rewritten.push_str(clause);
        }

        Ok(Arc::new(ParsedStatement::parse(&rewritten, &self.context)?))
    }

    fn batch_error(&self, total: usize, done: usize, group: usize, source: Error) -> Error {
        let mut update_counts = vec![SUCCESS_NO_INFO; done];
        update_counts.resize(done + group, EXECUTE_FAILED);
        update_counts.resize(total, NOT_ATTEMPTED);

        Error::Batch { update_counts, source: Box::new(source) }
    }

    fn execute_serially(
        &mut self,
        entries: Vec<BatchEntry>,
        executor: &mut impl Executor,
    ) -> Result<Vec<i64>> {
        let context = Arc::clone(&self.context);
        let parsed = Arc::clone(&self.parsed);
        let continue_on_error = context.options.continue_batch_on_error;

        let started = Instant::now();
        let mut update_counts = vec![NOT_ATTEMPTED; entries.len()];
        let mut first_error: Option<Error> = None;

        for (index, entry) in entries.into_iter().enumerate() {
            let outcome = match entry {
                BatchEntry::Sql(text) => ParsedStatement::parse(&text, &context)
                    .and_then(|parsed| {
                        let mut arguments = MySqlArguments::new(parsed.parameter_count());

                        assemble(&context, &parsed, &mut arguments)
                    })
                    .and_then(|packet| executor.send_statement(&packet)),

                BatchEntry::Bindings(mut arguments) => {
                    assemble(&context, &parsed, &mut arguments)
                        .and_then(|packet| executor.send_statement(&packet))
                }
            };

            let outcome = outcome.and_then(|result| match self.timeout {
                Some(timeout) if started.elapsed() > timeout => Err(Error::Timeout),
                _ => Ok(result),
            });

            match outcome {
                Ok(result) => {
                    update_counts[index] = result.rows_affected() as i64;
                    self.generated_keys.extend(result.inserted_id());
                }

                Err(error) => {
                    update_counts[index] = EXECUTE_FAILED;

                    if continue_on_error {
                        first_error.get_or_insert(error);
                    } else {
                        return Err(Error::Batch { update_counts, source: Box::new(error) });
                    }
                }
            }
        }

        match first_error {
            Some(error) => Err(Error::Batch { update_counts, source: Box::new(error) }),
            None => Ok(update_counts),
        }
    }
}

struct RewritePlan {
    clause: String,
}

/// Conservative per-statement entry cap.
///
/// Worst-case encoded sizes: value slots at their encoded length, streams
/// at declared length ×2 (escaping safety), NULLs at a fixed constant,
/// plus one copy of the values clause per entry. A stream of unknown
/// length is uncappable and forces single-entry statements. The computed
/// cap never admits a packet above `max_packet`.
pub(crate) fn compute_batch_size(
    entries: &[&MySqlArguments],
    clause_len: usize,
    statement_len: usize,
    max_packet: usize,
) -> usize {
    let mut total = 0_usize;
    let mut largest = 0_usize;

    for arguments in entries {
        let Some(size) = worst_case_entry_size(arguments) else {
            return 1;
        };

        let entry = size + clause_len + 1;

        largest = largest.max(entry);
        total += entry;
    }

    if statement_len + total <= max_packet {
        return entries.len();
    }

    let budget = max_packet.saturating_sub(statement_len);
    let cap = if largest == 0 { entries.len() } else { budget / largest };

    cap.clamp(1, entries.len())
}

fn worst_case_entry_size(arguments: &MySqlArguments) -> Option<usize> {
    const NULL_SIZE: usize = 4;

    let mut size = 0_usize;

    for slot in arguments.slots() {
        size += match slot {
            ParamSlot::Unset | ParamSlot::Null => NULL_SIZE,
            ParamSlot::Value(bytes) => bytes.len(),

            ParamSlot::Stream { declared_len: Some(len), .. } => {
                usize::try_from(*len).ok()?.checked_mul(2)? + 3
            }

            // unknown length: nothing safe to count
            ParamSlot::Stream { declared_len: None, .. } => return None,
        };
    }

    Some(size)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::compute_batch_size;
    use crate::arguments::{MySqlArguments, StreamKind};
    use crate::connection::{ConnectionContext, ServerVersion};
    use crate::error::{Error, EXECUTE_FAILED, NOT_ATTEMPTED, SUCCESS_NO_INFO};
    use crate::mock::{FailingExecutor, MockExecutor};
    use crate::options::MySqlOptions;
    use crate::query_result::MySqlQueryResult;
    use crate::statement::MySqlStatement;

    fn context(options: MySqlOptions) -> Arc<ConnectionContext> {
        ConnectionContext::new(ServerVersion::new(8, 0, 32), "latin1")
            .unwrap()
            .with_options(options)
            .share()
    }

    fn insert_batch(statement: &mut MySqlStatement, rows: &[(i32, &str)]) {
        for (a, b) in rows {
            statement.set_i32(1, *a).unwrap();
            statement.set_str(2, b).unwrap();
            statement.add_batch();
        }
    }

    #[test]
    fn serial_batch_reports_per_entry_counts() -> anyhow::Result<()> {
        let context = context(MySqlOptions::default());
        let mut statement =
            MySqlStatement::prepare(context, "INSERT INTO t (a,b) VALUES (?, ?)")?;
        let mut executor = MockExecutor::new();

        insert_batch(&mut statement, &[(1, "x"), (2, "y")]);

        let counts = statement.execute_batch(&mut executor)?;

        assert_eq!(counts.len(), 2);
        assert_eq!(executor.sent.len(), 2);
        assert_eq!(
            executor.sent_sql()[0],
            "INSERT INTO t (a,b) VALUES (1, 'x')"
        );

        Ok(())
    }

    #[test]
    fn rewritten_batch_folds_into_one_statement() -> anyhow::Result<()> {
        let context = context(MySqlOptions::default().rewrite_batched_statements(true));
        let mut statement =
            MySqlStatement::prepare(context, "INSERT INTO t (a,b) VALUES (?, ?)")?;
        let mut executor = MockExecutor::new();

        insert_batch(&mut statement, &[(1, "x"), (2, "y"), (3, "z")]);

        let counts = statement.execute_batch(&mut executor)?;

        assert_eq!(counts, vec![SUCCESS_NO_INFO; 3]);
        assert_eq!(
            executor.sent_sql(),
            vec!["INSERT INTO t (a,b) VALUES (1, 'x'),(2, 'y'),(3, 'z')".to_owned()]
        );

        Ok(())
    }

    #[test]
    fn packet_cap_splits_the_rewritten_batch() -> anyhow::Result<()> {
        let context = Arc::new(
            ConnectionContext::new(ServerVersion::new(8, 0, 32), "latin1")?
                .with_options(MySqlOptions::default().rewrite_batched_statements(true))
                .with_max_allowed_packet(40),
        );

        let mut statement = MySqlStatement::prepare(context, "INSERT INTO t VALUES (?)")?;
        let mut executor = MockExecutor::new();

        for i in 0..4 {
            statement.set_i32(1, i)?;
            statement.add_batch();
        }

        let counts = statement.execute_batch(&mut executor)?;

        assert_eq!(counts, vec![SUCCESS_NO_INFO; 4]);
        assert!(executor.sent.len() > 1, "expected the batch to split");

        for sql in executor.sent_sql() {
            assert!(sql.len() <= 40, "oversized packet: {sql}");
        }

        Ok(())
    }

    #[test]
    fn mixed_batch_falls_back_to_serial() -> anyhow::Result<()> {
        let context = context(MySqlOptions::default().rewrite_batched_statements(true));
        let mut statement =
            MySqlStatement::prepare(context, "INSERT INTO t (a,b) VALUES (?, ?)")?;
        let mut executor = MockExecutor::new();

        statement.set_i32(1, 1)?;
        statement.set_str(2, "x")?;
        statement.add_batch();
        statement.add_batch_sql("DELETE FROM t WHERE a = 9");

        let counts = statement.execute_batch(&mut executor)?;

        assert_eq!(counts.len(), 2);
        assert_eq!(executor.sent.len(), 2);
        assert_eq!(executor.sent_sql()[1], "DELETE FROM t WHERE a = 9");

        Ok(())
    }

    #[test]
    fn serial_failure_stops_and_carries_partial_counts() -> anyhow::Result<()> {
        let context = context(MySqlOptions::default());
        let mut statement =
            MySqlStatement::prepare(context, "INSERT INTO t (a,b) VALUES (?, ?)")?;

        insert_batch(&mut statement, &[(1, "x"), (2, "y"), (3, "z")]);

        let mut executor = MockExecutor::new();
        executor.push_result(Ok(MySqlQueryResult::new(1, 0))).push_result(Err(
            Error::Database { code: 1062, message: "Duplicate entry".into(), sql_state: None },
        ));

        let Err(Error::Batch { update_counts, .. }) = statement.execute_batch(&mut executor)
        else {
            panic!("expected a batch error");
        };

        assert_eq!(update_counts, vec![1, EXECUTE_FAILED, NOT_ATTEMPTED]);

        Ok(())
    }

    #[test]
    fn continue_on_error_reaches_every_entry() -> anyhow::Result<()> {
        let context = context(MySqlOptions::default().continue_batch_on_error(true));
        let mut statement =
            MySqlStatement::prepare(context, "INSERT INTO t (a,b) VALUES (?, ?)")?;

        insert_batch(&mut statement, &[(1, "x"), (2, "y")]);

        let Err(Error::Batch { update_counts, .. }) =
            statement.execute_batch(FailingExecutor)
        else {
            panic!("expected a batch error");
        };

        assert_eq!(update_counts, vec![EXECUTE_FAILED, EXECUTE_FAILED]);

        Ok(())
    }

    #[test]
    fn rewritten_batch_accumulates_generated_keys() -> anyhow::Result<()> {
        let context = context(MySqlOptions::default().rewrite_batched_statements(true));
        let mut statement =
            MySqlStatement::prepare(context, "INSERT INTO t (a,b) VALUES (?, ?)")?;

        insert_batch(&mut statement, &[(1, "x"), (2, "y"), (3, "z")]);

        let mut executor = MockExecutor::new();
        executor.push_result(Ok(MySqlQueryResult::new(3, 10)));

        statement.execute_batch(&mut executor)?;

        assert_eq!(statement.generated_keys(), &[10, 11, 12]);

        Ok(())
    }

    #[test]
    fn empty_batch_returns_an_empty_array() -> anyhow::Result<()> {
        let context = context(MySqlOptions::default());
        let mut statement = MySqlStatement::prepare(context, "INSERT INTO t VALUES (?)")?;

        assert_eq!(statement.execute_batch(MockExecutor::new())?, Vec::<i64>::new());

        Ok(())
    }

    #[test]
    fn size_cap_respects_the_packet_limit() {
        let mut a = MySqlArguments::new(1);
        let mut b = MySqlArguments::new(1);
        let mut c = MySqlArguments::new(1);

        a.set_value(1, vec![b'x'; 30]).unwrap();
        b.set_value(1, vec![b'y'; 30]).unwrap();
        c.set_value(1, vec![b'z'; 30]).unwrap();

        let entries = [&a, &b, &c];

        // everything fits
        assert_eq!(compute_batch_size(&entries, 3, 40, 4096), 3);

        // sum exceeds the limit: cap is strictly below the entry count
        // and at least one
        let cap = compute_batch_size(&entries, 3, 40, 100);
        assert!(cap >= 1 && cap < 3, "cap = {cap}");
    }

    #[test]
    fn unknown_stream_length_forces_single_entry_statements() {
        let mut a = MySqlArguments::new(1);

        a.set_stream(
            1,
            Box::new(std::io::Cursor::new(Vec::new())),
            None,
            StreamKind::Binary,
        )
        .unwrap();

        assert_eq!(compute_batch_size(&[&a], 3, 40, 4096), 1);
    }
}
