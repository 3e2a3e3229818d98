use std::fmt::{self, Debug, Formatter};

/// Represents the execution result of one statement on the server.
///
/// Produced by the connection's [`Executor`][crate::Executor]
/// implementation from the server's OK packet.
#[derive(Default, Clone)]
pub struct MySqlQueryResult {
    pub(crate) rows_affected: u64,
    pub(crate) last_insert_id: u64,
    pub(crate) warnings: u16,
}

impl MySqlQueryResult {
    #[must_use]
    pub fn new(rows_affected: u64, last_insert_id: u64) -> Self {
        Self { rows_affected, last_insert_id, warnings: 0 }
    }

    #[must_use]
    pub fn with_warnings(mut self, warnings: u16) -> Self {
        self.warnings = warnings;
        self
    }

    /// Returns the number of rows changed, deleted, or inserted by the
    /// statement if it was an `UPDATE`, `DELETE` or `INSERT`.
    #[doc(alias = "affected_rows")]
    #[must_use]
    pub const fn rows_affected(&self) -> u64 {
        self.rows_affected
    }

    /// Returns the integer generated for an `AUTO_INCREMENT` column by an
    /// `INSERT` statement.
    ///
    /// When inserting multiple rows, this is the id of the _first_ row in
    /// the set of inserted rows.
    #[must_use]
    pub const fn inserted_id(&self) -> Option<u64> {
        // NOTE: a valid ID is never zero
        if self.last_insert_id == 0 { None } else { Some(self.last_insert_id) }
    }

    /// Returns the number of errors, warnings, and notes generated during
    /// execution of the statement.
    #[must_use]
    pub const fn warnings(&self) -> u16 {
        self.warnings
    }
}

impl Debug for MySqlQueryResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("MySqlQueryResult")
            .field("rows_affected", &self.rows_affected())
            .field("inserted_id", &self.inserted_id())
            .field("warnings", &self.warnings())
            .finish()
    }
}
