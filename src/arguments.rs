use std::fmt::{self, Debug, Formatter};
use std::io::Read;

use crate::error::{Error, Result};

/// Whether a stream parameter carries raw bytes or character data that
/// must be transcoded to the connection charset.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StreamKind {
    Binary,
    Text,
}

/// One bound parameter.
///
/// `Value` bytes are fully pre-encoded (quoted, escaped, or hex-formatted)
/// by the value encoder; the table never re-escapes. `Null` carries the
/// literal `NULL` keyword so an accidentally consumed slot still produces
/// valid SQL.
pub(crate) enum ParamSlot {
    Unset,
    Null,
    Value(Vec<u8>),
    Stream {
        source: Box<dyn Read + Send>,
        declared_len: Option<u64>,
        kind: StreamKind,
    },
}

impl Debug for ParamSlot {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => f.write_str("Unset"),
            Self::Null => f.write_str("Null"),
            Self::Value(bytes) => f.debug_tuple("Value").field(&bytes.len()).finish(),
            Self::Stream { declared_len, kind, .. } => f
                .debug_struct("Stream")
                .field("declared_len", declared_len)
                .field("kind", kind)
                .finish(),
        }
    }
}

/// The fixed-size, 1-indexed parameter table of a prepared statement.
///
/// Slots are reused across executions; [`snapshot`][Self::snapshot] deep
/// copies them into an independent table when an execution is queued into
/// a batch.
#[derive(Debug)]
pub struct MySqlArguments {
    slots: Vec<ParamSlot>,
}

impl MySqlArguments {
    #[must_use]
    pub fn new(parameter_count: usize) -> Self {
        let mut slots = Vec::with_capacity(parameter_count);
        slots.resize_with(parameter_count, || ParamSlot::Unset);

        Self { slots }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Map a 1-based parameter index to the slot offset.
    fn check_index(&self, index: usize) -> Result<usize> {
        if index == 0 || index > self.slots.len() {
            return Err(Error::ParameterIndexOutOfBounds { index, count: self.slots.len() });
        }

        Ok(index - 1)
    }

    /// Store pre-encoded value bytes at the given 1-based index.
    pub fn set_value(&mut self, index: usize, bytes: Vec<u8>) -> Result<()> {
        let offset = self.check_index(index)?;
        self.slots[offset] = ParamSlot::Value(bytes);

        Ok(())
    }

    pub fn set_null(&mut self, index: usize) -> Result<()> {
        let offset = self.check_index(index)?;
        self.slots[offset] = ParamSlot::Null;

        Ok(())
    }

    pub fn set_stream(
        &mut self,
        index: usize,
        source: Box<dyn Read + Send>,
        declared_len: Option<u64>,
        kind: StreamKind,
    ) -> Result<()> {
        let offset = self.check_index(index)?;
        self.slots[offset] = ParamSlot::Stream { source, declared_len, kind };

        Ok(())
    }

    #[must_use = "check the null flag"]
    pub fn is_null(&self, index: usize) -> bool {
        index >= 1
            && index <= self.slots.len()
            && matches!(self.slots[index - 1], ParamSlot::Null)
    }

    /// Reset every slot in one pass. Required between logically unrelated
    /// executions and after a batch snapshot before the table is reused.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = ParamSlot::Unset;
        }
    }

    /// Produce an independent copy of the table for a batch entry.
    ///
    /// Value and null slots are deep-copied. A stream cannot be
    /// duplicated, so stream slots are *moved* into the snapshot and the
    /// live slot reverts to unset; streams must be bound fresh for each
    /// batch entry.
    #[must_use = "the snapshot is the batch entry"]
    pub fn snapshot(&mut self) -> Self {
        let slots = self
            .slots
            .iter_mut()
            .map(|slot| match slot {
                ParamSlot::Unset => ParamSlot::Unset,
                ParamSlot::Null => ParamSlot::Null,
                ParamSlot::Value(bytes) => ParamSlot::Value(bytes.clone()),
                ParamSlot::Stream { .. } => std::mem::replace(slot, ParamSlot::Unset),
            })
            .collect();

        Self { slots }
    }

    pub(crate) fn slots(&self) -> &[ParamSlot] {
        &self.slots
    }

    pub(crate) fn slots_mut(&mut self) -> &mut [ParamSlot] {
        &mut self.slots
    }

    /// First unset slot, as a 1-based index.
    pub(crate) fn first_unset(&self) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| matches!(slot, ParamSlot::Unset))
            .map(|offset| offset + 1)
    }
}
