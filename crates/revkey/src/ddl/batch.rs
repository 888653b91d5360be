use core::num::NonZeroUsize;

use crate::Dialect;

/// Opens a DDL batch.
pub const START_BATCH_DDL: &str = "START BATCH DDL";

/// Submits the statements collected since the last [`START_BATCH_DDL`].
pub const RUN_BATCH: &str = "RUN BATCH";

/// The kind of script being framed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum BatchMode {
    /// A full create; always framed, even when empty.
    Create,
    /// A full drop; always framed, even when empty.
    Drop,
    /// Incremental changes only; nothing at all is emitted, not even the
    /// after-batch statements, when nothing changed.
    Update,
}

/// Wraps ordered statements in batch markers.
///
/// With a per-batch limit, the statements are split into consecutive
/// batches in their original order. Statements registered with
/// [`after_batch`](Self::after_batch) follow the final [`RUN_BATCH`]
/// unframed.
///
/// ```
/// use revkey::{BatchMode, DdlBatchEmitter, RUN_BATCH, START_BATCH_DDL};
///
/// let script = DdlBatchEmitter::new().emit(
///     BatchMode::Create,
///     vec!["create table A (Id INT64) PRIMARY KEY (Id)".to_owned()],
/// );
/// assert_eq!(script.first().map(String::as_str), Some(START_BATCH_DDL));
/// assert_eq!(script.last().map(String::as_str), Some(RUN_BATCH));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DdlBatchEmitter {
    framed: bool,
    max_statements_per_batch: Option<NonZeroUsize>,
    after_batch: Vec<String>,
}

impl Default for DdlBatchEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl DdlBatchEmitter {
    /// A framing emitter with no batch size limit.
    pub const fn new() -> Self {
        Self {
            framed: true,
            max_statements_per_batch: None,
            after_batch: Vec::new(),
        }
    }

    /// Frames only if the dialect supports batch DDL.
    pub fn for_dialect(dialect: &Dialect) -> Self {
        Self {
            framed: dialect.capabilities().batch_ddl,
            ..Self::new()
        }
    }

    /// Splits each script into batches of at most `max` statements.
    #[must_use]
    pub const fn with_max_statements_per_batch(mut self, max: NonZeroUsize) -> Self {
        self.max_statements_per_batch = Some(max);
        self
    }

    /// Appends statements that must run once the schema change has been
    /// applied, such as seed rows.
    #[must_use]
    pub fn after_batch<I, S>(mut self, statements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.after_batch
            .extend(statements.into_iter().map(Into::into));
        self
    }

    /// `None` means a single batch.
    pub fn max_statements_per_batch(&self) -> Option<NonZeroUsize> {
        self.max_statements_per_batch
    }

    pub(crate) fn without_after_batch(&self) -> Self {
        Self {
            after_batch: Vec::new(),
            ..self.clone()
        }
    }

    /// Frames `statements` for `mode`.
    pub fn emit(&self, mode: BatchMode, statements: Vec<String>) -> Vec<String> {
        if statements.is_empty() && mode == BatchMode::Update {
            return Vec::new();
        }
        if !self.framed {
            let mut script = statements;
            script.extend(self.after_batch.iter().cloned());
            return script;
        }

        let chunk = self
            .max_statements_per_batch
            .map_or(statements.len().max(1), NonZeroUsize::get);
        let batches = statements.len().div_ceil(chunk).max(1);
        let mut script = Vec::with_capacity(statements.len() + 2 * batches + self.after_batch.len());

        if statements.is_empty() {
            script.push(START_BATCH_DDL.to_owned());
            script.push(RUN_BATCH.to_owned());
        }
        for batch in statements.chunks(chunk) {
            script.push(START_BATCH_DDL.to_owned());
            script.extend(batch.iter().cloned());
            script.push(RUN_BATCH.to_owned());
        }
        script.extend(self.after_batch.iter().cloned());

        #[cfg(feature = "tracing")]
        tracing::debug!(?mode, statements = statements.len(), batches, "framed DDL script");

        script
    }
}
