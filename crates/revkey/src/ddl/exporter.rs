use core::num::NonZeroUsize;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    BatchMode, DdlBatchEmitter, DdlOrderingResolver, Dialect, ExistingSchema, Result,
    SchemaObject, SchemaObjectGraph, StatementRenderer,
};

/// Produces complete, framed DDL scripts from a [`SchemaObjectGraph`].
///
/// Every statement is rendered before any framing is applied, so an error
/// means no script at all rather than a partial one.
///
/// ```
/// use revkey::{Column, Dialect, SchemaExporter, SchemaObjectGraph, TableNode};
///
/// let graph = SchemaObjectGraph::new(vec![
///     TableNode::new("Singers")
///         .column(Column::new("SingerId", "INT64").not_null())
///         .primary_key(["SingerId"]),
/// ])
/// .unwrap();
///
/// let script = SchemaExporter::new(Dialect::google_sql())
///     .generate_create_script(&graph)
///     .unwrap();
/// assert_eq!(
///     script,
///     [
///         "START BATCH DDL",
///         "create table Singers (SingerId INT64 not null) PRIMARY KEY (SingerId)",
///         "RUN BATCH",
///     ]
/// );
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SchemaExporter {
    renderer: StatementRenderer,
    emitter: DdlBatchEmitter,
}

impl SchemaExporter {
    /// An exporter with one batch per script and no follow-up statements.
    pub fn new(dialect: Dialect) -> Self {
        Self {
            renderer: StatementRenderer::new(dialect),
            emitter: DdlBatchEmitter::for_dialect(&dialect),
        }
    }

    /// Replaces the batch emitter wholesale.
    #[must_use]
    pub fn with_emitter(mut self, emitter: DdlBatchEmitter) -> Self {
        self.emitter = emitter;
        self
    }

    /// Splits each script into batches of at most `max` statements.
    #[must_use]
    pub fn with_max_statements_per_batch(mut self, max: NonZeroUsize) -> Self {
        self.emitter = self.emitter.with_max_statements_per_batch(max);
        self
    }

    /// Statements to run after a create or update, e.g. seed rows. Drop
    /// scripts never carry them.
    #[must_use]
    pub fn with_after_batch<I, S>(mut self, statements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.emitter = self.emitter.after_batch(statements);
        self
    }

    /// The renderer producing the individual statements.
    pub fn renderer(&self) -> &StatementRenderer {
        &self.renderer
    }

    /// Creates every sequence, table, index and foreign key.
    ///
    /// # Errors
    /// - [`Error::SchemaIntegrity`] if the interleaving has a cycle.
    /// - [`Error::UnsupportedDdlOperation`] if the schema declares foreign
    ///   keys the dialect cannot express.
    ///
    /// [`Error::SchemaIntegrity`]: crate::Error::SchemaIntegrity
    /// [`Error::UnsupportedDdlOperation`]: crate::Error::UnsupportedDdlOperation
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all))]
    pub fn generate_create_script(&self, graph: &SchemaObjectGraph) -> Result<Vec<String>> {
        let statements = DdlOrderingResolver::new(graph)
            .create_order()?
            .into_iter()
            .map(|object| self.renderer.create_statement(graph, object))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.finish(BatchMode::Create, statements))
    }

    /// Drops every object the graph declares.
    ///
    /// # Errors
    /// Returns [`Error::SchemaIntegrity`] if the interleaving has a cycle.
    ///
    /// [`Error::SchemaIntegrity`]: crate::Error::SchemaIntegrity
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all))]
    pub fn generate_drop_script(&self, graph: &SchemaObjectGraph) -> Result<Vec<String>> {
        let statements = self.drop_statements(graph, None)?;
        Ok(self.finish(BatchMode::Drop, statements))
    }

    /// Drops only the declared objects that `existing` reports as present.
    ///
    /// # Errors
    /// Returns [`Error::SchemaIntegrity`] if the interleaving has a cycle.
    ///
    /// [`Error::SchemaIntegrity`]: crate::Error::SchemaIntegrity
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all))]
    pub fn generate_drop_script_for(
        &self,
        graph: &SchemaObjectGraph,
        existing: &ExistingSchema,
    ) -> Result<Vec<String>> {
        let statements = self.drop_statements(graph, Some(existing))?;
        Ok(self.finish(BatchMode::Drop, statements))
    }

    /// Creates what `existing` lacks: sequences, tables, columns on existing
    /// tables, indexes and foreign keys. Nothing is dropped, and an empty
    /// diff yields an empty script.
    ///
    /// # Errors
    /// - [`Error::SchemaIntegrity`] if the interleaving has a cycle.
    /// - [`Error::UnsupportedDdlOperation`] if an existing table's primary
    ///   key differs from the declared one, or a missing foreign key cannot
    ///   be expressed.
    ///
    /// [`Error::SchemaIntegrity`]: crate::Error::SchemaIntegrity
    /// [`Error::UnsupportedDdlOperation`]: crate::Error::UnsupportedDdlOperation
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all))]
    pub fn generate_update_script(
        &self,
        graph: &SchemaObjectGraph,
        existing: &ExistingSchema,
    ) -> Result<Vec<String>> {
        let mut statements = Vec::new();
        for object in DdlOrderingResolver::new(graph).create_order()? {
            match object {
                SchemaObject::Table(table) if existing.has_table(&table.name) => {
                    let current_key = existing
                        .table(&table.name)
                        .and_then(|t| t.primary_key.as_deref());
                    if current_key.is_some_and(|key| key != graph.key_columns(&table.name)) {
                        self.renderer
                            .dialect()
                            .ensure_alter_primary_key(&table.name)?;
                    }
                    statements.extend(
                        graph
                            .columns(&table.name)
                            .filter(|column| !existing.has_column(&table.name, &column.name))
                            .map(|column| self.renderer.add_column(table, column)),
                    );
                }
                object if !exists(existing, object) => {
                    statements.push(self.renderer.create_statement(graph, object)?);
                }
                _ => {}
            }
        }
        Ok(self.finish(BatchMode::Update, statements))
    }

    /// Drops what exists, then creates everything, as two framed scripts.
    ///
    /// Statements registered with
    /// [`with_after_batch`](Self::with_after_batch) follow the create part.
    ///
    /// # Errors
    /// See [`generate_create_script`](Self::generate_create_script).
    pub fn generate_recreate_script(
        &self,
        graph: &SchemaObjectGraph,
        existing: &ExistingSchema,
    ) -> Result<Vec<String>> {
        let create = self.generate_create_script(graph)?;
        let drop = self.finish(BatchMode::Drop, self.drop_statements(graph, Some(existing))?);
        Ok(drop.into_iter().chain(create).collect())
    }

    fn drop_statements(
        &self,
        graph: &SchemaObjectGraph,
        existing: Option<&ExistingSchema>,
    ) -> Result<Vec<String>> {
        Ok(DdlOrderingResolver::new(graph)
            .drop_order()?
            .into_iter()
            .filter(|&object| existing.is_none_or(|existing| exists(existing, object)))
            .map(|object| self.renderer.drop_statement(object))
            .collect())
    }

    fn finish(&self, mode: BatchMode, statements: Vec<String>) -> Vec<String> {
        #[cfg(feature = "tracing")]
        tracing::info!(?mode, statements = statements.len(), "generated DDL script");
        match mode {
            BatchMode::Drop => self.emitter.without_after_batch().emit(mode, statements),
            BatchMode::Create | BatchMode::Update => self.emitter.emit(mode, statements),
        }
    }
}

fn exists(existing: &ExistingSchema, object: SchemaObject<'_>) -> bool {
    match object {
        SchemaObject::Sequence(descriptor) => {
            existing.has_sequence(&descriptor.name().to_string())
        }
        SchemaObject::Table(table) => existing.has_table(&table.name),
        SchemaObject::Index { table, index } => existing.has_index(&table.name, &index.name),
        SchemaObject::ForeignKey { table, foreign_key } => {
            existing.has_foreign_key(&table.name, &foreign_key.name)
        }
    }
}
