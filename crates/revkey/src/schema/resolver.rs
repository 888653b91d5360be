use crate::{Error, ForeignKey, Index, Result, SchemaObjectGraph, SequenceDescriptor, TableNode};

/// One object a DDL script creates or drops.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchemaObject<'a> {
    Sequence(&'a SequenceDescriptor),
    Table(&'a TableNode),
    Index {
        table: &'a TableNode,
        index: &'a Index,
    },
    ForeignKey {
        table: &'a TableNode,
        foreign_key: &'a ForeignKey,
    },
}

impl<'a> SchemaObject<'a> {
    /// The object's own name, unqualified.
    pub fn name(&self) -> &'a str {
        match *self {
            Self::Sequence(descriptor) => descriptor.name().name(),
            Self::Table(table) => &table.name,
            Self::Index { index, .. } => &index.name,
            Self::ForeignKey { foreign_key, .. } => &foreign_key.name,
        }
    }

    /// The table the object belongs to, if it is not a sequence.
    pub fn table(&self) -> Option<&'a TableNode> {
        match *self {
            Self::Sequence(_) => None,
            Self::Table(table) | Self::Index { table, .. } | Self::ForeignKey { table, .. } => {
                Some(table)
            }
        }
    }
}

/// Orders a [`SchemaObjectGraph`] for creation and for dropping.
///
/// Create order is: sequences, then tables with every interleaved parent
/// ahead of its children, then indexes, then foreign keys. Unrelated tables
/// keep declaration order. Drop order is the exact reverse, so foreign keys
/// go first, every index goes before any table, and children go before
/// their parents.
#[derive(Clone, Copy, Debug)]
pub struct DdlOrderingResolver<'a> {
    graph: &'a SchemaObjectGraph,
}

impl<'a> DdlOrderingResolver<'a> {
    /// Orders the objects of an already validated graph.
    pub const fn new(graph: &'a SchemaObjectGraph) -> Self {
        Self { graph }
    }

    /// Tables with every parent ahead of its interleaved children.
    ///
    /// Each table is emitted in declaration order, immediately preceded by
    /// any of its ancestors not yet emitted.
    ///
    /// # Errors
    /// Returns [`Error::SchemaIntegrity`] naming the tables involved if the
    /// interleaving loops back on itself.
    pub fn table_order(&self) -> Result<Vec<&'a TableNode>> {
        let tables = self.graph.tables();
        let mut emitted = vec![false; tables.len()];
        let mut order = Vec::with_capacity(tables.len());

        for start in 0..tables.len() {
            let mut pending = Vec::new();
            let mut cursor = Some(start);
            while let Some(idx) = cursor {
                if emitted[idx] {
                    break;
                }
                if pending.contains(&idx) {
                    return Err(Error::integrity(
                        pending.iter().map(|&i: &usize| tables[i].name.as_str()),
                        "interleaving contains a cycle",
                    ));
                }
                pending.push(idx);
                cursor = self.graph.parent_position(idx);
            }

            for idx in pending.into_iter().rev() {
                emitted[idx] = true;
                order.push(&tables[idx]);
            }
        }

        Ok(order)
    }

    /// Every object in creation order.
    ///
    /// # Errors
    /// See [`table_order`](Self::table_order).
    pub fn create_order(&self) -> Result<Vec<SchemaObject<'a>>> {
        let tables = self.table_order()?;
        let mut objects: Vec<_> = self
            .graph
            .sequences()
            .iter()
            .map(SchemaObject::Sequence)
            .collect();

        objects.extend(tables.iter().map(|&table| SchemaObject::Table(table)));
        objects.extend(tables.iter().flat_map(|&table| {
            table
                .indexes
                .iter()
                .map(move |index| SchemaObject::Index { table, index })
        }));
        objects.extend(tables.iter().flat_map(|&table| {
            table
                .foreign_keys
                .iter()
                .map(move |foreign_key| SchemaObject::ForeignKey { table, foreign_key })
        }));

        Ok(objects)
    }

    /// Every object in drop order.
    ///
    /// # Errors
    /// See [`table_order`](Self::table_order).
    pub fn drop_order(&self) -> Result<Vec<SchemaObject<'a>>> {
        let mut objects = self.create_order()?;
        objects.reverse();
        Ok(objects)
    }
}
