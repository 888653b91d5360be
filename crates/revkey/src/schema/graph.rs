use std::collections::{HashMap, HashSet};

use crate::{Column, Error, Result, SequenceDescriptor, TableNode};

/// A validated snapshot of every declared table and sequence.
///
/// Building the graph checks that interleaving forms a forest whose parents
/// are all present, that foreign keys point at declared tables, and that
/// index names are unique. It also resolves each table's full key: the key
/// columns of every interleaved ancestor, root first, followed by the
/// table's own. Ancestor key columns a child does not redeclare are carried
/// over with the ancestor's definition.
///
/// ```
/// use revkey::{Column, SchemaObjectGraph, TableNode};
///
/// let graph = SchemaObjectGraph::new(vec![
///     TableNode::new("Singers")
///         .column(Column::new("SingerId", "INT64").not_null())
///         .primary_key(["SingerId"]),
///     TableNode::new("Albums")
///         .column(Column::new("AlbumId", "INT64").not_null())
///         .primary_key(["AlbumId"])
///         .interleave_in("Singers", true),
/// ])
/// .unwrap();
///
/// assert_eq!(graph.key_columns("Albums"), ["SingerId", "AlbumId"]);
/// ```
#[derive(Clone, Debug)]
pub struct SchemaObjectGraph {
    tables: Vec<TableNode>,
    positions: HashMap<String, usize>,
    parents: Vec<Option<usize>>,
    key_columns: Vec<Vec<String>>,
    inherited_columns: Vec<Vec<Column>>,
    sequences: Vec<SequenceDescriptor>,
}

impl SchemaObjectGraph {
    /// Validates `tables` and builds the graph. Declaration order is kept
    /// and used to break ties wherever order is otherwise free.
    ///
    /// # Errors
    /// Returns [`Error::SchemaIntegrity`] naming the offending tables if a
    /// name is blank or duplicated, an interleaved parent is missing, the
    /// interleaving contains a cycle, a foreign key references an unknown
    /// table, an index name is reused, or a key column is not declared.
    pub fn new(tables: Vec<TableNode>) -> Result<Self> {
        let mut positions = HashMap::with_capacity(tables.len());
        for (idx, table) in tables.iter().enumerate() {
            if table.name.trim().is_empty() {
                return Err(Error::integrity([idx.to_string()], "table name is empty"));
            }
            if positions.insert(table.name.clone(), idx).is_some() {
                return Err(Error::integrity(
                    [table.name.as_str()],
                    "table is declared more than once",
                ));
            }
        }

        let parents = tables
            .iter()
            .map(|table| match table.parent() {
                None => Ok(None),
                Some(parent) if parent == table.name => Err(Error::integrity(
                    [table.name.as_str()],
                    "table is interleaved in itself",
                )),
                Some(parent) => positions.get(parent).copied().map(Some).ok_or_else(|| {
                    Error::integrity(
                        [table.name.as_str(), parent],
                        "interleaved parent is not part of the schema",
                    )
                }),
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(cycle) = find_cycle(&parents) {
            return Err(Error::integrity(
                cycle.iter().map(|&idx| tables[idx].name.as_str()),
                "interleaving contains a cycle",
            ));
        }

        check_references(&tables, &positions)?;

        let mut graph = Self {
            tables,
            positions,
            parents,
            key_columns: Vec::new(),
            inherited_columns: Vec::new(),
            sequences: Vec::new(),
        };
        graph.resolve_keys()?;
        Ok(graph)
    }

    /// Adds the sequences that back the schema's generated keys.
    /// Identical descriptors are collapsed.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if two different descriptors share a
    /// sequence name.
    pub fn with_sequences(
        mut self,
        sequences: impl IntoIterator<Item = SequenceDescriptor>,
    ) -> Result<Self> {
        for descriptor in sequences {
            match self
                .sequences
                .iter()
                .find(|existing| existing.name() == descriptor.name())
            {
                Some(existing) if *existing == descriptor => {}
                Some(existing) => {
                    return Err(Error::configuration(format!(
                        "sequence '{}' is declared twice with different settings: {existing} and {descriptor}",
                        descriptor.name()
                    )));
                }
                None => self.sequences.push(descriptor),
            }
        }
        Ok(self)
    }

    /// All tables in declaration order.
    pub fn tables(&self) -> &[TableNode] {
        &self.tables
    }

    /// Looks up a table by name.
    pub fn table(&self, name: &str) -> Option<&TableNode> {
        self.position(name).map(|idx| &self.tables[idx])
    }

    /// Sequences backing the schema's keys, in declaration order.
    pub fn sequences(&self) -> &[SequenceDescriptor] {
        &self.sequences
    }

    /// The interleaved parent of `name`.
    pub fn parent(&self, name: &str) -> Option<&TableNode> {
        let idx = self.position(name)?;
        self.parents[idx].map(|p| &self.tables[p])
    }

    /// Tables directly interleaved in `name`, in declaration order.
    pub fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a TableNode> + 'a {
        let parent = self.position(name);
        self.parents
            .iter()
            .zip(&self.tables)
            .filter(move |(p, _)| parent.is_some() && **p == parent)
            .map(|(_, table)| table)
    }

    /// The resolved key of `name`, ancestors' key columns first. Empty for
    /// unknown tables.
    pub fn key_columns(&self, name: &str) -> &[String] {
        match self.position(name) {
            Some(idx) => &self.key_columns[idx],
            None => &[],
        }
    }

    /// Every column of `name`: carried-over ancestor key columns, then the
    /// table's own columns.
    pub fn columns<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a Column> + use<'a> {
        let idx = self.position(name);
        let inherited = idx.map(|i| self.inherited_columns[i].as_slice()).unwrap_or_default();
        let own = idx.map(|i| self.tables[i].columns.as_slice()).unwrap_or_default();
        inherited.iter().chain(own)
    }

    pub(crate) fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub(crate) fn parent_position(&self, idx: usize) -> Option<usize> {
        self.parents.get(idx).copied().flatten()
    }

    fn resolve_keys(&mut self) -> Result<()> {
        let n = self.tables.len();
        let mut keys: Vec<Option<Vec<String>>> = vec![None; n];
        let mut inherited: Vec<Vec<Column>> = vec![Vec::new(); n];

        for start in 0..n {
            // Walk up to the nearest resolved ancestor, then resolve downwards.
            let mut chain = Vec::new();
            let mut cursor = Some(start);
            while let Some(idx) = cursor {
                if keys[idx].is_some() {
                    break;
                }
                chain.push(idx);
                cursor = self.parents[idx];
            }

            for &idx in chain.iter().rev() {
                let table = &self.tables[idx];
                let (mut key, mut carried) = match self.parents[idx] {
                    Some(p) => {
                        let parent_key = keys[p].clone().unwrap_or_default();
                        let carried = parent_key
                            .iter()
                            .filter(|col| table.find_column(col).is_none())
                            .filter_map(|col| {
                                self.resolved_column(p, &inherited, col).cloned()
                            })
                            .collect::<Vec<_>>();
                        (parent_key, carried)
                    }
                    None => (Vec::new(), Vec::new()),
                };

                for col in &table.primary_key {
                    if !key.contains(col) {
                        key.push(col.clone());
                    }
                }

                for col in &key {
                    let declared = table.find_column(col).is_some()
                        || carried.iter().any(|c| &c.name == col);
                    if !declared {
                        return Err(Error::integrity(
                            [table.name.as_str()],
                            format!("key column `{col}` is not declared"),
                        ));
                    }
                }

                #[cfg(feature = "tracing")]
                {
                    if let Some(p) = self.parents[idx] {
                        let parent_key = keys[p].as_deref().unwrap_or_default();
                        warn_reordered_key(&self.tables[p], table, parent_key);
                    }
                }

                carried.shrink_to_fit();
                key.shrink_to_fit();
                inherited[idx] = carried;
                keys[idx] = Some(key);
            }
        }

        self.key_columns = keys.into_iter().map(Option::unwrap_or_default).collect();
        self.inherited_columns = inherited;
        Ok(())
    }

    fn resolved_column<'a>(
        &'a self,
        idx: usize,
        inherited: &'a [Vec<Column>],
        name: &str,
    ) -> Option<&'a Column> {
        self.tables[idx]
            .find_column(name)
            .or_else(|| inherited[idx].iter().find(|c| c.name == name))
    }
}

#[cfg(feature = "tracing")]
fn warn_reordered_key(parent: &TableNode, child: &TableNode, parent_key: &[String]) {
    let mentions_parent_key = child.primary_key.iter().any(|c| parent_key.contains(c));
    if mentions_parent_key && !child.primary_key.starts_with(parent_key) {
        tracing::warn!(
            table = %child.name,
            parent = %parent.name,
            "key columns reordered so the parent's key comes first"
        );
    }
}

/// Returns the members of an interleaving cycle, if any, in parent-chain
/// order.
fn find_cycle(parents: &[Option<usize>]) -> Option<Vec<usize>> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mark {
        Unvisited,
        OnPath,
        Done,
    }

    let mut marks = vec![Mark::Unvisited; parents.len()];
    for start in 0..parents.len() {
        let mut path = Vec::new();
        let mut cursor = Some(start);
        while let Some(idx) = cursor {
            match marks[idx] {
                Mark::Done => break,
                Mark::OnPath => {
                    let from = path.iter().position(|&p| p == idx).unwrap_or_default();
                    return Some(path.split_off(from));
                }
                Mark::Unvisited => {
                    marks[idx] = Mark::OnPath;
                    path.push(idx);
                    cursor = parents[idx];
                }
            }
        }
        for idx in path {
            marks[idx] = Mark::Done;
        }
    }
    None
}

fn check_references(tables: &[TableNode], positions: &HashMap<String, usize>) -> Result<()> {
    let mut index_names = HashSet::new();
    for table in tables {
        for index in &table.indexes {
            if !index_names.insert(index.name.as_str()) {
                return Err(Error::integrity(
                    [table.name.as_str()],
                    format!("index `{}` is declared more than once", index.name),
                ));
            }
        }

        for fk in &table.foreign_keys {
            if !positions.contains_key(&fk.referenced_table) {
                return Err(Error::integrity(
                    [table.name.as_str(), fk.referenced_table.as_str()],
                    format!(
                        "foreign key `{}` references a table that is not part of the schema",
                        fk.name
                    ),
                ));
            }
            if fk.columns.is_empty() || fk.columns.len() != fk.referenced_columns.len() {
                return Err(Error::integrity(
                    [table.name.as_str()],
                    format!(
                        "foreign key `{}` must map the same non-zero number of columns",
                        fk.name
                    ),
                ));
            }
        }
    }
    Ok(())
}
