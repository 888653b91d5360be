use std::{
    fs::File,
    io::{self, BufReader, Read},
    path::Path,
};

use anyhow::Context;
use revkey::{
    Dialect, ExistingSchema, SchemaObjectGraph, SequenceConfig, SequenceDescriptor, TableNode,
};
use serde::Deserialize;

/// Everything needed to produce one script, as read from JSON.
///
/// ```json
/// {
///   "sequences": [{ "sequenceName": "singer_seq", "startWithCounter": 50000 }],
///   "tables": [
///     {
///       "name": "Singers",
///       "columns": [{ "name": "SingerId", "sqlType": "INT64", "nullable": false }],
///       "primaryKey": ["SingerId"]
///     }
///   ],
///   "existing": { "tables": { "Singers": { "columns": ["SingerId"] } } },
///   "afterBatch": ["insert into Singers (SingerId) values (1)"]
/// }
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct SchemaSnapshot {
    pub tables: Vec<TableNode>,
    pub sequences: Vec<SequenceConfig>,
    /// What the live database already has. Absent means "nothing".
    pub existing: Option<ExistingSchema>,
    pub after_batch: Vec<String>,
}

impl SchemaSnapshot {
    /// Reads a snapshot from `path`, or from stdin when `path` is `-`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut raw = String::new();
        if path == Path::new("-") {
            io::stdin()
                .read_to_string(&mut raw)
                .context("failed to read snapshot from stdin")?;
        } else {
            let file = File::open(path)
                .with_context(|| format!("failed to open snapshot `{}`", path.display()))?;
            BufReader::new(file)
                .read_to_string(&mut raw)
                .with_context(|| format!("failed to read snapshot `{}`", path.display()))?;
        }
        Self::parse(&raw).with_context(|| format!("invalid snapshot `{}`", path.display()))
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Validates the tables and sequences into a graph. Sequences are checked
    /// against the limits of `dialect`.
    pub fn graph(&self, dialect: &Dialect) -> anyhow::Result<SchemaObjectGraph> {
        let sequences = self
            .sequences
            .iter()
            .map(|config| config.build_for(dialect))
            .collect::<revkey::Result<Vec<SequenceDescriptor>>>()?;
        Ok(SchemaObjectGraph::new(self.tables.clone())?.with_sequences(sequences)?)
    }

    pub fn existing_or_empty(&self) -> ExistingSchema {
        self.existing.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"{
        "sequences": [
            { "sequenceName": "singer_seq", "startWithCounter": 50000, "excludeRange": "[1,1000]" }
        ],
        "tables": [
            {
                "name": "Albums",
                "columns": [{ "name": "AlbumId", "sqlType": "INT64", "nullable": false }],
                "primaryKey": ["AlbumId"],
                "interleave": { "parent": "Singers", "onDeleteCascade": true }
            },
            {
                "name": "Singers",
                "columns": [{ "name": "SingerId", "sqlType": "INT64", "nullable": false }],
                "primaryKey": ["SingerId"],
                "indexes": [{ "name": "SingersById", "columns": ["SingerId"], "unique": true }]
            }
        ],
        "existing": {
            "tables": { "Singers": { "columns": ["SingerId"], "indexes": ["SingersById"] } },
            "sequences": ["singer_seq"]
        }
    }"#;

    #[test]
    fn parses_and_validates() {
        let snapshot = SchemaSnapshot::parse(SNAPSHOT).unwrap();
        let graph = snapshot.graph(&Dialect::google_sql()).unwrap();

        assert_eq!(graph.key_columns("Albums"), ["SingerId", "AlbumId"]);
        assert_eq!(graph.sequences().len(), 1);
        assert_eq!(graph.sequences()[0].start_counter(), 50_000);

        let existing = snapshot.existing_or_empty();
        assert!(existing.has_index("Singers", "SingersById"));
        assert!(existing.has_sequence("singer_seq"));
        assert!(!existing.has_table("Albums"));
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let snapshot = SchemaSnapshot::parse("{}").unwrap();
        assert!(snapshot.tables.is_empty());
        assert!(snapshot.existing.is_none());
        assert!(
            snapshot
                .graph(&Dialect::google_sql())
                .unwrap()
                .tables()
                .is_empty()
        );
    }

    #[test]
    fn rejects_unknown_fields_and_bad_sequences() {
        assert!(SchemaSnapshot::parse(r#"{ "table": [] }"#).is_err());

        let snapshot =
            SchemaSnapshot::parse(r#"{ "sequences": [{ "sequenceName": "s", "poolSize": 0 }] }"#)
                .unwrap();
        assert!(snapshot.graph(&Dialect::google_sql()).is_err());
    }

    #[test]
    fn sequences_respect_dialect_limits() {
        let snapshot =
            SchemaSnapshot::parse(r#"{ "sequences": [{ "sequenceName": "s", "poolSize": 5000 }] }"#)
                .unwrap();

        assert!(snapshot.graph(&Dialect::google_sql()).is_ok());
        let err = snapshot.graph(&Dialect::postgresql()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<revkey::Error>(),
            Some(revkey::Error::Configuration { .. })
        ));
    }
}
