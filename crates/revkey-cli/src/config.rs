use core::num::NonZeroUsize;
use std::path::PathBuf;

use anyhow::bail;
use clap::{Parser, Subcommand, ValueEnum};
use revkey::{Capabilities, Dialect, SequenceConfig, SequenceDescriptor};

/// Command-line arguments for the `revkey` binary.
///
/// Global options may also come from the environment (or a `.env` file in
/// the working directory).
#[derive(Parser, Debug, Clone)]
#[command(
    name = "revkey",
    version,
    about = "Interleave-aware DDL scripts and pooled bit-reversed keys"
)]
pub struct CliArgs {
    /// SQL surface the scripts are rendered for.
    ///
    /// Environment variable: `REVKEY_DIALECT`
    #[arg(long, env = "REVKEY_DIALECT", value_enum, default_value_t = DialectArg::GoogleSql)]
    pub dialect: DialectArg,

    /// Maximum number of statements between one `START BATCH DDL` and its
    /// `RUN BATCH`. `0` puts everything in a single batch.
    ///
    /// Environment variable: `REVKEY_MAX_BATCH_STATEMENTS`
    #[arg(long, env = "REVKEY_MAX_BATCH_STATEMENTS", default_value_t = 0)]
    pub max_batch_statements: usize,

    /// Emit bare statements without batch markers.
    ///
    /// Environment variable: `REVKEY_NO_BATCH`
    #[arg(long, env = "REVKEY_NO_BATCH", default_value_t = false)]
    pub no_batch: bool,

    /// Reject foreign keys instead of rendering them.
    ///
    /// Environment variable: `REVKEY_NO_FOREIGN_KEYS`
    #[arg(long, env = "REVKEY_NO_FOREIGN_KEYS", default_value_t = false)]
    pub no_foreign_keys: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialectArg {
    #[value(name = "googlesql")]
    GoogleSql,
    #[value(name = "postgresql")]
    PostgreSql,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the script that creates every object in a snapshot.
    Create {
        /// Snapshot JSON file, or `-` for stdin.
        snapshot: PathBuf,
    },
    /// Print the script that drops every object in a snapshot. With an
    /// `existing` section, only objects present there are dropped.
    Drop { snapshot: PathBuf },
    /// Print the script that creates whatever the snapshot's `existing`
    /// section lacks.
    Update { snapshot: PathBuf },
    /// Print a drop of what exists followed by a full create.
    Recreate { snapshot: PathBuf },
    /// Allocate keys from an in-memory sequence and print them.
    Allocate {
        /// Sequence name, optionally schema-qualified (`billing.invoice_seq`).
        #[arg(long)]
        sequence: String,

        /// Number of keys to print.
        #[arg(long, default_value_t = 10)]
        count: usize,

        #[arg(long, default_value_t = 1)]
        start_with_counter: i64,

        #[arg(long, default_value_t = 50)]
        pool_size: i64,

        /// Counter ranges never to issue, e.g. `[1,1000];[5000,5999]`.
        #[arg(long, default_value_t = String::new())]
        exclude_range: String,
    },
}

/// A validated [`CliArgs`].
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub dialect: Dialect,
    pub max_batch_statements: Option<NonZeroUsize>,
    pub action: Action,
}

#[derive(Debug, Clone)]
pub enum Action {
    Script { kind: ScriptKind, snapshot: PathBuf },
    Allocate { descriptor: SequenceDescriptor, count: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    Create,
    Drop,
    Update,
    Recreate,
}

impl TryFrom<CliArgs> for CliConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let base = match args.dialect {
            DialectArg::GoogleSql => Dialect::google_sql(),
            DialectArg::PostgreSql => Dialect::postgresql(),
        };
        let dialect = base.with_capabilities(Capabilities {
            foreign_keys: base.capabilities().foreign_keys && !args.no_foreign_keys,
            batch_ddl: base.capabilities().batch_ddl && !args.no_batch,
            ..*base.capabilities()
        });

        let action = match args.command {
            Command::Create { snapshot } => Action::Script {
                kind: ScriptKind::Create,
                snapshot,
            },
            Command::Drop { snapshot } => Action::Script {
                kind: ScriptKind::Drop,
                snapshot,
            },
            Command::Update { snapshot } => Action::Script {
                kind: ScriptKind::Update,
                snapshot,
            },
            Command::Recreate { snapshot } => Action::Script {
                kind: ScriptKind::Recreate,
                snapshot,
            },
            Command::Allocate {
                sequence,
                count,
                start_with_counter,
                pool_size,
                exclude_range,
            } => {
                if count == 0 {
                    bail!("--count must be greater than 0");
                }
                let descriptor = SequenceConfig::new(sequence)
                    .start_with_counter(start_with_counter)
                    .pool_size(pool_size)
                    .exclude_range(exclude_range)
                    .build_for(&dialect)?;
                Action::Allocate { descriptor, count }
            }
        };

        Ok(Self {
            dialect,
            max_batch_statements: NonZeroUsize::new(args.max_batch_statements),
            action,
        })
    }
}
