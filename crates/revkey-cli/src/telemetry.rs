//! Log output for the binary.
//!
//! Scripts and keys go to stdout, so everything logged here goes to stderr.
//! The level is taken from `RUST_LOG` and defaults to `warn`; `info` shows
//! per-script statement counts and `debug` shows every pool refill.
//!
//! ```bash
//! RUST_LOG=debug revkey allocate --sequence ticket_sale_seq --count 100
//! ```

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_telemetry() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_line_number(true)
                .with_file(true),
        )
        .try_init()?;
    Ok(())
}
