//! Logging configuration for rumor nodes.

use eyre::{Result, eyre};
use tracing_subscriber::EnvFilter;

use crate::args::LogArgs;

/// Initialize logging based on command line arguments.
///
/// The filter is built with the following precedence:
/// 1. If `--quiet` is set, only errors are shown
/// 2. Otherwise, start with `RUST_LOG` if set, or a level derived from `-v`
/// 3. Apply any custom directives from `--log.filter`
pub fn init_logging(args: &LogArgs) -> Result<()> {
    let filter = build_filter(args);

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if args.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|err| eyre!("failed to initialize logging: {err}"))
}

fn build_filter(args: &LogArgs) -> EnvFilter {
    if args.quiet {
        return EnvFilter::new("error");
    }

    let base_level = match args.verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let mut filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(base_level));

    if let Some(custom) = &args.filter {
        for directive in custom.split(',').filter(|d| !d.trim().is_empty()) {
            match directive.trim().parse() {
                Ok(directive) => filter = filter.add_directive(directive),
                Err(err) => eprintln!("ignoring invalid log directive {directive:?}: {err}"),
            }
        }
    }

    filter
}
