//! Tracing setup. The subscriber is installed before the config file is
//! read so loader warnings are visible, then re-filtered once the
//! `[logging]` section is known.

use ptyrelay_config::{LogLevel, LoggingConfig};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

pub struct LogHandle {
    handle: reload::Handle<EnvFilter, Registry>,
    /// Set when `--log-level` was given; the config file cannot override it.
    pinned: bool,
}

/// Install the global subscriber. `RUST_LOG` supplies the base filter;
/// the CLI level (or the default) is layered on top.
pub fn init(cli_level: Option<&str>) -> LogHandle {
    let directives = match cli_level {
        Some(level) => cli_directives(level),
        None => LogLevel::default().directive(),
    };
    let (filter, handle) = reload::Layer::new(build_filter(&directives));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    LogHandle {
        handle,
        pinned: cli_level.is_some(),
    }
}

impl LogHandle {
    pub fn apply_config(&self, config: &LoggingConfig) {
        if self.pinned {
            return;
        }
        if let Err(e) = self.handle.reload(build_filter(&config.level.directive())) {
            tracing::warn!("failed to apply configured log level: {e}");
        }
    }
}

/// A bare level applies to the relay crates; anything containing `=` is
/// taken as a filter directive list.
pub(crate) fn cli_directives(level: &str) -> String {
    if level.contains('=') {
        level.to_string()
    } else {
        format!("ptyrelay={level}")
    }
}

pub(crate) fn build_filter(directives: &str) -> EnvFilter {
    let mut filter = EnvFilter::from_default_env();
    for raw in directives.split(',').map(str::trim).filter(|d| !d.is_empty()) {
        match raw.parse::<Directive>() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(e) => eprintln!("ptyrelay: ignoring invalid log directive '{raw}': {e}"),
        }
    }
    filter
}
