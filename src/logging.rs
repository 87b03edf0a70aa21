//! Tracing initialization.

use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::error::NovaFetchError;

/// Default directive when `RUST_LOG` is unset.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "novafetch=debug"
    } else {
        "novafetch=warn"
    }
}

/// Install a compact stderr subscriber. `RUST_LOG` overrides `--verbose`.
pub fn init_logging(verbose: bool) -> Result<(), NovaFetchError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive(verbose)))
        .map_err(|e| NovaFetchError::Config(format!("Failed to create log filter: {e}")))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NONE)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| NovaFetchError::Config(format!("Failed to install logger: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_raises_crate_level() {
        assert_eq!(default_directive(false), "novafetch=warn");
        assert_eq!(default_directive(true), "novafetch=debug");
        assert!(EnvFilter::try_new(default_directive(true)).is_ok());
    }
}
