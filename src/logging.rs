use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use crate::error::{Error, Result};

/// Install a global subscriber printing to stderr.
///
/// `RUST_LOG` takes precedence over `default_directive` (e.g. `"info"` or
/// `"bone_enhancer=debug"`). Fails if a subscriber is already installed.
pub fn init_logging(default_directive: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .map_err(|err| Error::Logging(err.to_string()))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|err| Error::Logging(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_install_is_reported() {
        let first = init_logging("bone_enhancer=debug");
        let second = init_logging("bone_enhancer=debug");
        // Another test may have installed a subscriber first.
        assert!(first.is_ok() || matches!(first, Err(Error::Logging(_))));
        assert!(matches!(second, Err(Error::Logging(_))));
    }
}
