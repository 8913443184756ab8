// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Tracing subscriber setup.
//!
//! `RUST_LOG` selects the filter (default `info,tower_http=debug`) and
//! `LOG_FORMAT` the output: `json` for log shippers, `pretty` for terminals.

use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, DEFAULT_LOG_FILTER};

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init_tracing(format: LogFormat) {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter());

    let result = match format {
        LogFormat::Json => builder.json().with_current_span(false).try_init(),
        LogFormat::Pretty => builder.with_target(false).compact().try_init(),
    };

    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init_tracing(LogFormat::Pretty);
        init_tracing(LogFormat::Json);
    }
}
