// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration diagnostics.

use thiserror::Error;

/// A configuration problem, with enough context to fix the offending key.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML was syntactically or structurally invalid.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// A value violated a semantic constraint.
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Render a list of collected errors as one multi-line message.
pub fn render_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_joins_all_errors() {
        let errors = vec![
            ConfigError::Validation {
                message: "compression.stride must be at least 1".to_string(),
            },
            ConfigError::Validation {
                message: "retrieval.chars_per_token must be at least 1".to_string(),
            },
        ];
        let rendered = render_errors(&errors);
        assert!(rendered.contains("stride"));
        assert!(rendered.contains("chars_per_token"));
        assert_eq!(rendered.lines().count(), 2);
    }
}
