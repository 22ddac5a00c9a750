//! Error types for the bidder fan-out.
//!
//! All fallible operations return `Result<T, Report<FanoutError>>` so callers
//! get the full `error_stack` context chain. Only request-level failures exist:
//! once the shared extensions decode and consent resolves, per-bidder work is
//! total.

use derive_more::Display;

/// Errors surfaced by the fan-out stage.
#[derive(Debug, Display)]
pub enum FanoutError {
    /// A shared extension container (`user.ext`, `regs.ext`, `site.ext`,
    /// `app.ext` or the request `ext`) is present but has the wrong shape.
    #[display("Error decoding bidRequest.{field}: {message}")]
    MalformedExtension { field: String, message: String },

    /// The external consent service failed or timed out.
    #[display("Consent resolution failed: {message}")]
    ConsentResolutionFailed { message: String },

    /// Settings could not be loaded or failed validation.
    #[display("Configuration error: {message}")]
    Configuration { message: String },

    /// The `uids` cookie could not be decoded.
    #[display("Invalid uids cookie: {message}")]
    InvalidUidsCookie { message: String },
}

impl core::error::Error for FanoutError {}

impl FanoutError {
    /// Returns `true` when the failure was caused by the inbound request itself.
    ///
    /// Callers map client errors to a 4xx and everything else to a
    /// dependency/server failure.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::MalformedExtension { .. })
    }

    /// Short machine-readable kind, stable across message changes.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedExtension { .. } => "malformed_extension",
            Self::ConsentResolutionFailed { .. } => "consent_resolution_failed",
            Self::Configuration { .. } => "configuration",
            Self::InvalidUidsCookie { .. } => "invalid_uids_cookie",
        }
    }
}

#[cfg(test)]
mod tests {
    use error_stack::Report;

    use super::*;

    #[test]
    fn malformed_extension_displays_field_path() {
        let err = FanoutError::MalformedExtension {
            field: "user.ext".to_string(),
            message: "invalid type: string, expected struct".to_string(),
        };

        assert_eq!(
            err.to_string(),
            "Error decoding bidRequest.user.ext: invalid type: string, expected struct"
        );
    }

    #[test]
    fn only_malformed_extension_is_client_error() {
        assert!(FanoutError::MalformedExtension {
            field: "regs.ext".to_string(),
            message: String::new(),
        }
        .is_client_error());
        assert!(!FanoutError::ConsentResolutionFailed {
            message: "timeout".to_string(),
        }
        .is_client_error());
    }

    #[test]
    fn report_keeps_current_context() {
        let report = Report::new(FanoutError::ConsentResolutionFailed {
            message: "vendor list unavailable".to_string(),
        });

        assert_eq!(report.current_context().kind(), "consent_resolution_failed");
        assert!(format!("{report}").contains("vendor list unavailable"));
    }
}
