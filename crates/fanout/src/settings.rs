use std::collections::BTreeMap;

use config::{Config, Environment, File, FileFormat};
use error_stack::{Report, ResultExt};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::constants::ENV_PREFIX;
use crate::error::FanoutError;
use crate::gdpr::VendorId;

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct FanoutConfig {
    /// Randomize the order of emitted bidder requests.
    #[serde(default = "default_true")]
    pub shuffle: bool,
    /// Consent timeout used when the caller does not supply one.
    #[serde(default = "default_timeout_ms")]
    #[validate(range(min = 1, max = 10000))]
    pub timeout_ms: u32,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            shuffle: true,
            timeout_ms: default_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GdprConfig {
    /// Forward `device.ip` to the consent service for geo-based enforcement.
    #[serde(default = "default_true")]
    pub use_geo_location: bool,
}

impl Default for GdprConfig {
    fn default() -> Self {
        Self {
            use_geo_location: true,
        }
    }
}

/// Static metadata for one bidder in the catalog.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct BidderConfig {
    /// Cookie family the bidder's buyer ids are synced under.
    pub cookie_family: String,
    /// Global Vendor List id.
    #[serde(default)]
    pub vendor_id: VendorId,
    /// Whether GDPR consent is enforced for this bidder.
    #[serde(default)]
    pub gdpr_enforced: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct Settings {
    #[serde(default)]
    #[validate(nested)]
    pub fanout: FanoutConfig,
    #[serde(default)]
    pub gdpr: GdprConfig,
    #[serde(default)]
    #[validate(custom(function = "validate_bidders"))]
    pub bidders: BTreeMap<String, BidderConfig>,
}

impl Settings {
    /// Parses settings from TOML, applying `BIDDER_FANOUT__*` environment
    /// overrides, and validates the result.
    ///
    /// # Errors
    ///
    /// Returns [`FanoutError::Configuration`] if the TOML is invalid, cannot be
    /// deserialized, or fails validation.
    pub fn from_toml(toml_str: &str) -> Result<Self, Report<FanoutError>> {
        let environment = Environment::default()
            .prefix(ENV_PREFIX)
            .separator("__");

        let toml = File::from_str(toml_str, FileFormat::Toml);
        let config = Config::builder()
            .add_source(toml)
            .add_source(environment)
            .build()
            .change_context(FanoutError::Configuration {
                message: "Failed to build configuration".to_string(),
            })?;

        let settings: Self =
            config
                .try_deserialize()
                .change_context(FanoutError::Configuration {
                    message: "Failed to deserialize configuration".to_string(),
                })?;

        settings
            .validate()
            .change_context(FanoutError::Configuration {
                message: "Settings validation failed".to_string(),
            })?;

        Ok(settings)
    }
}

fn validate_bidders(bidders: &BTreeMap<String, BidderConfig>) -> Result<(), ValidationError> {
    for (name, bidder) in bidders {
        if bidder.cookie_family.trim().is_empty() {
            let mut error = ValidationError::new("empty_cookie_family");
            error.message = Some(format!("bidder '{name}' has no cookie_family").into());
            return Err(error);
        }
    }
    Ok(())
}

fn default_true() -> bool {
    true
}

fn default_timeout_ms() -> u32 {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::tests::crate_test_settings_str;

    const TIMEOUT_ENV: &str = "BIDDER_FANOUT__FANOUT__TIMEOUT_MS";

    #[test]
    fn test_settings_from_valid_toml() {
        temp_env::with_var_unset(TIMEOUT_ENV, || {
            let settings =
                Settings::from_toml(&crate_test_settings_str()).expect("should parse settings");

            assert!(!settings.fanout.shuffle);
            assert_eq!(settings.fanout.timeout_ms, 500);
            assert!(settings.gdpr.use_geo_location);
            assert_eq!(settings.bidders.len(), 3);
            assert_eq!(
                settings.bidders.get("alpha"),
                Some(&BidderConfig {
                    cookie_family: "alpha-family".to_string(),
                    vendor_id: 1,
                    gdpr_enforced: true,
                })
            );
        });
    }

    #[test]
    fn test_settings_defaults() {
        temp_env::with_var_unset(TIMEOUT_ENV, || {
            let settings = Settings::from_toml("").expect("should accept empty TOML");

            assert!(settings.fanout.shuffle);
            assert_eq!(settings.fanout.timeout_ms, 1000);
            assert!(settings.gdpr.use_geo_location);
            assert!(settings.bidders.is_empty());
        });
    }

    #[test]
    fn test_settings_invalid_toml_syntax() {
        let toml_str = r#"
            [fanout
            shuffle = true
            "#;

        let err = Settings::from_toml(toml_str).expect_err("should fail with invalid TOML");
        assert!(matches!(
            err.current_context(),
            FanoutError::Configuration { .. }
        ));
    }

    #[test]
    fn test_settings_missing_cookie_family() {
        let toml_str = r#"
            [bidders.alpha]
            vendor_id = 1
            "#;

        assert!(
            Settings::from_toml(toml_str).is_err(),
            "Should fail when cookie_family is missing"
        );
    }

    #[test]
    fn test_settings_blank_cookie_family_fails_validation() {
        let toml_str = r#"
            [bidders.alpha]
            cookie_family = " "
            "#;

        assert!(
            Settings::from_toml(toml_str).is_err(),
            "Should fail validation with a blank cookie_family"
        );
    }

    #[test]
    fn test_settings_timeout_out_of_range() {
        let toml_str = r#"
            [fanout]
            timeout_ms = 0
            "#;

        assert!(Settings::from_toml(toml_str).is_err());
    }

    #[test]
    fn test_override_env() {
        temp_env::with_var(TIMEOUT_ENV, Some("250"), || {
            let settings =
                Settings::from_toml(&crate_test_settings_str()).expect("should parse settings");

            assert_eq!(settings.fanout.timeout_ms, 250);
        });
    }
}
