//! Per-bidder privacy decisions.
//!
//! The consent service is consulted once per request; the resulting vendor
//! map is then applied to every bidder synchronously.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use error_stack::{Report, ResultExt};

use crate::error::FanoutError;
use crate::gdpr::{ConsentService, VendorId, VendorPermissionMap};
use crate::openrtb::{Device, Regs};

use super::catalog::BidderNamespace;
use super::extensions::DecodedExtensions;

/// Whether a bidder's copy of the request must be masked, and why.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrivacyDecision {
    pub coppa_masking_required: bool,
    pub gdpr_masking_required: bool,
}

impl PrivacyDecision {
    #[must_use]
    pub fn masking_required(&self) -> bool {
        self.coppa_masking_required || self.gdpr_masking_required
    }
}

/// Request-level inputs to the privacy decision.
pub struct PrivacyInputs<'a> {
    pub publisher_id: &'a str,
    pub extensions: &'a DecodedExtensions,
    pub regs: Option<&'a Regs>,
    pub device: Option<&'a Device>,
    /// Forward `device.ip` so the consent service can decide by geography.
    pub use_geo_location: bool,
    pub timeout: Duration,
}

/// Resolves COPPA and GDPR decisions for `bidders`.
pub struct PrivacyDecisionEngine<'a> {
    consent: &'a dyn ConsentService,
}

impl<'a> PrivacyDecisionEngine<'a> {
    #[must_use]
    pub fn new(consent: &'a dyn ConsentService) -> Self {
        Self { consent }
    }

    /// Decides masking for every bidder in `bidders`.
    ///
    /// # Errors
    ///
    /// Returns [`FanoutError::ConsentResolutionFailed`] if the consent service
    /// fails; no partial decisions are produced.
    pub async fn resolve(
        &self,
        bidders: &[String],
        namespace: &BidderNamespace<'_>,
        inputs: &PrivacyInputs<'_>,
    ) -> Result<HashMap<String, PrivacyDecision>, Report<FanoutError>> {
        let coppa = inputs.regs.is_some_and(Regs::is_coppa);
        let lmt = inputs.device.is_some_and(Device::is_lmt_enabled);

        let vendor_ids = enforced_vendor_ids(bidders, namespace);
        let permissions = self.vendor_permissions(&vendor_ids, inputs).await?;

        let decisions = bidders
            .iter()
            .map(|bidder| {
                let denied = namespace
                    .vendor_info(bidder)
                    .is_some_and(|info| permissions.is_denied(info.vendor_id));
                (
                    bidder.clone(),
                    PrivacyDecision {
                        coppa_masking_required: coppa,
                        gdpr_masking_required: lmt || denied,
                    },
                )
            })
            .collect();

        Ok(decisions)
    }

    async fn vendor_permissions(
        &self,
        vendor_ids: &HashSet<VendorId>,
        inputs: &PrivacyInputs<'_>,
    ) -> Result<VendorPermissionMap, Report<FanoutError>> {
        let gdpr = inputs.extensions.gdpr().map(|flag| flag.to_string());

        let enforced = self
            .consent
            .is_gdpr_enforced(
                gdpr.as_deref(),
                inputs.publisher_id,
                vendor_ids,
                inputs.timeout,
            )
            .await
            .change_context(FanoutError::ConsentResolutionFailed {
                message: "GDPR enforcement check failed".to_string(),
            })
            .inspect_err(|_| log::warn!("GDPR enforcement check failed"))?;

        if !enforced {
            log::info!("GDPR not enforced for publisher '{}'", inputs.publisher_id);
            return Ok(VendorPermissionMap::not_enforced());
        }

        let ip_address = if inputs.use_geo_location {
            inputs.device.and_then(|device| device.ip.as_deref())
        } else {
            None
        };

        let permissions = self
            .consent
            .result_by_vendor(
                vendor_ids,
                gdpr.as_deref(),
                inputs.extensions.consent(),
                ip_address,
                inputs.timeout,
            )
            .await
            .change_context(FanoutError::ConsentResolutionFailed {
                message: "Vendor consent evaluation failed".to_string(),
            })
            .inspect_err(|_| log::warn!("Vendor consent evaluation failed"))?;

        log::info!(
            "GDPR enforced for publisher '{}': {} of {} vendors evaluated",
            inputs.publisher_id,
            permissions.len(),
            vendor_ids.len()
        );

        Ok(permissions)
    }
}

/// Vendor ids of the bidders that have GDPR enforcement enabled.
fn enforced_vendor_ids(bidders: &[String], namespace: &BidderNamespace<'_>) -> HashSet<VendorId> {
    bidders
        .iter()
        .filter_map(|bidder| namespace.vendor_info(bidder))
        .filter(|info| info.gdpr_enforced)
        .map(|info| info.vendor_id)
        .collect()
}
