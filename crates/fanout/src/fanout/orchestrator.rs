//! Fan-out orchestrator splitting one auction request into bidder requests.

use std::sync::Arc;
use std::time::Duration;

use error_stack::Report;
use rand::seq::SliceRandom;

use crate::cookies::CookieStore;
use crate::error::FanoutError;
use crate::gdpr::ConsentService;
use crate::openrtb::{BidRequest, Imp};
use crate::settings::{FanoutConfig, GdprConfig, Settings};

use super::bidders::{imps_with_ext, resolve_bidders};
use super::builder::{BidderRequest, BidderRequestBuilder};
use super::catalog::{AliasTable, BidderCatalog, BidderNamespace, StaticBidderCatalog};
use super::extensions::{DecodedExtensions, ExtUser};
use super::identity::{resolve_buyer_uid, IdentitySources};
use super::masking::mask;
use super::privacy::{PrivacyDecisionEngine, PrivacyInputs};

/// Per-request inputs supplied by the caller.
pub struct FanoutContext<'a> {
    /// Caller-level aliases; `ext.prebid.aliases` of the request is merged on top.
    pub aliases: &'a AliasTable,
    pub cookie_store: &'a dyn CookieStore,
    pub publisher_id: &'a str,
    /// Remaining auction budget; falls back to `fanout.timeout_ms`.
    pub timeout: Option<Duration>,
}

/// Splits auction requests into sanitized per-bidder requests.
///
/// Holds only read-only collaborators, so one instance serves concurrent
/// requests.
pub struct FanoutOrchestrator {
    catalog: Arc<dyn BidderCatalog>,
    consent: Arc<dyn ConsentService>,
    config: FanoutConfig,
    gdpr: GdprConfig,
}

impl FanoutOrchestrator {
    #[must_use]
    pub fn new(
        catalog: Arc<dyn BidderCatalog>,
        consent: Arc<dyn ConsentService>,
        config: FanoutConfig,
        gdpr: GdprConfig,
    ) -> Self {
        Self {
            catalog,
            consent,
            config,
            gdpr,
        }
    }

    /// Builds an orchestrator whose catalog comes from `[bidders.*]`.
    #[must_use]
    pub fn from_settings(settings: &Settings, consent: Arc<dyn ConsentService>) -> Self {
        Self::new(
            Arc::new(StaticBidderCatalog::from_settings(settings)),
            consent,
            settings.fanout.clone(),
            settings.gdpr.clone(),
        )
    }

    /// Produces one sanitized request per bidder referenced by `request`.
    ///
    /// The consent service is awaited once; everything after it is
    /// synchronous. Output order is randomized unless `fanout.shuffle` is off.
    ///
    /// # Errors
    ///
    /// - [`FanoutError::MalformedExtension`] if a shared extension fails to decode
    /// - [`FanoutError::ConsentResolutionFailed`] if the consent service fails
    ///
    /// Either error aborts the whole fan-out; no partial list is returned.
    pub async fn extract_bidder_requests(
        &self,
        request: &BidRequest,
        context: &FanoutContext<'_>,
    ) -> Result<Vec<BidderRequest>, Report<FanoutError>> {
        let extensions = DecodedExtensions::decode(request)?;

        let mut aliases = context.aliases.clone();
        if let Some(ext) = &extensions.request {
            aliases.extend(ext.aliases());
        }
        let namespace = BidderNamespace::new(self.catalog.as_ref(), &aliases);

        let imps: Vec<&Imp> = imps_with_ext(&request.imp);
        let bidders = resolve_bidders(&imps, &namespace);
        log::debug!(
            "Resolved {} bidders for request '{}': {:?}",
            bidders.len(),
            request.id,
            bidders
        );

        if bidders.is_empty() {
            log::info!("No bidders referenced by request '{}'", request.id);
            return Ok(Vec::new());
        }

        let inputs = PrivacyInputs {
            publisher_id: context.publisher_id,
            extensions: &extensions,
            regs: request.regs.as_ref(),
            device: request.device.as_ref(),
            use_geo_location: self.gdpr.use_geo_location,
            timeout: context.timeout.unwrap_or_else(|| self.default_timeout()),
        };
        let decisions = PrivacyDecisionEngine::new(self.consent.as_ref())
            .resolve(&bidders, &namespace, &inputs)
            .await?;

        let body_uids = extensions
            .user
            .as_ref()
            .map(ExtUser::buyer_uids)
            .unwrap_or_default();
        let sources = IdentitySources {
            body_uids: &body_uids,
            cookie_store: context.cookie_store,
        };
        let builder = BidderRequestBuilder::new(request, &imps, &extensions);

        let mut bidder_requests: Vec<BidderRequest> = bidders
            .iter()
            .map(|bidder| {
                let decision = decisions.get(bidder).copied().unwrap_or_default();
                let identity = mask(
                    request.user.as_ref(),
                    request.device.as_ref(),
                    request.regs.as_ref(),
                    extensions.regs.as_ref(),
                    decision,
                );

                let buyer_uid = if identity.masking_applied {
                    log::info!(
                        "Privacy masking applied for bidder '{}' (coppa: {}, gdpr: {})",
                        namespace.resolve(bidder),
                        decision.coppa_masking_required,
                        decision.gdpr_masking_required
                    );
                    None
                } else {
                    resolve_buyer_uid(request.user.as_ref(), bidder, &namespace, &sources)
                };

                let first_party_data_allowed = builder.is_first_party_data_allowed(bidder);
                builder.build(bidder, identity, buyer_uid, first_party_data_allowed)
            })
            .collect();

        if self.config.shuffle {
            bidder_requests.shuffle(&mut rand::thread_rng());
        }

        log::info!(
            "Extracted {} bidder requests for request '{}'",
            bidder_requests.len(),
            request.id
        );

        Ok(bidder_requests)
    }

    fn default_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.config.timeout_ms))
    }
}
