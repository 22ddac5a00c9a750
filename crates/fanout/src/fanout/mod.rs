//! Per-bidder fan-out of a single auction request.
//!
//! One inbound request is decoded once, checked against the consent service
//! once, and then split into sanitized copies, one per referenced bidder.
//! Each copy carries only that bidder's imp params, identity masked according
//! to COPPA, GDPR and limited ad tracking, and first-party data only when the
//! publisher allowed it for that bidder.

pub mod bidders;
pub mod builder;
pub mod catalog;
pub mod extensions;
pub mod identity;
pub mod masking;
pub mod orchestrator;
pub mod privacy;

pub use builder::BidderRequest;
pub use catalog::{AliasTable, BidderCatalog, BidderNamespace, StaticBidderCatalog, VendorInfo};
pub use extensions::DecodedExtensions;
pub use masking::MaskedIdentity;
pub use orchestrator::{FanoutContext, FanoutOrchestrator};
pub use privacy::PrivacyDecision;
