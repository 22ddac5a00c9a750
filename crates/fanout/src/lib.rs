//! Bidder request fan-out with privacy enforcement.
//!
//! Turns one OpenRTB auction request into the set of requests sent to
//! individual bidders, enforcing COPPA, GDPR consent and first-party data
//! rules per bidder.
//!
//! # Modules
//!
//! - [`constants`]: Reserved extension keys and cookie names
//! - [`cookies`]: `uids` cookie parsing and the cookie store interface
//! - [`error`]: Error types and error handling utilities
//! - [`fanout`]: Bidder discovery, privacy decisions and request building
//! - [`gdpr`]: Consent service interface and vendor permissions
//! - [`geo`]: Geo masking for COPPA and GDPR
//! - [`ip`]: IP address masking
//! - [`logging`]: Logger initialization
//! - [`openrtb`]: OpenRTB request model
//! - [`settings`]: Configuration management and validation
//! - [`test_support`]: Testing utilities and mocks

pub mod constants;
pub mod cookies;
pub mod error;
pub mod fanout;
pub mod gdpr;
pub mod geo;
pub mod ip;
pub mod logging;
pub mod openrtb;
pub mod settings;
