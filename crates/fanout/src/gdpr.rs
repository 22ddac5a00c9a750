//! GDPR consent collaborator boundary.
//!
//! Parsing TCF consent strings and fetching vendor lists is the consent
//! service's job; the fan-out only consumes its yes/no answers.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use error_stack::Report;

use crate::error::FanoutError;

/// IAB Global Vendor List id.
pub type VendorId = u32;

/// Per-vendor permission to process personal data.
///
/// An empty map means no enforcement is in effect for the request. A vendor
/// missing from a non-empty map was never in scope and is not enforced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VendorPermissionMap(HashMap<VendorId, bool>);

impl VendorPermissionMap {
    /// A map signalling that GDPR is not enforced.
    #[must_use]
    pub fn not_enforced() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Explicit answer for `vendor_id`, `None` when the vendor was not evaluated.
    #[must_use]
    pub fn permission(&self, vendor_id: VendorId) -> Option<bool> {
        self.0.get(&vendor_id).copied()
    }

    /// Whether the vendor was evaluated and explicitly denied.
    #[must_use]
    pub fn is_denied(&self, vendor_id: VendorId) -> bool {
        self.permission(vendor_id) == Some(false)
    }
}

impl From<HashMap<VendorId, bool>> for VendorPermissionMap {
    fn from(map: HashMap<VendorId, bool>) -> Self {
        Self(map)
    }
}

impl FromIterator<(VendorId, bool)> for VendorPermissionMap {
    fn from_iter<T: IntoIterator<Item = (VendorId, bool)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// External service evaluating TCF consent against the vendor list.
///
/// Implementations own timeout handling: `timeout` is the remaining budget
/// for the whole auction and no second timeout is layered on top.
#[async_trait]
pub trait ConsentService: Send + Sync {
    /// Decides whether GDPR applies to this publisher and vendor set at all.
    ///
    /// `gdpr` is the raw `regs.ext.gdpr` flag as `"0"`/`"1"`, if present.
    ///
    /// # Errors
    ///
    /// Returns an error when the decision cannot be made (network, timeout).
    async fn is_gdpr_enforced(
        &self,
        gdpr: Option<&str>,
        publisher_id: &str,
        vendor_ids: &HashSet<VendorId>,
        timeout: Duration,
    ) -> Result<bool, Report<FanoutError>>;

    /// Evaluates `consent` for each vendor id.
    ///
    /// # Errors
    ///
    /// Returns an error when the consent string or vendor list cannot be
    /// evaluated in time.
    async fn result_by_vendor(
        &self,
        vendor_ids: &HashSet<VendorId>,
        gdpr: Option<&str>,
        consent: Option<&str>,
        ip_address: Option<&str>,
        timeout: Duration,
    ) -> Result<VendorPermissionMap, Report<FanoutError>>;
}
