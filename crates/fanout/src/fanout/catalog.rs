//! Bidder catalog and alias resolution.

use std::collections::{BTreeMap, HashMap};

use crate::gdpr::VendorId;
use crate::settings::{BidderConfig, Settings};

/// Alias → canonical bidder name, supplied per request.
pub type AliasTable = HashMap<String, String>;

/// GDPR metadata of a bidder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VendorInfo {
    pub vendor_id: VendorId,
    pub gdpr_enforced: bool,
}

/// Read-only registry of known bidders.
pub trait BidderCatalog: Send + Sync {
    /// Whether `name` is a canonical bidder name.
    fn is_valid_name(&self, name: &str) -> bool;

    /// All canonical bidder names.
    fn names(&self) -> Vec<&str>;

    /// Cookie family under which the bidder's buyer ids are synced.
    fn cookie_family_name(&self, name: &str) -> Option<&str>;

    /// Vendor id and enforcement flag of the bidder.
    fn vendor_info(&self, name: &str) -> Option<VendorInfo>;
}

/// Catalog backed by the `[bidders.*]` settings tables.
#[derive(Debug, Clone, Default)]
pub struct StaticBidderCatalog {
    bidders: BTreeMap<String, BidderConfig>,
}

impl StaticBidderCatalog {
    #[must_use]
    pub fn new(bidders: BTreeMap<String, BidderConfig>) -> Self {
        Self { bidders }
    }

    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.bidders.clone())
    }
}

impl BidderCatalog for StaticBidderCatalog {
    fn is_valid_name(&self, name: &str) -> bool {
        self.bidders.contains_key(name)
    }

    fn names(&self) -> Vec<&str> {
        self.bidders.keys().map(String::as_str).collect()
    }

    fn cookie_family_name(&self, name: &str) -> Option<&str> {
        self.bidders.get(name).map(|b| b.cookie_family.as_str())
    }

    fn vendor_info(&self, name: &str) -> Option<VendorInfo> {
        self.bidders.get(name).map(|b| VendorInfo {
            vendor_id: b.vendor_id,
            gdpr_enforced: b.gdpr_enforced,
        })
    }
}

/// Catalog names and request aliases behaving as one namespace.
///
/// Built once per request; aliases shadow catalog names of the same spelling.
pub struct BidderNamespace<'a> {
    catalog: &'a dyn BidderCatalog,
    names: HashMap<&'a str, &'a str>,
}

impl<'a> BidderNamespace<'a> {
    #[must_use]
    pub fn new(catalog: &'a dyn BidderCatalog, aliases: &'a AliasTable) -> Self {
        let mut names: HashMap<&'a str, &'a str> =
            catalog.names().into_iter().map(|name| (name, name)).collect();
        names.extend(
            aliases
                .iter()
                .map(|(alias, canonical)| (alias.as_str(), canonical.as_str())),
        );

        Self { catalog, names }
    }

    /// Canonical name for `name`; unknown names resolve to themselves.
    #[must_use]
    pub fn resolve<'n>(&self, name: &'n str) -> &'n str
    where
        'a: 'n,
    {
        self.names.get(name).copied().unwrap_or(name)
    }

    /// Whether `name` is a catalog bidder or a request alias.
    #[must_use]
    pub fn is_known(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Cookie family of the bidder behind `name`.
    #[must_use]
    pub fn cookie_family_name(&self, name: &str) -> Option<&'a str> {
        self.catalog.cookie_family_name(self.resolve(name))
    }

    /// Vendor metadata of the bidder behind `name`.
    #[must_use]
    pub fn vendor_info(&self, name: &str) -> Option<VendorInfo> {
        self.catalog.vendor_info(self.resolve(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::tests::create_test_catalog;

    #[test]
    fn test_catalog_from_settings() {
        let catalog = create_test_catalog();

        assert!(catalog.is_valid_name("alpha"));
        assert!(!catalog.is_valid_name("unknown"));
        assert_eq!(catalog.cookie_family_name("alpha"), Some("alpha-family"));
        assert_eq!(
            catalog.vendor_info("beta"),
            Some(VendorInfo {
                vendor_id: 2,
                gdpr_enforced: true,
            })
        );
    }

    #[test]
    fn test_namespace_resolves_aliases() {
        let catalog = create_test_catalog();
        let aliases = AliasTable::from([("alphaAlias".to_string(), "alpha".to_string())]);
        let namespace = BidderNamespace::new(&catalog, &aliases);

        assert!(namespace.is_known("alpha"));
        assert!(namespace.is_known("alphaAlias"));
        assert!(!namespace.is_known("context"));
        assert_eq!(namespace.resolve("alphaAlias"), "alpha");
        assert_eq!(namespace.resolve("alpha"), "alpha");
        assert_eq!(namespace.resolve("unknown"), "unknown");
        assert_eq!(
            namespace.cookie_family_name("alphaAlias"),
            Some("alpha-family")
        );
        assert_eq!(
            namespace.vendor_info("alphaAlias").map(|v| v.vendor_id),
            Some(1)
        );
    }

    #[test]
    fn test_alias_to_unknown_bidder_has_no_metadata() {
        let catalog = create_test_catalog();
        let aliases = AliasTable::from([("ghost".to_string(), "nowhere".to_string())]);
        let namespace = BidderNamespace::new(&catalog, &aliases);

        assert!(namespace.is_known("ghost"));
        assert_eq!(namespace.cookie_family_name("ghost"), None);
        assert_eq!(namespace.vendor_info("ghost"), None);
    }
}
