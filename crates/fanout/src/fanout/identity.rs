//! Buyer id resolution for a single bidder.

use std::collections::HashMap;

use crate::cookies::CookieStore;
use crate::openrtb::User;

use super::catalog::BidderNamespace;

/// Where a bidder's buyer id may come from.
pub struct IdentitySources<'a> {
    /// `user.ext.prebid.buyeruids`, keyed by canonical bidder name.
    pub body_uids: &'a HashMap<String, String>,
    pub cookie_store: &'a dyn CookieStore,
}

/// Buyer id to attach for `bidder`, if one should be attached at all.
///
/// A non-blank `user.buyeruid` already on the request is never replaced.
/// Otherwise the request body wins over the cookie store. Lookups only ever
/// use `bidder`'s own canonical name and cookie family.
#[must_use]
pub fn resolve_buyer_uid(
    user: Option<&User>,
    bidder: &str,
    namespace: &BidderNamespace<'_>,
    sources: &IdentitySources<'_>,
) -> Option<String> {
    let existing = user.and_then(|u| u.buyeruid.as_deref());
    if existing.is_some_and(|uid| !uid.trim().is_empty()) {
        return None;
    }

    let canonical = namespace.resolve(bidder);
    if let Some(uid) = sources.body_uids.get(canonical).filter(|uid| !is_blank(uid)) {
        return Some(uid.clone());
    }

    namespace
        .cookie_family_name(bidder)
        .and_then(|family| sources.cookie_store.uid_for(family))
        .filter(|uid| !is_blank(uid))
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookies::UidsCookie;
    use crate::fanout::catalog::AliasTable;
    use crate::test_support::tests::create_test_catalog;

    fn uids(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_existing_buyeruid_is_kept() {
        let catalog = create_test_catalog();
        let aliases = AliasTable::new();
        let namespace = BidderNamespace::new(&catalog, &aliases);
        let body_uids = uids(&[("alpha", "body-uid")]);
        let cookie = UidsCookie::default();
        let sources = IdentitySources {
            body_uids: &body_uids,
            cookie_store: &cookie,
        };
        let user = User {
            buyeruid: Some("inbound".to_string()),
            ..Default::default()
        };

        assert_eq!(
            resolve_buyer_uid(Some(&user), "alpha", &namespace, &sources),
            None
        );
    }

    #[test]
    fn test_body_uid_wins_over_cookie() {
        let catalog = create_test_catalog();
        let aliases = AliasTable::new();
        let namespace = BidderNamespace::new(&catalog, &aliases);
        let body_uids = uids(&[("alpha", "body-uid")]);
        let cookie = UidsCookie::from_uids(uids(&[("alpha-family", "cookie-uid")]));
        let sources = IdentitySources {
            body_uids: &body_uids,
            cookie_store: &cookie,
        };
        let user = User {
            buyeruid: Some("  ".to_string()),
            ..Default::default()
        };

        assert_eq!(
            resolve_buyer_uid(Some(&user), "alpha", &namespace, &sources),
            Some("body-uid".to_string())
        );
    }

    #[test]
    fn test_falls_back_to_cookie_family() {
        let catalog = create_test_catalog();
        let aliases = AliasTable::from([("alphaAlias".to_string(), "alpha".to_string())]);
        let namespace = BidderNamespace::new(&catalog, &aliases);
        let body_uids = uids(&[("alpha", "")]);
        let cookie = UidsCookie::from_uids(uids(&[("alpha-family", "cookie-uid")]));
        let sources = IdentitySources {
            body_uids: &body_uids,
            cookie_store: &cookie,
        };

        assert_eq!(
            resolve_buyer_uid(None, "alphaAlias", &namespace, &sources),
            Some("cookie-uid".to_string())
        );
    }

    #[test]
    fn test_never_reads_another_bidders_slot() {
        let catalog = create_test_catalog();
        let aliases = AliasTable::new();
        let namespace = BidderNamespace::new(&catalog, &aliases);
        let body_uids = uids(&[("beta", "beta-body")]);
        let cookie = UidsCookie::from_uids(uids(&[("beta-family", "beta-cookie")]));
        let sources = IdentitySources {
            body_uids: &body_uids,
            cookie_store: &cookie,
        };

        assert_eq!(
            resolve_buyer_uid(None, "alpha", &namespace, &sources),
            None
        );
    }
}
