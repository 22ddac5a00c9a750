//! Discovery of participating bidders from `imp[].ext`.

use crate::constants::{CONTEXT_EXT, PREBID_EXT};
use crate::openrtb::Imp;

use super::catalog::BidderNamespace;

/// Imps that can be fanned out at all; imps without `ext` are discarded.
#[must_use]
pub fn imps_with_ext(imps: &[Imp]) -> Vec<&Imp> {
    imps.iter().filter(|imp| imp.ext.is_some()).collect()
}

/// Distinct known bidder names referenced across `imps`, in first-seen order.
///
/// Every `imp.ext` key other than `prebid`/`context` is a candidate; unknown
/// candidates are skipped silently since not every extension key is a bidder.
/// A `null` value carries no params and does not reference the bidder.
#[must_use]
pub fn resolve_bidders(imps: &[&Imp], namespace: &BidderNamespace<'_>) -> Vec<String> {
    let mut bidders: Vec<String> = Vec::new();

    for ext in imps.iter().filter_map(|imp| imp.ext.as_ref()) {
        for (key, params) in ext {
            if key == PREBID_EXT || key == CONTEXT_EXT || params.is_null() {
                continue;
            }
            if !namespace.is_known(key) {
                log::debug!("Ignoring unknown imp.ext key '{}'", key);
                continue;
            }
            if !bidders.contains(key) {
                bidders.push(key.clone());
            }
        }
    }

    bidders
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::fanout::catalog::AliasTable;
    use crate::test_support::tests::{create_test_catalog, imp_with_ext};

    #[test]
    fn test_resolves_distinct_bidders_across_imps() {
        let catalog = create_test_catalog();
        let aliases = AliasTable::new();
        let namespace = BidderNamespace::new(&catalog, &aliases);
        let imps = [
            imp_with_ext("imp-1", json!({ "alpha": {}, "beta": {}, "prebid": {} })),
            imp_with_ext("imp-2", json!({ "alpha": {}, "context": {} })),
        ];
        let refs: Vec<&Imp> = imps.iter().collect();

        let mut bidders = resolve_bidders(&refs, &namespace);
        bidders.sort();

        assert_eq!(bidders, vec!["alpha".to_string(), "beta".to_string()]);
    }

    #[test]
    fn test_keeps_aliases_and_drops_unknown_keys() {
        let catalog = create_test_catalog();
        let aliases = AliasTable::from([("alphaAlias".to_string(), "alpha".to_string())]);
        let namespace = BidderNamespace::new(&catalog, &aliases);
        let imps = [imp_with_ext(
            "imp-1",
            json!({ "alphaAlias": {}, "notABidder": {}, "gpid": "/homepage" }),
        )];
        let refs: Vec<&Imp> = imps.iter().collect();

        assert_eq!(
            resolve_bidders(&refs, &namespace),
            vec!["alphaAlias".to_string()]
        );
    }

    #[test]
    fn test_null_params_do_not_reference_bidder() {
        let catalog = create_test_catalog();
        let aliases = AliasTable::new();
        let namespace = BidderNamespace::new(&catalog, &aliases);
        let imps = [
            imp_with_ext("imp-1", json!({ "alpha": {}, "beta": null })),
            imp_with_ext("imp-2", json!({ "beta": null, "gamma": { "zone": 4 } })),
        ];
        let refs: Vec<&Imp> = imps.iter().collect();

        assert_eq!(
            resolve_bidders(&refs, &namespace),
            vec!["alpha".to_string(), "gamma".to_string()]
        );
    }

    #[test]
    fn test_imps_without_ext_are_ignored() {
        let imps = [
            Imp {
                id: "bare".to_string(),
                ..Default::default()
            },
            imp_with_ext("imp-1", json!({ "alpha": {} })),
        ];

        let kept = imps_with_ext(&imps);

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "imp-1");
    }
}
