//! Assembly of the sanitized request sent to one bidder.

use serde_json::{Map, Value};

use crate::constants::{BIDDER_EXT, CONTEXT_EXT, DATA_EXT, FPD_BIDDERS_EXT, PREBID_EXT};
use crate::openrtb::{App, BidRequest, Imp, Site, User};

use super::extensions::DecodedExtensions;
use super::masking::MaskedIdentity;

/// A request addressed to a single bidder.
#[derive(Debug, Clone, PartialEq)]
pub struct BidderRequest {
    pub bidder: String,
    pub request: BidRequest,
}

/// Builds per-bidder copies of one inbound request.
pub struct BidderRequestBuilder<'a> {
    request: &'a BidRequest,
    imps: &'a [&'a Imp],
    extensions: &'a DecodedExtensions,
}

impl<'a> BidderRequestBuilder<'a> {
    /// `imps` are the request's imps that carry an extension.
    #[must_use]
    pub fn new(
        request: &'a BidRequest,
        imps: &'a [&'a Imp],
        extensions: &'a DecodedExtensions,
    ) -> Self {
        Self {
            request,
            imps,
            extensions,
        }
    }

    /// Whether `bidder` is listed in `ext.prebid.data.bidders`.
    #[must_use]
    pub fn is_first_party_data_allowed(&self, bidder: &str) -> bool {
        self.extensions
            .first_party_data_bidders()
            .iter()
            .any(|allowed| allowed == bidder)
    }

    /// Builds `bidder`'s request around its masked identity.
    ///
    /// `buyer_uid` is attached only when no masking was applied.
    #[must_use]
    pub fn build(
        &self,
        bidder: &str,
        identity: MaskedIdentity,
        buyer_uid: Option<String>,
        first_party_data_allowed: bool,
    ) -> BidderRequest {
        let MaskedIdentity {
            user,
            device,
            regs,
            masking_applied,
        } = identity;

        let buyer_uid = buyer_uid.filter(|_| !masking_applied);
        let user = prepare_user(user, buyer_uid, first_party_data_allowed);

        let request = BidRequest {
            imp: self.prepare_imps(bidder, first_party_data_allowed),
            site: self
                .request
                .site
                .as_ref()
                .map(|site| prepare_site(site, first_party_data_allowed)),
            app: self
                .request
                .app
                .as_ref()
                .map(|app| prepare_app(app, first_party_data_allowed)),
            user,
            device,
            regs,
            ext: self.prepare_request_ext(bidder, first_party_data_allowed),
            ..self.request.clone()
        };

        BidderRequest {
            bidder: bidder.to_string(),
            request,
        }
    }

    fn prepare_imps(&self, bidder: &str, first_party_data_allowed: bool) -> Vec<Imp> {
        self.imps
            .iter()
            .filter_map(|imp| {
                let ext = imp.ext.as_ref()?;
                let params = ext.get(bidder).filter(|params| !params.is_null())?;
                Some(Imp {
                    ext: Some(bidder_imp_ext(ext, params, first_party_data_allowed)),
                    ..(*imp).clone()
                })
            })
            .collect()
    }

    fn prepare_request_ext(&self, bidder: &str, first_party_data_allowed: bool) -> Option<Value> {
        let ext = self.request.ext.as_ref();
        if self.extensions.first_party_data_bidders().is_empty() {
            return ext.cloned();
        }

        let Some(Value::Object(ext)) = ext else {
            return ext.cloned();
        };

        let mut ext = ext.clone();
        let mut prebid = object_at(&ext, PREBID_EXT);
        let mut data = object_at(&prebid, DATA_EXT);

        if first_party_data_allowed {
            data.insert(
                FPD_BIDDERS_EXT.to_string(),
                Value::Array(vec![Value::String(bidder.to_string())]),
            );
        } else {
            data.remove(FPD_BIDDERS_EXT);
        }

        if data.is_empty() {
            prebid.remove(DATA_EXT);
        } else {
            prebid.insert(DATA_EXT.to_string(), Value::Object(data));
        }
        ext.insert(PREBID_EXT.to_string(), Value::Object(prebid));

        Some(Value::Object(ext))
    }
}

/// `imp.ext` holding only `prebid`, optionally `context`, and `bidder`.
fn bidder_imp_ext(
    ext: &Map<String, Value>,
    params: &Value,
    first_party_data_allowed: bool,
) -> Map<String, Value> {
    let mut rebuilt = Map::new();
    if let Some(prebid) = ext.get(PREBID_EXT) {
        rebuilt.insert(PREBID_EXT.to_string(), prebid.clone());
    }
    if first_party_data_allowed {
        if let Some(context) = ext.get(CONTEXT_EXT) {
            rebuilt.insert(CONTEXT_EXT.to_string(), context.clone());
        }
    }
    rebuilt.insert(BIDDER_EXT.to_string(), params.clone());
    rebuilt
}

// Buyer ids of every bidder live in user.ext.prebid and must never be forwarded.
fn prepare_user(
    user: Option<User>,
    buyer_uid: Option<String>,
    first_party_data_allowed: bool,
) -> Option<User> {
    let user = match (user, &buyer_uid) {
        (Some(user), _) => Some(User {
            ext: user
                .ext
                .as_ref()
                .map(|ext| strip_user_ext(ext, first_party_data_allowed)),
            ..user
        }),
        (None, Some(_)) => Some(User::default()),
        (None, None) => None,
    };

    match buyer_uid {
        Some(uid) => user.map(|user| User {
            buyeruid: Some(uid),
            ..user
        }),
        None => user,
    }
}

fn strip_user_ext(ext: &Value, first_party_data_allowed: bool) -> Value {
    let mut removed = vec![PREBID_EXT];
    if !first_party_data_allowed {
        removed.push(DATA_EXT);
    }
    without_keys(ext, &removed)
}

fn prepare_site(site: &Site, first_party_data_allowed: bool) -> Site {
    if first_party_data_allowed {
        return site.clone();
    }
    Site {
        ext: site.ext.as_ref().map(|ext| without_keys(ext, &[DATA_EXT])),
        ..site.clone()
    }
}

fn prepare_app(app: &App, first_party_data_allowed: bool) -> App {
    if first_party_data_allowed {
        return app.clone();
    }
    App {
        ext: app.ext.as_ref().map(|ext| without_keys(ext, &[DATA_EXT])),
        ..app.clone()
    }
}

/// Copy of `value` without `keys`; non-objects are returned as they are.
fn without_keys(value: &Value, keys: &[&str]) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(key, _)| !keys.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn object_at(map: &Map<String, Value>, key: &str) -> Map<String, Value> {
    match map.get(key) {
        Some(Value::Object(inner)) => inner.clone(),
        _ => Map::new(),
    }
}
