//! Typed views over the shared extension containers.
//!
//! Decoded once per request. A container that is present but has the wrong
//! shape aborts the whole fan-out, since every bidder request would inherit it.

use std::collections::HashMap;

use error_stack::Report;
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FanoutError;
use crate::openrtb::BidRequest;

/// `user.ext`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtUser {
    /// TCF consent string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prebid: Option<ExtUserPrebid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, flatten)]
    pub extra: HashMap<String, Value>,
}

/// `user.ext.prebid`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtUserPrebid {
    /// Resolved bidder name → buyer id.
    #[serde(default)]
    pub buyeruids: HashMap<String, String>,
}

/// `regs.ext`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtRegs {
    /// `1` when GDPR applies, `0` when it explicitly does not. Numeric
    /// strings such as `"1"` are accepted.
    #[serde(
        default,
        deserialize_with = "deserialize_flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub gdpr: Option<u8>,
    #[serde(default, flatten)]
    pub extra: HashMap<String, Value>,
}

/// `site.ext`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtSite {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amp: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, flatten)]
    pub extra: HashMap<String, Value>,
}

/// `app.ext`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtApp {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prebid: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, flatten)]
    pub extra: HashMap<String, Value>,
}

/// Top-level request `ext`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prebid: Option<ExtRequestPrebid>,
    #[serde(default, flatten)]
    pub extra: HashMap<String, Value>,
}

/// `ext.prebid`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtRequestPrebid {
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub aliases: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ExtRequestPrebidData>,
    #[serde(default, flatten)]
    pub extra: HashMap<String, Value>,
}

/// `ext.prebid.data`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtRequestPrebidData {
    /// Bidders allowed to receive first-party data.
    #[serde(default)]
    pub bidders: Vec<String>,
    #[serde(default, flatten)]
    pub extra: HashMap<String, Value>,
}

impl ExtUser {
    /// Per-bidder buyer ids supplied in the request body.
    #[must_use]
    pub fn buyer_uids(&self) -> HashMap<String, String> {
        self.prebid
            .as_ref()
            .map(|prebid| prebid.buyeruids.clone())
            .unwrap_or_default()
    }
}

impl ExtRequest {
    /// Bidders allowed to receive first-party data; empty when unspecified.
    #[must_use]
    pub fn first_party_data_bidders(&self) -> &[String] {
        self.prebid
            .as_ref()
            .and_then(|prebid| prebid.data.as_ref())
            .map(|data| data.bidders.as_slice())
            .unwrap_or_default()
    }

    /// Aliases declared in `ext.prebid.aliases`.
    #[must_use]
    pub fn aliases(&self) -> HashMap<String, String> {
        self.prebid
            .as_ref()
            .map(|prebid| prebid.aliases.clone())
            .unwrap_or_default()
    }
}

/// Every shared extension of a request, decoded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedExtensions {
    pub user: Option<ExtUser>,
    pub regs: Option<ExtRegs>,
    pub site: Option<ExtSite>,
    pub app: Option<ExtApp>,
    pub request: Option<ExtRequest>,
}

impl DecodedExtensions {
    /// Decodes `user.ext`, `regs.ext`, `site.ext`, `app.ext` and `ext`.
    ///
    /// # Errors
    ///
    /// Returns [`FanoutError::MalformedExtension`] naming the first container
    /// that fails to decode.
    pub fn decode(request: &BidRequest) -> Result<Self, Report<FanoutError>> {
        Ok(Self {
            user: decode_ext(
                request.user.as_ref().and_then(|u| u.ext.as_ref()),
                "user.ext",
            )?,
            regs: decode_ext(
                request.regs.as_ref().and_then(|r| r.ext.as_ref()),
                "regs.ext",
            )?,
            site: decode_ext(
                request.site.as_ref().and_then(|s| s.ext.as_ref()),
                "site.ext",
            )?,
            app: decode_ext(
                request.app.as_ref().and_then(|a| a.ext.as_ref()),
                "app.ext",
            )?,
            request: decode_ext(request.ext.as_ref(), "ext")?,
        })
    }

    #[must_use]
    pub fn consent(&self) -> Option<&str> {
        self.user.as_ref().and_then(|ext| ext.consent.as_deref())
    }

    #[must_use]
    pub fn gdpr(&self) -> Option<u8> {
        self.regs.as_ref().and_then(|ext| ext.gdpr)
    }

    #[must_use]
    pub fn first_party_data_bidders(&self) -> &[String] {
        self.request
            .as_ref()
            .map(ExtRequest::first_party_data_bidders)
            .unwrap_or_default()
    }
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Number(u8),
        Text(String),
    }

    match Option::<Flag>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Flag::Number(flag)) => Ok(Some(flag)),
        Some(Flag::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(Flag::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("invalid gdpr flag '{text}'"))),
    }
}

/// Decodes a single container; `None` or JSON `null` decode to `None`.
///
/// # Errors
///
/// Returns [`FanoutError::MalformedExtension`] carrying `field`.
pub fn decode_ext<T: DeserializeOwned>(
    value: Option<&Value>,
    field: &str,
) -> Result<Option<T>, Report<FanoutError>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone()).map(Some).map_err(|e| {
            log::warn!("Failed to decode bidRequest.{}", field);
            let message = e.to_string();
            Report::new(e)
                .change_context(FanoutError::MalformedExtension {
                    field: field.to_string(),
                    message,
                })
                .attach(format!("while decoding bidRequest.{field}"))
        }),
    }
}
