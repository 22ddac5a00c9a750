//! Cookie-backed store of previously synced buyer ids.
//!
//! The `uids` cookie holds base64-encoded JSON keyed by cookie family:
//!
//! ```json
//! {"uids": {"adnxs": "12345"}, "tempUIDs": {"rubicon": {"uid": "abc", "expires": "2030-01-01T00:00:00Z"}}}
//! ```
//!
//! `tempUIDs` entries win over legacy `uids` entries and are ignored once
//! expired.

use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use cookie::{Cookie, CookieJar};
use error_stack::{Report, ResultExt};
use serde::Deserialize;

use crate::constants::UIDS_COOKIE_NAME;
use crate::error::FanoutError;

/// Source of per-cookie-family buyer ids persisted on the user agent.
pub trait CookieStore: Send + Sync {
    /// Returns the buyer id synced for `cookie_family`, if any.
    fn uid_for(&self, cookie_family: &str) -> Option<String>;
}

#[derive(Debug, Clone, Deserialize)]
struct UidWithExpiry {
    uid: String,
    #[serde(default)]
    expires: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct UidsPayload {
    #[serde(default)]
    uids: HashMap<String, String>,
    #[serde(default, rename = "tempUIDs")]
    temp_uids: HashMap<String, UidWithExpiry>,
    #[serde(default)]
    optout: bool,
}

/// Decoded `uids` cookie.
#[derive(Debug, Clone, Default)]
pub struct UidsCookie {
    payload: UidsPayload,
}

/// Jar of the cookies in a `Cookie` header; malformed pairs are dropped.
fn request_cookie_jar(header_value: &str) -> CookieJar {
    let mut jar = CookieJar::new();
    for cookie in Cookie::split_parse(header_value.trim().to_owned()).filter_map(Result::ok) {
        jar.add_original(cookie);
    }
    jar
}

impl UidsCookie {
    /// Builds a store directly from family → uid pairs.
    #[must_use]
    pub fn from_uids(uids: HashMap<String, String>) -> Self {
        Self {
            payload: UidsPayload {
                uids,
                ..Default::default()
            },
        }
    }

    /// Decodes the base64 JSON value of a `uids` cookie.
    ///
    /// # Errors
    ///
    /// Returns [`FanoutError::InvalidUidsCookie`] if the value is not base64 or
    /// the decoded bytes are not the expected JSON shape.
    pub fn parse(value: &str) -> Result<Self, Report<FanoutError>> {
        let bytes = BASE64
            .decode(value.trim())
            .change_context(FanoutError::InvalidUidsCookie {
                message: "value is not valid base64".to_string(),
            })?;
        let payload: UidsPayload =
            serde_json::from_slice(&bytes).change_context(FanoutError::InvalidUidsCookie {
                message: "value is not a uids JSON document".to_string(),
            })?;

        Ok(Self { payload })
    }

    /// Reads the `uids` cookie out of a `Cookie` header value.
    ///
    /// A missing or undecodable cookie yields an empty store: a broken cookie
    /// only means no buyer ids are known for this user.
    #[must_use]
    pub fn from_cookie_header(header_value: &str) -> Self {
        let jar = request_cookie_jar(header_value);
        let Some(cookie) = jar.get(UIDS_COOKIE_NAME) else {
            log::debug!("No {} cookie found in request", UIDS_COOKIE_NAME);
            return Self::default();
        };

        match Self::parse(cookie.value()) {
            Ok(uids) => uids,
            Err(e) => {
                log::warn!("Ignoring unreadable {} cookie: {:?}", UIDS_COOKIE_NAME, e);
                Self::default()
            }
        }
    }

    /// Whether the user opted out of buyer id syncing.
    #[must_use]
    pub fn is_opted_out(&self) -> bool {
        self.payload.optout
    }

    fn uid_at(&self, cookie_family: &str, now: DateTime<Utc>) -> Option<String> {
        if self.payload.optout {
            return None;
        }

        let temp = self
            .payload
            .temp_uids
            .get(cookie_family)
            .filter(|entry| entry.expires.is_none_or(|expires| expires > now))
            .map(|entry| entry.uid.as_str());

        temp.or_else(|| self.payload.uids.get(cookie_family).map(String::as_str))
            .filter(|uid| !uid.trim().is_empty())
            .map(str::to_string)
    }
}

impl CookieStore for UidsCookie {
    fn uid_for(&self, cookie_family: &str) -> Option<String> {
        self.uid_at(cookie_family, Utc::now())
    }
}
