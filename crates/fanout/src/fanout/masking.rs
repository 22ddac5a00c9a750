//! Identity and location masking applied to a single bidder's request.
//!
//! Inputs are borrowed from the shared request and never modified; every
//! bidder receives freshly built copies.

use serde_json::{Map, Value};

use crate::geo::mask_geo;
use crate::ip::{mask_ipv4, mask_ipv6};
use crate::openrtb::{Device, Regs, User};

use super::extensions::ExtRegs;
use super::privacy::PrivacyDecision;

const HASH_SUFFIXES: [&str; 2] = ["sha1", "md5"];

/// The identity-bearing parts of a request as one bidder will see them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaskedIdentity {
    pub user: Option<User>,
    pub device: Option<Device>,
    pub regs: Option<Regs>,
    /// Whether any masking rule fired for this bidder.
    pub masking_applied: bool,
}

/// Masks `user`, `device` and `regs` according to `decision`.
///
/// Values pass through unchanged when neither COPPA nor GDPR masking is
/// required.
#[must_use]
pub fn mask(
    user: Option<&User>,
    device: Option<&Device>,
    regs: Option<&Regs>,
    regs_ext: Option<&ExtRegs>,
    decision: PrivacyDecision,
) -> MaskedIdentity {
    if !decision.masking_required() {
        return MaskedIdentity {
            user: user.cloned(),
            device: device.cloned(),
            regs: regs.cloned(),
            masking_applied: false,
        };
    }

    let coppa = decision.coppa_masking_required;
    let regs = if decision.gdpr_masking_required {
        with_gdpr_flag(regs, regs_ext)
    } else {
        regs.cloned()
    };

    MaskedIdentity {
        user: user.map(|user| mask_user(user, coppa)),
        device: device.map(|device| mask_device(device, coppa)),
        regs,
        masking_applied: true,
    }
}

fn mask_user(user: &User, coppa: bool) -> User {
    let masked = User {
        buyeruid: None,
        geo: mask_geo(user.geo.as_ref(), coppa),
        ..user.clone()
    };

    if coppa {
        User {
            id: None,
            yob: None,
            gender: None,
            ..masked
        }
    } else {
        masked
    }
}

fn mask_device(device: &Device, coppa: bool) -> Device {
    Device {
        ip: device.ip.as_deref().map(mask_ipv4),
        ipv6: device.ipv6.as_deref().map(mask_ipv6),
        geo: mask_geo(device.geo.as_ref(), coppa),
        ifa: None,
        didsha1: None,
        didmd5: None,
        dpidsha1: None,
        dpidmd5: None,
        macsha1: None,
        macmd5: None,
        extra: device
            .extra
            .iter()
            .filter(|(key, _)| !is_hashed_id(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
        ..device.clone()
    }
}

fn is_hashed_id(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    HASH_SUFFIXES.iter().any(|suffix| key.ends_with(suffix))
}

// Marks GDPR as applying unless the request already states it either way.
fn with_gdpr_flag(regs: Option<&Regs>, regs_ext: Option<&ExtRegs>) -> Option<Regs> {
    if regs_ext.and_then(|ext| ext.gdpr).is_some() {
        return regs.cloned();
    }

    let regs = regs.cloned().unwrap_or_default();
    let mut ext = match &regs.ext {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    };
    ext.insert("gdpr".to_string(), Value::from(1));

    Some(Regs {
        ext: Some(Value::Object(ext)),
        ..regs
    })
}
