//! Geographic masking for privacy-regulated requests.
//!
//! COPPA removes everything that pins a user to a location finer than
//! region/country. GDPR keeps the geo object but coarsens coordinates to two
//! decimal places (roughly 1.1 km).

use crate::openrtb::Geo;

/// Clears precise location fields for COPPA.
///
/// Drops `lat`, `lon`, `metro`, `city` and `zip`. Returns `None` when nothing
/// remains, so an emptied geo is omitted rather than sent as `{}`.
#[must_use]
pub fn mask_geo_for_coppa(geo: Option<&Geo>) -> Option<Geo> {
    let masked = Geo {
        lat: None,
        lon: None,
        metro: None,
        city: None,
        zip: None,
        ..geo?.clone()
    };

    if masked == Geo::default() {
        None
    } else {
        Some(masked)
    }
}

/// Rounds `lat`/`lon` to two decimal places for GDPR, leaving other fields.
#[must_use]
pub fn mask_geo_for_gdpr(geo: Option<&Geo>) -> Option<Geo> {
    geo.map(|geo| Geo {
        lat: geo.lat.map(round_coordinate),
        lon: geo.lon.map(round_coordinate),
        ..geo.clone()
    })
}

/// Applies the COPPA rule when `coppa` is set, otherwise the GDPR rule.
#[must_use]
pub fn mask_geo(geo: Option<&Geo>, coppa: bool) -> Option<Geo> {
    if coppa {
        mask_geo_for_coppa(geo)
    } else {
        mask_geo_for_gdpr(geo)
    }
}

// Halves round away from zero on the scaled value: 0.125 -> 0.13.
fn round_coordinate(coordinate: f64) -> f64 {
    (coordinate * 100.0).round() / 100.0
}
