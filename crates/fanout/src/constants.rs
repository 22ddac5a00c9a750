/// Reserved `imp.ext` key carrying request-wide prebid options.
pub const PREBID_EXT: &str = "prebid";
/// Reserved `imp.ext` key carrying first-party contextual data.
pub const CONTEXT_EXT: &str = "context";
/// Key under which a bidder finds its own params in a sanitized `imp.ext`.
pub const BIDDER_EXT: &str = "bidder";
/// First-party data block inside `user.ext`, `site.ext` and `app.ext`.
pub const DATA_EXT: &str = "data";
/// List of first-party-data bidders inside `ext.prebid.data`.
pub const FPD_BIDDERS_EXT: &str = "bidders";

/// Cookie holding previously synced per-family buyer ids.
pub const UIDS_COOKIE_NAME: &str = "uids";

/// Environment prefix for settings overrides, e.g. `BIDDER_FANOUT__FANOUT__SHUFFLE`.
pub const ENV_PREFIX: &str = "BIDDER_FANOUT";
