/// Masks an IPv4 address by zeroing its last dot-delimited group.
///
/// `"192.168.5.9"` becomes `"192.168.5.0"`. Empty input is returned as is.
#[must_use]
pub fn mask_ipv4(ip: &str) -> String {
    mask_last_group(ip, '.')
}

/// Masks an IPv6 address by zeroing its last colon-delimited group.
///
/// `"2001:db8::1"` becomes `"2001:db8::0"`.
#[must_use]
pub fn mask_ipv6(ip: &str) -> String {
    mask_last_group(ip, ':')
}

// Input without the delimiter collapses to "0".
fn mask_last_group(ip: &str, delimiter: char) -> String {
    if ip.is_empty() {
        return String::new();
    }
    let prefix = ip.rfind(delimiter).map_or("", |idx| &ip[..=idx]);
    format!("{prefix}0")
}
