/// Port a config proxy listens on when an endpoint does not name one
pub const DEFAULT_PROXY_PORT: u16 = 19090;

/// accept endpoints like `tcp/host:port`, `http://host:port`, `host:port` or
/// plain `host`, and normalize them to `host:port`.
///
/// Returns `None` for blank input.
pub fn normalize_endpoint(addr: &str) -> Option<String> {
    let normalized = addr
        .trim()
        .trim_start_matches("tcp/")
        .trim_start_matches("http://")
        .trim_start_matches("https://")
        .trim_end_matches('/');
    if normalized.is_empty() {
        return None;
    }

    let has_port = normalized
        .rsplit_once(':')
        .map(|(_, port)| port.parse::<u16>().is_ok())
        .unwrap_or(false);

    if has_port {
        Some(normalized.to_string())
    } else {
        Some(format!("{normalized}:{DEFAULT_PROXY_PORT}"))
    }
}

/// Split a comma separated endpoint list, dropping blanks and duplicates while
/// keeping the original order.
pub fn parse_endpoints(list: &str) -> Vec<String> {
    let mut endpoints: Vec<String> = Vec::new();
    for endpoint in list.split(',').filter_map(normalize_endpoint) {
        if !endpoints.contains(&endpoint) {
            endpoints.push(endpoint);
        }
    }
    endpoints
}
