use axum::http::HeaderMap;

/// Identity used when no forwarding header names the caller.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Derive a client identity from proxy headers.
///
/// Uses the first entry of `X-Forwarded-For`, then `X-Real-IP`, then
/// [`UNKNOWN_CLIENT`]. Clients without either header share one bucket.
pub fn client_id(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    forwarded
        .or_else(real_ip)
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}
