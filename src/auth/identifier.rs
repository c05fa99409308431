use actix_web::HttpRequest;

pub const UNKNOWN_IDENTIFIER: &str = "unknown";

/// Derive the rate-limit identifier for a request: the first hop of
/// `X-Forwarded-For`, then `X-Real-IP`, then `"unknown"`.
///
/// The storefront sits behind a proxy, so the peer address is never used.
pub fn client_identifier(req: &HttpRequest) -> String {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    header("x-forwarded-for")
        .and_then(|v| v.split(',').next().map(|s| s.trim().to_string()))
        .filter(|s| !s.is_empty())
        .or_else(|| header("x-real-ip").map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
        .unwrap_or_else(|| UNKNOWN_IDENTIFIER.to_string())
}
