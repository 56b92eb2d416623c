//! Liveness endpoints.

/// Banner at the root path.
pub async fn home() -> &'static str {
    "Merch order service is running"
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check upstreams.
pub async fn health() -> &'static str {
    "ok"
}
