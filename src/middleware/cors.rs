//! CORS policy for the demo frontend.
//!
//! Responsibility:
//! - Answer preflight requests for `/api/v1/policies`.
//! - Attach CORS headers to every response, including 4xx/5xx error responses,
//!   so the browser can read the error body.
//!
//! Policy:
//! - `CORS_ALLOWED_ORIGINS` unset, empty or `*`: Allow-Origin `*`, no credentials.
//! - Otherwise: exact-match allowlist, no credentials.

use axum::Router;
use axum::http::{HeaderName, HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::{Config, CorsOrigins};

pub fn layer(origins: &CorsOrigins) -> CorsLayer {
    let allow_origin = match origins {
        CorsOrigins::Any => AllowOrigin::from(Any),
        CorsOrigins::List(list) => {
            // Unparsable entries are dropped; an empty list allows nothing.
            let allowed: Vec<HeaderValue> = list
                .iter()
                .filter_map(|s| HeaderValue::from_str(s).ok())
                .collect();
            AllowOrigin::list(allowed)
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static("x-request-id"),
        ])
        .max_age(std::time::Duration::from_secs(60 * 10))
}

/// Apply CORS policy to the given Router.
pub fn apply(router: Router, config: &Config) -> Router {
    router.layer(layer(&config.cors_allowed_origins))
}
