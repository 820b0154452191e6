//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (tag each request and its response)

pub mod request_id;

pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
