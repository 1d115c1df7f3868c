//! HTTP client module
//!
//! Single-attempt GET requests against open-data endpoints.
//!
//! # Features
//!
//! - **Status Classification**: non-2xx responses fail with the status code
//! - **Idle Timeouts**: slow but steady downloads are never cut off
//! - **Content-Type Checks**: responses must match the requested format
//! - **Pacing**: optional token bucket rate limiter using governor

mod client;
mod rate_limit;

pub use client::{
    check_content_type, read_text, transport_error, HttpClient, HttpClientConfig,
    HttpClientConfigBuilder, RequestConfig,
};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
