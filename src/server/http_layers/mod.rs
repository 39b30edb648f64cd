mod http_cache;
mod random_slowdown;
mod requests_logging;

pub use http_cache::http_cache;
#[allow(unused_imports)] // Only wired with the slowdown feature
pub use random_slowdown::slowdown_request;
pub use requests_logging::{log_requests, RequestsLoggingLevel};
