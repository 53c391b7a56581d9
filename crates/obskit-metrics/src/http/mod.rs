//! HTTP exposition: the metrics route, request-timing middleware, and the
//! optional internal listener.

pub mod middleware;
pub mod route;
pub(crate) mod server;

pub use middleware::{RequestTiming, API_REQUEST_MEASURE};
