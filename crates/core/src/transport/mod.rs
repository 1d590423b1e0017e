//! Transport abstraction.
//!
//! The core treats HTTP as an opaque `send(request) -> response` capability so
//! that proxies, DDoS-bypass helpers and test doubles can be swapped in.

mod http;
mod mirrors;
mod types;

pub use http::HttpTransport;
pub use mirrors::{Failover, MirrorSet};
pub use types::*;
