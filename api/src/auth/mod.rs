//! Request authentication
//!
//! Promoter-scoped routes read the caller from a gateway-injected header.

mod promoter;

pub use promoter::promoter_middleware;
