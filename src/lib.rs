//! Anonymous mailbox share-link gate.

pub mod admin;
pub mod audit;
pub mod config;
pub mod guard;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod security;
pub mod share;

pub use config::schema::GateConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
