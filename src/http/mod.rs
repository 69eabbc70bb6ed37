//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Request
//!     → server.rs (router, request ID, optional dev guard)
//!     → request.rs (client IP, User-Agent, requester email)
//!     → handlers.rs (access guard, audit entry)
//!     → response.rs (uniform denial or no-store JSON)
//!     → Send to client
//! ```

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;
pub mod user_agent;

pub use request::ClientInfo;
pub use server::{AppState, HttpServer};
