//! Single-session browser automation for a chat web application.
//!
//! Turns a JavaScript-rendered chat UI into a request/response and
//! request/stream service over one long-lived Chrome session: load the
//! captured login state, keep one page warm, inject prompts, and poll the
//! DOM to detect and diff the growing assistant reply.
//!
//! The HTTP boundary, the interactive login-capture flow, and any tunneling
//! live outside this crate. They consume [`DriverSession`] and
//! [`QueryEngine`] and must serialize queries: the page is a single shared
//! mutable resource and only one query may be in flight per session.

pub mod auth;
pub mod config;
pub mod error;
pub mod inject;
pub mod observe;
pub mod query;
pub mod session;
pub mod surface;

pub use auth::StorageState;
pub use config::{Config, Selectors, Timing};
pub use error::{RelayError, Result};
pub use observe::{GenerationPhase, PhaseTracker};
pub use query::QueryEngine;
pub use session::DriverSession;
pub use surface::{ChatSurface, LivePage};
