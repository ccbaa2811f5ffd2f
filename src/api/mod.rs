//! API layer - health and readiness probes

pub mod health;
pub mod router;
pub mod state;

pub use router::create_router;
pub use state::AppState;
