//! HTTP surface - route dispatch, auth gate, CORS, error envelope
//!
//! This layer is deliberately thin: handlers validate, call the store and
//! the aggregation engine, and serialize the result. All state they touch
//! arrives through `AppState`; nothing is read from the environment at
//! request time.

mod auth;
mod entries;
mod error;
mod habits;
mod insights;
mod server;
mod state;

pub use server::serve;
pub use state::AppState;
