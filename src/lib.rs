//! CivicConnect - civic issue reporting backend
//!
//! Citizens report located issues, vote and comment on them; verified
//! officials acknowledge, reply to and resolve them.
//!
//! ## Modules
//!
//! - **auth**: argon2 passwords, HS256 JWTs and role checks
//! - **db**: MongoDB schemas and the `CivicStore` seam (MongoDB or in-memory)
//! - **feed**: urgency, trending and prioritized scores; proximity clustering
//! - **routes**: REST handlers behind a single dispatcher
//! - **server**: hyper accept loop and shared state

pub mod auth;
pub mod config;
pub mod db;
pub mod feed;
pub mod logging;
pub mod routes;
pub mod server;
pub mod services;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{CivicError, Result};
