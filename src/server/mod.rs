//! HTTP server for civicconnect

mod http;

pub use http::{run, AppState};
