//! Caller authentication: Firebase ID token and App Check verification

pub mod middleware;
pub mod models;
