//! Common library for the todo web application
//!
//! This crate provides the pieces shared by the web service and its tests:
//! the backend API client, the models it exchanges and its error type.

pub mod backend;
pub mod error;
pub mod models;

pub use backend::{BackendApi, BackendClient, BackendConfig};
pub use error::{BackendError, BackendResult};
