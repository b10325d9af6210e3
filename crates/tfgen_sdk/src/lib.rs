//! # tfgen_sdk
//!
//! Discovery client for the DuploCloud management plane.
//!
//! Generators only depend on the [`DiscoveryClient`] trait. [`HttpClient`]
//! talks to the real API; [`MockClient`] serves canned records in tests.

pub mod client;
pub mod error;
pub mod http;
pub mod mock;
pub mod models;

pub use client::DiscoveryClient;
pub use error::{ClientError, ClientResult};
pub use http::{HttpClient, HOST_ENV, TOKEN_ENV};
pub use mock::MockClient;
pub use models::*;
