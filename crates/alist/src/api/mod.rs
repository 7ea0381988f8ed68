//! Alist v3 HTTP API

pub mod auth;
pub mod client;
pub mod error;
pub mod fs;
pub mod types;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use url::Url;

pub use client::ApiClient;
pub use error::ApiError;
pub use types::{Item, PutData};

/// A single API call: knows its route and how to shape the request.
/// [`ApiClient::call`] sends it, checks the HTTP status and unwraps the
/// JSON envelope into `Response`.
pub trait ApiRequest {
    type Response: DeserializeOwned;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError>;
}

/// Resolve an API route against the base URL, keeping any path prefix the
/// base carries (a server mounted under `/alist/` for instance).
pub(crate) fn endpoint(base_url: &Url, route: &str) -> Result<Url, ApiError> {
    Ok(base_url.join(route.trim_start_matches('/'))?)
}
