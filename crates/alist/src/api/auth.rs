use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use url::Url;

use super::types::{LoginData, MeData};
use super::{endpoint, ApiError, ApiRequest};

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl ApiRequest for LoginRequest {
    type Response = LoginData;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        Ok(client.post(endpoint(base_url, "/api/auth/login")?).json(&self))
    }
}

/// Current user, used to validate a static token
#[derive(Debug, Clone, Default)]
pub struct MeRequest;

impl ApiRequest for MeRequest {
    type Response = MeData;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        Ok(client.get(endpoint(base_url, "/api/me")?))
    }
}
