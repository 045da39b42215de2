//! Parse REST client
//!
//! Implements [`QueryEngine`] over the Parse REST API. Each `find` is a
//! single `GET /classes/<ClassName>` request; failures are returned as-is
//! and never retried.

use super::rate_limit::RateLimiter;
use crate::config::ParseConfig;
use crate::engine::{FindOptions, QueryEngine};
use crate::error::{Error, Result};
use crate::query::Query;
use crate::types::Record;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use tracing::debug;
use url::Url;

/// Header carrying the application id
pub const HEADER_APPLICATION_ID: &str = "X-Parse-Application-Id";
/// Header carrying the REST API key
pub const HEADER_REST_API_KEY: &str = "X-Parse-REST-API-Key";
/// Header carrying the master key
pub const HEADER_MASTER_KEY: &str = "X-Parse-Master-Key";
/// Header carrying a user session token
pub const HEADER_SESSION_TOKEN: &str = "X-Parse-Session-Token";

/// Successful query response body
#[derive(Debug, Deserialize)]
struct FindResponse {
    results: Vec<Record>,
}

/// Parse error response body
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    code: i64,
    error: String,
}

/// Query engine backed by a Parse server
pub struct ParseClient {
    client: Client,
    config: ParseConfig,
    base_url: Url,
    rate_limiter: Option<RateLimiter>,
}

impl ParseClient {
    /// Create a client, validating the configuration
    pub fn new(config: ParseConfig) -> Result<Self> {
        let base_url = config.validate()?;

        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(&config.user_agent)
            .build()?;

        let rate_limiter = config.rate_limit.as_ref().map(RateLimiter::new);

        Ok(Self {
            client,
            config,
            base_url,
            rate_limiter,
        })
    }

    /// Configuration in use
    pub fn config(&self) -> &ParseConfig {
        &self.config
    }

    /// Check if rate limiting is enabled
    pub fn has_rate_limiter(&self) -> bool {
        self.rate_limiter.is_some()
    }

    /// URL of a class endpoint
    pub fn class_url(&self, class_name: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::invalid_value("parse.server_url", "cannot be a base URL"))?
            .pop_if_empty()
            .extend(["classes", class_name]);
        Ok(url)
    }

    /// Build the query-string parameters for a query
    fn query_params(query: &Query) -> Result<Vec<(&'static str, String)>> {
        let mut params = Vec::new();
        if !query.constraints.is_empty() {
            params.push(("where", query.where_param()?));
        }
        if let Some(limit) = query.limit {
            params.push(("limit", limit.to_string()));
        }
        if query.skip > 0 {
            params.push(("skip", query.skip.to_string()));
        }
        if let Some(order) = query.order_param() {
            params.push(("order", order));
        }
        Ok(params)
    }

    /// Attach credentials for this call
    fn authorize(&self, mut req: RequestBuilder, options: &FindOptions) -> Result<RequestBuilder> {
        req = req.header(HEADER_APPLICATION_ID, &self.config.application_id);

        if let Some(key) = &self.config.rest_api_key {
            req = req.header(HEADER_REST_API_KEY, key);
        }

        if options.use_master_key() {
            let key = self.config.master_key.as_ref().ok_or_else(|| {
                Error::config("useMasterKey requested but no master key is configured")
            })?;
            req = req.header(HEADER_MASTER_KEY, key);
        }

        if let Some(token) = options.session_token() {
            req = req.header(HEADER_SESSION_TOKEN, token);
        }

        Ok(req)
    }
}

#[async_trait]
impl QueryEngine for ParseClient {
    async fn find(&self, query: &Query, options: &FindOptions) -> Result<Vec<Record>> {
        query.validate()?;

        let url = self.class_url(&query.class_name)?;
        let params = Self::query_params(query)?;
        let req = self.authorize(self.client.get(url.clone()).query(&params), options)?;

        if let Some(limiter) = &self.rate_limiter {
            limiter.wait().await;
        }

        let response = req.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(error_from_response(status, body));
        }

        let parsed: FindResponse = serde_json::from_str(&body)
            .map_err(|e| Error::decode(format!("invalid query response from {url}: {e}")))?;

        debug!(
            "GET {} skip={} returned {} records",
            url,
            query.skip,
            parsed.results.len()
        );

        Ok(parsed.results)
    }
}

impl std::fmt::Debug for ParseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParseClient")
            .field("config", &self.config)
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish_non_exhaustive()
    }
}

/// Map a non-success response to an error, preferring Parse's own code
fn error_from_response(status: StatusCode, body: String) -> Error {
    match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(parsed) => Error::parse(parsed.code, parsed.error),
        Err(_) => Error::http_status(status.as_u16(), body),
    }
}
