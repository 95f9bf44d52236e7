//! npms.io search API
//!
//! Types shared by the HTTP client, the response mapper, and the search
//! orchestrator: the flat display record handed to hosts and the error type for
//! everything that can go wrong while producing one.

pub mod client;
pub mod mapper;

pub use client::{NpmsClient, SearchTransport, NPMS_SEARCH_URL};
pub use mapper::{decode, map, SearchResponse};

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::CacheError;

/// One search result, flattened for display
///
/// All four fields are always present; `subtitle` is empty when the package
/// has no description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayRecord {
    /// Fully qualified package name
    pub id: String,
    /// Label shown to the user (the package name)
    pub title: String,
    /// npm package page URL, as supplied by the API
    pub value: String,
    /// Package description
    pub subtitle: String,
}

/// Errors that can occur while searching for packages
#[derive(Debug, Error)]
pub enum SearchError {
    /// The HTTP request could not be completed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status
    #[error("Search endpoint returned {status}: {body}")]
    Endpoint {
        /// HTTP status of the response
        status: StatusCode,
        /// Raw response body
        body: String,
    },

    /// The response body was not JSON at all (an HTML error page, a truncated body)
    #[error("Search response is not valid JSON: {0}")]
    InvalidJson(serde_json::Error),

    /// The response body was JSON but did not have the expected shape
    #[error("Failed to decode search response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The cache store failed
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Error payload returned by the npms API, e.g. `{"code":"INVALID_PARAMETER","message":"..."}`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl SearchError {
    /// Whether a stale cached value may stand in for this failure
    ///
    /// Only failures to obtain a usable response qualify, including a body that
    /// is not JSON. Well-formed JSON of the wrong shape and cache failures are
    /// reported as they are.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SearchError::Request(_) | SearchError::Endpoint { .. } | SearchError::InvalidJson(_)
        )
    }

    /// Raw body of the endpoint's error response
    pub fn response_body(&self) -> Option<&str> {
        match self {
            SearchError::Endpoint { body, .. } => Some(body),
            _ => None,
        }
    }

    /// The endpoint's error payload, when the body is one
    pub fn api_error(&self) -> Option<ApiError> {
        self.response_body()
            .and_then(|body| serde_json::from_str(body).ok())
    }
}
