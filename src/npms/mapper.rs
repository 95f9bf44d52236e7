//! Maps npms search responses to display records

use serde::Deserialize;

use super::{DisplayRecord, SearchError};

/// Body of a successful `/v2/search` response
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
}

/// A single ranked hit
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResult {
    pub package: Package,
}

/// Package metadata nested in a hit
#[derive(Debug, Clone, Deserialize)]
pub struct Package {
    pub name: String,
    /// Some packages are published without a description
    #[serde(default)]
    pub description: String,
    pub links: PackageLinks,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PackageLinks {
    pub npm: String,
}

/// Decodes a response body, rejecting anything that does not match the expected shape
///
/// A body that does not parse as JSON is `SearchError::InvalidJson`; valid JSON
/// with the wrong structure is `SearchError::Decode`.
pub fn decode(body: &str) -> Result<SearchResponse, SearchError> {
    let value: serde_json::Value = serde_json::from_str(body).map_err(SearchError::InvalidJson)?;
    Ok(serde_json::from_value(value)?)
}

/// Converts decoded results into display records, keeping the API's ranking order
pub fn map(response: SearchResponse) -> Vec<DisplayRecord> {
    response
        .results
        .into_iter()
        .map(|result| {
            let package = result.package;
            DisplayRecord {
                id: package.name.clone(),
                title: package.name,
                value: package.links.npm,
                subtitle: package.description,
            }
        })
        .collect()
}
