//! Rendering of search results for the terminal

use crate::cli::OutputFormat;
use crate::npms::{DisplayRecord, SearchError};

/// Renders the records for one query
///
/// `heading` is printed above text output when several queries are shown together.
pub fn render(
    records: &[DisplayRecord],
    format: OutputFormat,
    heading: Option<&str>,
) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Json => serde_json::to_string(records),
        OutputFormat::Text => Ok(render_text(records, heading)),
    }
}

fn render_text(records: &[DisplayRecord], heading: Option<&str>) -> String {
    let mut out = String::new();
    if let Some(heading) = heading {
        out.push_str(&format!("== {} ==\n", heading));
    }
    if records.is_empty() {
        out.push_str("No packages found\n");
        return out;
    }
    for record in records {
        out.push_str(&record.title);
        out.push('\n');
        if !record.subtitle.is_empty() {
            out.push_str(&format!("    {}\n", record.subtitle));
        }
        out.push_str(&format!("    {}\n", record.value));
    }
    out
}

/// One-line message for a failed query, preferring the API's own error message
pub fn describe_error(query: &str, err: &SearchError) -> String {
    match err.api_error() {
        Some(api) => format!("Search for '{}' failed: {} ({})", query, api.message, api.code),
        None => format!("Search for '{}' failed: {}", query, err),
    }
}
