//! Wikipedia lookup tool backed by the MediaWiki action API.

use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::types::{ToolHandler, ToolSchema};
use crate::config::WikipediaSettings;

pub const TOOL_NAME: &str = "wikipedia";
pub const NO_RESULT: &str = "No good Wikipedia Search Result was found";
const MAX_QUERY_CHARS: usize = 300;
const USER_AGENT: &str = concat!("wiki-agent/", env!("CARGO_PKG_VERSION"));

const DESCRIPTION: &str = "A wrapper around Wikipedia. Useful for when you need to answer general \
questions about people, places, companies, facts, historical events, or other subjects. \
Input should be a search query.";

pub struct WikipediaTool {
    client: Client,
    api_url: String,
    top_k_results: usize,
    doc_content_chars_max: usize,
}

impl WikipediaTool {
    pub fn new(settings: &WikipediaSettings) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| err.to_string())?;
        Ok(Self {
            client,
            api_url: format!("https://{}.wikipedia.org/w/api.php", settings.lang),
            top_k_results: settings.top_k_results,
            doc_content_chars_max: settings.doc_content_chars_max,
        })
    }

    pub fn schema() -> ToolSchema {
        ToolSchema {
            name: TOOL_NAME.to_string(),
            description: DESCRIPTION.to_string(),
            parameters: Some(json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "query to look up on wikipedia"
                    }
                },
                "required": ["query"]
            })),
        }
    }

    pub fn into_handler(self) -> ToolHandler {
        let tool = Arc::new(self);
        Arc::new(move |args: Value| {
            let query = args
                .get("query")
                .and_then(|v| v.as_str())
                .ok_or_else(|| "missing required argument: query".to_string())?;
            tool.run(query).map(Value::String)
        })
    }

    /// Search, then summarize the top pages.
    pub fn run(&self, query: &str) -> Result<String, String> {
        let query: String = query.chars().take(MAX_QUERY_CHARS).collect();
        let titles = self.search(&query)?;
        debug!(%query, hits = titles.len(), "wikipedia search");

        let mut pages = Vec::new();
        for title in titles.into_iter().take(self.top_k_results) {
            match self.fetch_summary(&title) {
                Ok(Some(summary)) => pages.push((title, summary)),
                Ok(None) => {}
                Err(err) => warn!(%title, error = %err, "failed to fetch wikipedia page"),
            }
        }
        Ok(format_summaries(&pages, self.doc_content_chars_max))
    }

    fn search(&self, query: &str) -> Result<Vec<String>, String> {
        let limit = self.top_k_results.to_string();
        let body = self.get(&[
            ("action", "query"),
            ("list", "search"),
            ("srsearch", query),
            ("srlimit", limit.as_str()),
            ("format", "json"),
            ("utf8", "1"),
        ])?;
        Ok(parse_search_titles(&body))
    }

    fn fetch_summary(&self, title: &str) -> Result<Option<String>, String> {
        let body = self.get(&[
            ("action", "query"),
            ("prop", "extracts"),
            ("exintro", "1"),
            ("explaintext", "1"),
            ("redirects", "1"),
            ("titles", title),
            ("format", "json"),
        ])?;
        Ok(parse_extract(&body))
    }

    fn get(&self, params: &[(&str, &str)]) -> Result<Value, String> {
        let resp = self
            .client
            .get(&self.api_url)
            .query(params)
            .send()
            .map_err(|err| err.to_string())?;
        let status = resp.status();
        if !status.is_success() {
            return Err(format!("wikipedia http {}", status.as_u16()));
        }
        resp.json::<Value>().map_err(|err| err.to_string())
    }
}

pub(crate) fn parse_search_titles(body: &Value) -> Vec<String> {
    body.pointer("/query/search")
        .and_then(|v| v.as_array())
        .map(|hits| {
            hits.iter()
                .filter_map(|hit| hit.get("title").and_then(|t| t.as_str()))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

pub(crate) fn parse_extract(body: &Value) -> Option<String> {
    let pages = body.pointer("/query/pages")?.as_object()?;
    pages
        .values()
        .filter(|page| page.get("missing").is_none())
        .filter_map(|page| page.get("extract").and_then(|e| e.as_str()))
        .map(str::trim)
        .find(|extract| !extract.is_empty())
        .map(str::to_string)
}

pub(crate) fn format_summaries(pages: &[(String, String)], max_chars: usize) -> String {
    if pages.is_empty() {
        return NO_RESULT.to_string();
    }
    let joined = pages
        .iter()
        .map(|(title, summary)| format!("Page: {}\nSummary: {}", title, summary))
        .collect::<Vec<_>>()
        .join("\n\n");
    joined.chars().take(max_chars).collect()
}
