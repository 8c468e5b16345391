//! Web search through DuckDuckGo's HTML endpoint.

use async_trait::async_trait;
use regex::Regex;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, instrument};

use super::{required_str, single_string_schema, Tool};
use crate::config::SearchSettings;
use crate::error::{Result, SvarError};

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// One search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

pub struct SearchTool {
    client: reqwest::Client,
    endpoint: String,
    max_results: usize,
    link_regex: Regex,
    href_regex: Regex,
    snippet_regex: Regex,
    tag_regex: Regex,
}

impl SearchTool {
    pub fn new(endpoint: &str, max_results: usize, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;

        let compile = |pattern: &str| Regex::new(pattern).map_err(|e| SvarError::Config(format!("Invalid regex: {}", e)));

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            max_results,
            link_regex: compile(r#"(?s)<a([^>]*class="[^"]*result__a[^"]*"[^>]*)>(.*?)</a>"#)?,
            href_regex: compile(r#"href="([^"]*)""#)?,
            snippet_regex: compile(r#"(?s)<(?:a|div|td)[^>]*class="[^"]*result__snippet[^"]*"[^>]*>(.*?)</(?:a|div|td)>"#)?,
            tag_regex: compile(r"<[^>]+>")?,
        })
    }

    pub fn from_settings(settings: &SearchSettings) -> Result<Self> {
        Self::new(&settings.endpoint, settings.max_results, settings.timeout_secs)
    }

    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let response = self
            .client
            .post(&self.endpoint)
            .form(&[("q", query)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SvarError::Tool(format!("Search endpoint returned {}", status)));
        }

        let html = response.text().await?;
        let results = self.parse_results(&html);
        debug!("Search returned {} results", results.len());
        Ok(results)
    }

    /// Pull titles, links and snippets out of the results page.
    pub fn parse_results(&self, html: &str) -> Vec<SearchResult> {
        let snippets: Vec<String> = self
            .snippet_regex
            .captures_iter(html)
            .map(|caps| self.clean_text(&caps[1]))
            .collect();

        self.link_regex
            .captures_iter(html)
            .enumerate()
            .filter_map(|(i, caps)| {
                let href = self.href_regex.captures(&caps[1])?.get(1)?.as_str();
                Some(SearchResult {
                    title: self.clean_text(&caps[2]),
                    url: decode_result_link(&decode_entities(href)),
                    snippet: snippets.get(i).cloned().unwrap_or_default(),
                })
            })
            .filter(|r| !r.title.is_empty())
            .take(self.max_results)
            .collect()
    }

    fn clean_text(&self, fragment: &str) -> String {
        let stripped = self.tag_regex.replace_all(fragment, "");
        decode_entities(&stripped)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Result links point at a redirect with the real target in `uddg`.
fn decode_result_link(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href.to_string()
    };

    match url::Url::parse(&absolute) {
        Ok(parsed) => parsed
            .query_pairs()
            .find(|(key, _)| key == "uddg")
            .map(|(_, value)| value.into_owned())
            .unwrap_or(absolute),
        Err(_) => absolute,
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

fn format_results(query: &str, results: &[SearchResult]) -> String {
    if results.is_empty() {
        return format!("No results found for '{}'.", query);
    }

    results
        .iter()
        .enumerate()
        .map(|(i, r)| format!("{}. {}\n   {}\n   {}", i + 1, r.title, r.url, r.snippet))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        "search"
    }

    fn description(&self) -> &str {
        "Searches the web with DuckDuckGo and returns the top results with titles, links and snippets."
    }

    fn parameters_schema(&self) -> Option<Value> {
        Some(single_string_schema("query", "The search query"))
    }

    async fn execute(&self, arguments: &Map<String, Value>) -> Result<String> {
        let query = required_str(arguments, "query")?;
        let results = self.search(query).await?;
        Ok(format_results(query, &results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CannedResponse, Responder};
    use serde_json::json;

    const FIXTURE: &str = r#"
<div class="result results_links results_links_deep web-result ">
  <div class="links_main links_deep result__body">
    <h2 class="result__title">
      <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fen.wikipedia.org%2Fwiki%2FParis&amp;rut=abc">Paris - <b>Wikipedia</b></a>
    </h2>
    <a class="result__snippet" href="//duckduckgo.com/l/?uddg=x">Paris is the <b>capital</b> and largest city of France.</a>
  </div>
</div>
<div class="result results_links results_links_deep web-result ">
  <div class="links_main links_deep result__body">
    <h2 class="result__title">
      <a rel="nofollow" class="result__a" href="https://www.britannica.com/place/Paris">Paris | History &amp; Facts</a>
    </h2>
    <a class="result__snippet" href="https://www.britannica.com/place/Paris">It&#x27;s the capital.</a>
  </div>
</div>
"#;

    fn tool(endpoint: &str, max_results: usize) -> SearchTool {
        SearchTool::new(endpoint, max_results, 5).unwrap()
    }

    #[test]
    fn test_parse_results() {
        let results = tool("http://unused", 5).parse_results(FIXTURE);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Paris - Wikipedia");
        assert_eq!(results[0].url, "https://en.wikipedia.org/wiki/Paris");
        assert_eq!(results[0].snippet, "Paris is the capital and largest city of France.");
        assert_eq!(results[1].title, "Paris | History & Facts");
        assert_eq!(results[1].url, "https://www.britannica.com/place/Paris");
        assert_eq!(results[1].snippet, "It's the capital.");
    }

    #[test]
    fn test_parse_respects_max_results() {
        assert_eq!(tool("http://unused", 1).parse_results(FIXTURE).len(), 1);
        assert!(tool("http://unused", 5).parse_results("<html>no results</html>").is_empty());
    }

    #[test]
    fn test_format_results() {
        assert_eq!(format_results("xyz", &[]), "No results found for 'xyz'.");

        let results = vec![SearchResult {
            title: "T".to_string(),
            url: "https://a".to_string(),
            snippet: "S".to_string(),
        }];
        assert_eq!(format_results("q", &results), "1. T\n   https://a\n   S");
    }

    #[tokio::test]
    async fn test_execute_against_endpoint() {
        let responder = Responder::start(vec![CannedResponse::text(200, "text/html", FIXTURE)]).await;
        let search = tool(&format!("{}/html/", responder.base_url), 5);

        let arguments = json!({"query": "capital of France"});
        let output = search.execute(arguments.as_object().unwrap()).await.unwrap();

        assert!(output.starts_with("1. Paris - Wikipedia"));
        let request = &responder.requests()[0];
        assert!(request.request_line.starts_with("POST /html/"));
        assert_eq!(String::from_utf8_lossy(&request.body), "q=capital+of+France");
    }

    #[tokio::test]
    async fn test_missing_query() {
        let search = tool("http://127.0.0.1:1", 5);
        assert!(matches!(
            search.execute(&Map::new()).await,
            Err(SvarError::InvalidInput(_))
        ));
    }
}
