//! Web search via the DuckDuckGo Instant Answer API

use super::{optional_usize, require_str, Tool, WEB_SEARCH};
use crate::error::AdvisorError;
use crate::models::{ToolInput, ToolOutput};
use crate::Result;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

const DEFAULT_MAX_RESULTS: usize = 5;

pub struct WebSearchTool {
    client: Client,
    base_url: String,
}

impl WebSearchTool {
    pub fn new(client: Client, base_url: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait::async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &'static str {
        WEB_SEARCH
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        let query = require_str(input, "query")?;
        let max_results = optional_usize(input, "max_results", DEFAULT_MAX_RESULTS);

        debug!(%query, max_results, "Running web search");

        let response = self
            .client
            .get(format!("{}/", self.base_url))
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await
            .map_err(|e| AdvisorError::ToolError(format!("Web search request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AdvisorError::ToolError(format!(
                "Web search returned {}",
                status
            )));
        }

        // DuckDuckGo answers with a javascript content type, so parse the text
        let body = response
            .text()
            .await
            .map_err(|e| AdvisorError::ToolError(format!("Web search read failed: {}", e)))?;
        let answer: InstantAnswer = serde_json::from_str(&body)
            .map_err(|e| AdvisorError::ToolError(format!("Invalid web search response: {}", e)))?;

        let abstract_section = (!answer.abstract_text.is_empty()).then(|| {
            json!({
                "text": answer.abstract_text,
                "url": answer.abstract_url,
                "source": answer.abstract_source,
            })
        });

        let mut results = Vec::new();
        flatten_topics(&answer.related_topics, &mut results, max_results);

        Ok(ToolOutput::ok(json!({
            "query": query,
            "heading": answer.heading,
            "answer": (!answer.answer.is_empty()).then_some(answer.answer.as_str()),
            "abstract": abstract_section,
            "results": results,
        })))
    }
}

fn flatten_topics(topics: &[RelatedTopic], out: &mut Vec<serde_json::Value>, max: usize) {
    for topic in topics {
        if out.len() >= max {
            return;
        }
        match topic {
            RelatedTopic::Group { topics } => flatten_topics(topics, out, max),
            RelatedTopic::Entry { text, first_url } => {
                if !text.is_empty() && !first_url.is_empty() {
                    out.push(json!({ "text": text, "url": first_url }));
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstantAnswer {
    #[serde(default)]
    heading: String,
    #[serde(default)]
    abstract_text: String,
    #[serde(default, rename = "AbstractURL")]
    abstract_url: String,
    #[serde(default)]
    abstract_source: String,
    #[serde(default)]
    answer: String,
    #[serde(default)]
    related_topics: Vec<RelatedTopic>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RelatedTopic {
    Group {
        #[serde(rename = "Topics")]
        topics: Vec<RelatedTopic>,
    },
    Entry {
        #[serde(rename = "Text", default)]
        text: String,
        #[serde(rename = "FirstURL", default)]
        first_url: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tool(server: &MockServer) -> WebSearchTool {
        let client = super::super::build_tool_client(Duration::from_secs(5)).unwrap();
        WebSearchTool::new(client, server.uri())
    }

    fn input(params: serde_json::Value) -> ToolInput {
        ToolInput {
            tool_name: WEB_SEARCH.to_string(),
            parameters: params,
        }
    }

    #[tokio::test]
    async fn test_search_flattens_topics() {
        let server = MockServer::start().await;
        let body = json!({
            "Heading": "Tesla, Inc.",
            "AbstractText": "Tesla is an American electric vehicle company.",
            "AbstractURL": "https://en.wikipedia.org/wiki/Tesla,_Inc.",
            "AbstractSource": "Wikipedia",
            "Answer": "",
            "RelatedTopics": [
                { "Text": "Elon Musk - CEO of Tesla", "FirstURL": "https://duckduckgo.com/Elon_Musk" },
                { "Name": "Products", "Topics": [
                    { "Text": "Model 3", "FirstURL": "https://duckduckgo.com/Model_3" },
                    { "Text": "Model Y", "FirstURL": "https://duckduckgo.com/Model_Y" }
                ]}
            ]
        });
        Mock::given(method("GET"))
            .and(path("/"))
            .and(query_param("q", "tesla outlook"))
            .and(query_param("format", "json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(body.to_string())
                    .insert_header("content-type", "application/x-javascript"),
            )
            .mount(&server)
            .await;

        let output = tool(&server)
            .execute(&input(json!({ "query": "tesla outlook", "max_results": 2 })))
            .await
            .unwrap();

        assert!(output.success);
        assert_eq!(output.data["heading"], "Tesla, Inc.");
        assert_eq!(output.data["abstract"]["source"], "Wikipedia");
        assert!(output.data["answer"].is_null());
        let results = output.data["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[1]["text"], "Model 3");
    }

    #[tokio::test]
    async fn test_empty_answer_has_no_abstract() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"Heading\":\"\",\"RelatedTopics\":[]}"))
            .mount(&server)
            .await;

        let output = tool(&server)
            .execute(&input(json!({ "query": "zzzz" })))
            .await
            .unwrap();
        assert!(output.data["abstract"].is_null());
        assert!(output.data["results"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let result = tool(&server).execute(&input(json!({ "query": "x" }))).await;
        assert!(matches!(result, Err(AdvisorError::ToolError(_))));
    }

    #[tokio::test]
    async fn test_missing_query() {
        let server = MockServer::start().await;
        let result = tool(&server).execute(&input(json!({ "q": "x" }))).await;
        assert!(matches!(result, Err(AdvisorError::InvalidToolInput(_))));
    }
}
