//! Minimal HTML pages for the browser form

use crate::models::{AdvisorAnswer, Source};
use crate::text::escape_html;

const STYLE: &str = r#"
    body { font-family: system-ui, Arial, sans-serif; margin: 40px auto; max-width: 860px; padding: 0 16px; background: #f5f7f8; color: #222; }
    h1 { text-align: center; color: #1f3a4d; }
    form { background: #fff; padding: 24px; border-radius: 8px; box-shadow: 0 2px 6px rgba(0,0,0,0.08); }
    label { display: block; font-weight: 600; margin-bottom: 8px; }
    input[type=text] { width: 100%; box-sizing: border-box; padding: 10px; font-size: 16px; border: 1px solid #c8d0d6; border-radius: 4px; margin-bottom: 16px; }
    button { width: 100%; padding: 10px; font-size: 16px; background: #2e7d4f; color: #fff; border: 0; border-radius: 4px; cursor: pointer; }
    .query { color: #555; font-style: italic; }
    .result { background: #fff; padding: 20px; border-radius: 8px; box-shadow: 0 2px 6px rgba(0,0,0,0.06); white-space: pre-wrap; font-family: ui-monospace, Menlo, monospace; font-size: 14px; line-height: 1.5; }
    .error { border-left: 4px solid #c0392b; }
    ul.sources { font-size: 14px; }
    a.back { display: block; text-align: center; margin-top: 24px; }
"#;

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n<style>{style}</style>\n</head>\n<body>\n<h1>{title}</h1>\n{body}\n</body>\n</html>\n",
        title = escape_html(title),
        style = STYLE,
        body = body,
    )
}

pub fn index_page() -> String {
    page(
        "Multi AI Agent Search",
        r#"<form action="/search" method="post">
<label for="query">Enter your enquiry:</label>
<input type="text" id="query" name="query" placeholder="e.g., Analyze companies like Tesla, NVDA, and Apple" required>
<button type="submit">Search</button>
</form>"#,
    )
}

pub fn answer_page(query: &str, answer: &AdvisorAnswer) -> String {
    let mut body = format!(
        "<p class=\"query\">{}</p>\n<div class=\"result\">{}</div>\n",
        escape_html(query),
        escape_html(&answer.answer)
    );

    if !answer.sources.is_empty() {
        body.push_str("<h2>Sources</h2>\n<ul class=\"sources\">\n");
        for source in &answer.sources {
            body.push_str(&source_item(source));
        }
        body.push_str("</ul>\n");
    }

    body.push_str("<a class=\"back\" href=\"/\">&#8592; Back to Search</a>");
    page("Search Results", &body)
}

/// Failures are shown inline on a normal results page
pub fn error_page(query: &str, message: &str) -> String {
    let body = format!(
        "<p class=\"query\">{}</p>\n<div class=\"result error\">An error occurred: {}</div>\n<a class=\"back\" href=\"/\">&#8592; Back to Search</a>",
        escape_html(query),
        escape_html(message)
    );
    page("Search Results", &body)
}

fn source_item(source: &Source) -> String {
    let url = escape_html(&source.url);
    // Only link web urls
    if source.url.starts_with("https://") || source.url.starts_with("http://") {
        format!(
            "<li><a href=\"{}\" rel=\"noopener noreferrer\">{}</a></li>\n",
            url,
            escape_html(&source.title)
        )
    } else {
        format!("<li>{} ({})</li>\n", escape_html(&source.title), url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn answer(text: &str, sources: Vec<Source>) -> AdvisorAnswer {
        AdvisorAnswer {
            answer: text.to_string(),
            log_id: Uuid::new_v4(),
            provider: "gemini".to_string(),
            tickers: vec![],
            sources,
            reasoning_trace: vec![],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_index_has_query_form() {
        let html = index_page();
        assert!(html.contains("action=\"/search\""));
        assert!(html.contains("name=\"query\""));
    }

    #[test]
    fn test_answer_page_escapes() {
        let html = answer_page(
            "<b>TSLA</b>",
            &answer(
                "<script>alert(1)</script>",
                vec![Source {
                    title: "Q&A".into(),
                    url: "javascript:alert(1)".into(),
                }],
            ),
        );
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(html.contains("&lt;b&gt;TSLA&lt;/b&gt;"));
        assert!(html.contains("<li>Q&amp;A (javascript:alert(1))</li>"));
    }

    #[test]
    fn test_error_page() {
        let html = error_page("q", "LLM error: <timeout>");
        assert!(html.contains("An error occurred: LLM error: &lt;timeout&gt;"));
    }
}
