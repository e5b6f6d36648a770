//! Yahoo Finance market data tools
//!
//! Four tools share one client: price (chart API), analyst recommendation
//! trend and fundamentals (quoteSummary API), and company news (search API).

use super::{
    optional_usize, require_ticker, Tool, ANALYST_RECOMMENDATIONS, COMPANY_NEWS,
    STOCK_FUNDAMENTALS, STOCK_PRICE,
};
use crate::error::AdvisorError;
use crate::models::{Ticker, ToolInput, ToolOutput};
use crate::Result;
use chrono::{TimeZone, Utc};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

const DEFAULT_NEWS_COUNT: usize = 5;

#[derive(Clone)]
pub struct YahooFinanceClient {
    client: Client,
    base_url: String,
}

impl YahooFinanceClient {
    pub fn new(client: Client, base_url: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "Yahoo Finance request");

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                AdvisorError::ToolError(format!("Yahoo Finance request failed for {}: {}", path, e))
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            AdvisorError::ToolError(format!("Yahoo Finance response unreadable for {}: {}", path, e))
        })?;

        if !status.is_success() {
            // Error bodies are JSON for unknown symbols, plain text when throttled
            let parsed = serde_json::from_str::<Value>(&text).ok();
            let details = parsed
                .as_ref()
                .and_then(upstream_error_description)
                .map(str::to_string)
                .unwrap_or_else(|| plain_error_details(&text));

            return Err(AdvisorError::ToolError(format!(
                "Yahoo Finance returned {} for {}: {}",
                status, path, details
            )));
        }

        serde_json::from_str::<Value>(&text)
            .map_err(|e| AdvisorError::ToolError(format!("Invalid JSON response: {}", e)))
    }

    /// First `quoteSummary.result` entry for the requested modules
    async fn quote_summary(&self, ticker: &Ticker, modules: &str) -> Result<Value> {
        let body = self
            .get_json(
                &format!("/v10/finance/quoteSummary/{}", ticker),
                &[("modules", modules)],
            )
            .await?;

        first_result(&body, "quoteSummary", ticker)
    }
}

fn upstream_error_description(body: &Value) -> Option<&str> {
    ["chart", "quoteSummary", "finance"]
        .iter()
        .find_map(|root| body.get(*root)?.get("error")?.get("description")?.as_str())
}

fn plain_error_details(text: &str) -> String {
    const MAX_DETAIL_CHARS: usize = 200;

    let text = text.trim();
    if text.is_empty() {
        return "no details".to_string();
    }
    text.chars().take(MAX_DETAIL_CHARS).collect()
}

fn first_result(body: &Value, root: &str, ticker: &Ticker) -> Result<Value> {
    body.get(root)
        .and_then(|r| r.get("result"))
        .and_then(Value::as_array)
        .and_then(|results| results.first())
        .cloned()
        .ok_or_else(|| AdvisorError::ToolError(format!("No {} data for {}", root, ticker)))
}

/// Yahoo wraps most numbers as `{"raw": 1.23, "fmt": "1.23"}`
fn raw_number(section: Option<&Value>, key: &str) -> Option<f64> {
    let value = section?.get(key)?;
    value
        .get("raw")
        .and_then(Value::as_f64)
        .or_else(|| value.as_f64())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

//
// ================= stock_price =================
//

pub struct StockPriceTool {
    api: YahooFinanceClient,
}

impl StockPriceTool {
    pub fn new(api: YahooFinanceClient) -> Self {
        Self { api }
    }
}

#[async_trait::async_trait]
impl Tool for StockPriceTool {
    fn name(&self) -> &'static str {
        STOCK_PRICE
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        let ticker = require_ticker(input)?;
        let body = self
            .api
            .get_json(
                &format!("/v8/finance/chart/{}", ticker),
                &[("range", "1d"), ("interval", "1d")],
            )
            .await?;

        let result = first_result(&body, "chart", &ticker)?;
        let meta = result.get("meta");

        let price = raw_number(meta, "regularMarketPrice").ok_or_else(|| {
            AdvisorError::ToolError(format!("No market price reported for {}", ticker))
        })?;
        let previous_close =
            raw_number(meta, "chartPreviousClose").or_else(|| raw_number(meta, "previousClose"));

        let change = previous_close.map(|prev| round2(price - prev));
        let change_percent = previous_close
            .filter(|prev| *prev != 0.0)
            .map(|prev| round2((price - prev) / prev * 100.0));

        let text = |key: &str| meta.and_then(|m| m.get(key)).and_then(Value::as_str);

        Ok(ToolOutput::ok(json!({
            "symbol": ticker,
            "price": price,
            "previous_close": previous_close,
            "change": change,
            "change_percent": change_percent,
            "currency": text("currency"),
            "exchange": text("fullExchangeName").or_else(|| text("exchangeName")),
        })))
    }
}

//
// ================= analyst_recommendations =================
//

pub struct AnalystRecommendationsTool {
    api: YahooFinanceClient,
}

impl AnalystRecommendationsTool {
    pub fn new(api: YahooFinanceClient) -> Self {
        Self { api }
    }
}

#[async_trait::async_trait]
impl Tool for AnalystRecommendationsTool {
    fn name(&self) -> &'static str {
        ANALYST_RECOMMENDATIONS
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        let ticker = require_ticker(input)?;
        let summary = self.api.quote_summary(&ticker, "recommendationTrend").await?;

        let trend: Vec<Value> = summary
            .get("recommendationTrend")
            .and_then(|r| r.get("trend"))
            .and_then(Value::as_array)
            .map(|periods| {
                periods
                    .iter()
                    .map(|p| {
                        let count = |key: &str| p.get(key).and_then(Value::as_u64).unwrap_or(0);
                        json!({
                            "period": p.get("period").and_then(Value::as_str).unwrap_or(""),
                            "strong_buy": count("strongBuy"),
                            "buy": count("buy"),
                            "hold": count("hold"),
                            "sell": count("sell"),
                            "strong_sell": count("strongSell"),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(ToolOutput::ok(json!({
            "symbol": ticker,
            "trend": trend,
        })))
    }
}

//
// ================= stock_fundamentals =================
//

pub struct StockFundamentalsTool {
    api: YahooFinanceClient,
}

impl StockFundamentalsTool {
    pub fn new(api: YahooFinanceClient) -> Self {
        Self { api }
    }
}

#[async_trait::async_trait]
impl Tool for StockFundamentalsTool {
    fn name(&self) -> &'static str {
        STOCK_FUNDAMENTALS
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        let ticker = require_ticker(input)?;
        let summary = self
            .api
            .quote_summary(
                &ticker,
                "summaryProfile,summaryDetail,financialData,defaultKeyStatistics",
            )
            .await?;

        let profile = summary.get("summaryProfile");
        let detail = summary.get("summaryDetail");
        let financial = summary.get("financialData");
        let stats = summary.get("defaultKeyStatistics");

        let profile_text = |key: &str| profile.and_then(|p| p.get(key)).and_then(Value::as_str);

        Ok(ToolOutput::ok(json!({
            "symbol": ticker,
            "sector": profile_text("sector"),
            "industry": profile_text("industry"),
            "market_cap": raw_number(detail, "marketCap"),
            "trailing_pe": raw_number(detail, "trailingPE"),
            "forward_pe": raw_number(stats, "forwardPE").or_else(|| raw_number(detail, "forwardPE")),
            "eps": raw_number(stats, "trailingEps"),
            "profit_margin": raw_number(financial, "profitMargins"),
            "revenue": raw_number(financial, "totalRevenue"),
            "fifty_two_week_high": raw_number(detail, "fiftyTwoWeekHigh"),
            "fifty_two_week_low": raw_number(detail, "fiftyTwoWeekLow"),
            "target_mean_price": raw_number(financial, "targetMeanPrice"),
            "recommendation": financial
                .and_then(|f| f.get("recommendationKey"))
                .and_then(Value::as_str),
        })))
    }
}

//
// ================= company_news =================
//

pub struct CompanyNewsTool {
    api: YahooFinanceClient,
}

impl CompanyNewsTool {
    pub fn new(api: YahooFinanceClient) -> Self {
        Self { api }
    }
}

#[async_trait::async_trait]
impl Tool for CompanyNewsTool {
    fn name(&self) -> &'static str {
        COMPANY_NEWS
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        let ticker = require_ticker(input)?;
        let count = optional_usize(input, "count", DEFAULT_NEWS_COUNT).to_string();

        let body = self
            .api
            .get_json(
                "/v1/finance/search",
                &[
                    ("q", ticker.as_str()),
                    ("newsCount", count.as_str()),
                    ("quotesCount", "0"),
                ],
            )
            .await?;

        let articles: Vec<Value> = body
            .get("news")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| {
                        let title = item.get("title")?.as_str()?;
                        let link = item.get("link")?.as_str()?;
                        let published_at = item
                            .get("providerPublishTime")
                            .and_then(Value::as_i64)
                            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
                            .map(|dt| dt.to_rfc3339());
                        Some(json!({
                            "title": title,
                            "publisher": item.get("publisher").and_then(Value::as_str),
                            "link": link,
                            "published_at": published_at,
                        }))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(ToolOutput::ok(json!({
            "symbol": ticker,
            "articles": articles,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api(server: &MockServer) -> YahooFinanceClient {
        let client = super::super::build_tool_client(Duration::from_secs(5)).unwrap();
        YahooFinanceClient::new(client, server.uri())
    }

    fn input(tool_name: &str, symbol: &str) -> ToolInput {
        ToolInput {
            tool_name: tool_name.to_string(),
            parameters: json!({ "symbol": symbol }),
        }
    }

    #[tokio::test]
    async fn test_stock_price() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/TSLA"))
            .and(query_param("range", "1d"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "chart": {
                    "result": [{
                        "meta": {
                            "currency": "USD",
                            "symbol": "TSLA",
                            "exchangeName": "NMS",
                            "fullExchangeName": "NasdaqGS",
                            "regularMarketPrice": 250.0,
                            "chartPreviousClose": 200.0
                        }
                    }],
                    "error": null
                }
            })))
            .mount(&server)
            .await;

        let output = StockPriceTool::new(api(&server))
            .execute(&input(STOCK_PRICE, "tsla"))
            .await
            .unwrap();

        assert_eq!(output.data["symbol"], "TSLA");
        assert_eq!(output.data["price"], 250.0);
        assert_eq!(output.data["change"], 50.0);
        assert_eq!(output.data["change_percent"], 25.0);
        assert_eq!(output.data["exchange"], "NasdaqGS");
    }

    #[tokio::test]
    async fn test_unknown_symbol_reports_upstream_description() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "chart": {
                    "result": null,
                    "error": { "code": "Not Found", "description": "No data found, symbol may be delisted" }
                }
            })))
            .mount(&server)
            .await;

        let err = StockPriceTool::new(api(&server))
            .execute(&input(STOCK_PRICE, "ZZZZ"))
            .await
            .unwrap_err();

        assert!(matches!(err, AdvisorError::ToolError(ref m) if m.contains("delisted")));
    }

    #[tokio::test]
    async fn test_throttled_plain_text_keeps_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).set_body_string("Too Many Requests\r\n"))
            .mount(&server)
            .await;

        let err = StockPriceTool::new(api(&server))
            .execute(&input(STOCK_PRICE, "TSLA"))
            .await
            .unwrap_err();

        match err {
            AdvisorError::ToolError(message) => {
                assert!(message.contains("429"), "{}", message);
                assert!(message.ends_with("Too Many Requests"), "{}", message);
                assert!(!message.contains("Invalid JSON"), "{}", message);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_symbol_never_calls_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let result = StockPriceTool::new(api(&server))
            .execute(&input(STOCK_PRICE, "not a symbol"))
            .await;
        assert!(matches!(result, Err(AdvisorError::InvalidToolInput(_))));
    }

    #[tokio::test]
    async fn test_analyst_recommendations() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v10/finance/quoteSummary/NVDA"))
            .and(query_param("modules", "recommendationTrend"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "quoteSummary": {
                    "result": [{
                        "recommendationTrend": {
                            "trend": [
                                { "period": "0m", "strongBuy": 12, "buy": 40, "hold": 6, "sell": 1, "strongSell": 0 },
                                { "period": "-1m", "strongBuy": 11, "buy": 38, "hold": 7, "sell": 1, "strongSell": 1 }
                            ]
                        }
                    }],
                    "error": null
                }
            })))
            .mount(&server)
            .await;

        let output = AnalystRecommendationsTool::new(api(&server))
            .execute(&input(ANALYST_RECOMMENDATIONS, "NVDA"))
            .await
            .unwrap();

        let trend = output.data["trend"].as_array().unwrap();
        assert_eq!(trend.len(), 2);
        assert_eq!(trend[0]["period"], "0m");
        assert_eq!(trend[0]["strong_buy"], 12);
        assert_eq!(trend[1]["strong_sell"], 1);
    }

    #[tokio::test]
    async fn test_fundamentals_unwraps_raw_values() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v10/finance/quoteSummary/AAPL"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "quoteSummary": {
                    "result": [{
                        "summaryProfile": { "sector": "Technology", "industry": "Consumer Electronics" },
                        "summaryDetail": {
                            "marketCap": { "raw": 3.0e12, "fmt": "3T" },
                            "trailingPE": { "raw": 31.5, "fmt": "31.50" },
                            "fiftyTwoWeekHigh": { "raw": 237.23 },
                            "fiftyTwoWeekLow": { "raw": 164.08 }
                        },
                        "financialData": {
                            "profitMargins": { "raw": 0.26 },
                            "targetMeanPrice": { "raw": 245.0 },
                            "recommendationKey": "buy"
                        },
                        "defaultKeyStatistics": {
                            "forwardPE": { "raw": 28.1 },
                            "trailingEps": { "raw": 6.57 }
                        }
                    }]
                }
            })))
            .mount(&server)
            .await;

        let output = StockFundamentalsTool::new(api(&server))
            .execute(&input(STOCK_FUNDAMENTALS, "AAPL"))
            .await
            .unwrap();

        assert_eq!(output.data["sector"], "Technology");
        assert_eq!(output.data["trailing_pe"], 31.5);
        assert_eq!(output.data["forward_pe"], 28.1);
        assert_eq!(output.data["eps"], 6.57);
        assert_eq!(output.data["recommendation"], "buy");
        assert!(output.data["revenue"].is_null());
    }

    #[tokio::test]
    async fn test_company_news() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/finance/search"))
            .and(query_param("q", "TSLA"))
            .and(query_param("newsCount", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "quotes": [],
                "news": [
                    {
                        "uuid": "1",
                        "title": "Tesla deliveries beat estimates",
                        "publisher": "Reuters",
                        "link": "https://example.com/tesla-deliveries",
                        "providerPublishTime": 1700000000
                    },
                    { "uuid": "2", "title": "No link here" }
                ]
            })))
            .mount(&server)
            .await;

        let output = CompanyNewsTool::new(api(&server))
            .execute(&input(COMPANY_NEWS, "TSLA"))
            .await
            .unwrap();

        let articles = output.data["articles"].as_array().unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0]["publisher"], "Reuters");
        assert_eq!(articles[0]["published_at"], "2023-11-14T22:13:20+00:00");
    }
}
