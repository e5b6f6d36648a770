//! Context rendering
//!
//! Turns member reports into the markdown document the coordinator model
//! answers from. Finance data is laid out as tables; anything a tool could
//! not fetch is marked unavailable rather than silently dropped.

use crate::agent::members::FINANCE_AGENT;
use crate::models::{AgentReport, Finding, FindingStatus, Source};
use crate::tools::{ANALYST_RECOMMENDATIONS, COMPANY_NEWS, STOCK_FUNDAMENTALS, STOCK_PRICE, WEB_SEARCH};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt::Write;

/// Hex SHA-256 of the rendered context
pub fn context_digest(context: &str) -> String {
    hex::encode(Sha256::digest(context.as_bytes()))
}

/// Sources from every report, first occurrence of each url wins
pub fn collect_sources(reports: &[AgentReport]) -> Vec<Source> {
    let mut seen = HashSet::new();
    reports
        .iter()
        .flat_map(|r| r.sources.iter())
        .filter(|s| seen.insert(s.url.as_str()))
        .cloned()
        .collect()
}

pub fn render_context(reports: &[AgentReport]) -> String {
    let mut out = String::new();

    for report in reports {
        let _ = writeln!(out, "## {}\n", report.agent_name);

        if report.findings.is_empty() {
            out.push_str("_no data gathered_\n\n");
            continue;
        }

        if report.agent_name == FINANCE_AGENT {
            render_finance(&mut out, &report.findings);
        } else {
            for finding in &report.findings {
                render_finding(&mut out, finding);
            }
        }
    }

    let sources = collect_sources(reports);
    if !sources.is_empty() {
        out.push_str("## Sources\n\n");
        for (i, source) in sources.iter().enumerate() {
            let _ = writeln!(out, "{}. [{}]({})", i + 1, source.title, source.url);
        }
        out.push('\n');
    }

    out.trim_end().to_string()
}

/// Finance findings grouped per ticker, tickers in the order they were run
fn render_finance(out: &mut String, findings: &[Finding]) {
    let mut subjects: Vec<&str> = Vec::new();
    for finding in findings {
        if !subjects.contains(&finding.subject.as_str()) {
            subjects.push(&finding.subject);
        }
    }

    for subject in subjects {
        let _ = writeln!(out, "### {}\n", subject);
        for finding in findings.iter().filter(|f| f.subject == subject) {
            render_finding(out, finding);
        }
    }
}

fn render_finding(out: &mut String, finding: &Finding) {
    let title = match finding.tool_name.as_str() {
        WEB_SEARCH => format!("Web results for \"{}\"", finding.subject),
        STOCK_PRICE => "Price".to_string(),
        ANALYST_RECOMMENDATIONS => "Analyst Recommendations".to_string(),
        STOCK_FUNDAMENTALS => "Fundamentals".to_string(),
        COMPANY_NEWS => "Company News".to_string(),
        other => other.to_string(),
    };
    let _ = writeln!(out, "**{}**\n", title);

    if finding.status == FindingStatus::Failed {
        let reason = finding.error_message().unwrap_or("unknown error");
        let _ = writeln!(out, "_unavailable: {}_\n", reason);
        return;
    }

    let data = &finding.data;
    match finding.tool_name.as_str() {
        WEB_SEARCH => render_search(out, data),
        STOCK_PRICE => render_price(out, data),
        ANALYST_RECOMMENDATIONS => render_recommendations(out, data),
        STOCK_FUNDAMENTALS => render_fundamentals(out, data),
        COMPANY_NEWS => render_news(out, data),
        _ => {
            let _ = writeln!(out, "```json\n{}\n```\n", data);
        }
    }
}

//
// ================= Sections =================
//

fn render_search(out: &mut String, data: &Value) {
    let mut wrote_any = false;

    if let Some(answer) = str_field(data, "answer") {
        let _ = writeln!(out, "Answer: {}\n", answer);
        wrote_any = true;
    }

    if let Some(text) = data.pointer("/abstract/text").and_then(Value::as_str) {
        let url = data.pointer("/abstract/url").and_then(Value::as_str).unwrap_or("");
        let _ = writeln!(out, "{} ({})\n", text, url);
        wrote_any = true;
    }

    if let Some(results) = data.get("results").and_then(Value::as_array) {
        for result in results {
            let text = str_field(result, "text").unwrap_or("");
            let url = str_field(result, "url").unwrap_or("");
            let _ = writeln!(out, "- {} ({})", text, url);
            wrote_any = true;
        }
        if !results.is_empty() {
            out.push('\n');
        }
    }

    if !wrote_any {
        out.push_str("_no results_\n\n");
    }
}

fn render_price(out: &mut String, data: &Value) {
    let currency = str_field(data, "currency").unwrap_or("");
    let with_currency = |v: &Value| {
        let amount = number(v);
        if currency.is_empty() || amount == "n/a" {
            amount
        } else {
            format!("{} {}", amount, currency)
        }
    };

    let change = match (data["change"].as_f64(), data["change_percent"].as_f64()) {
        (Some(c), Some(p)) => format!("{:+.2} ({:+.2}%)", c, p),
        (Some(c), None) => format!("{:+.2}", c),
        _ => "n/a".to_string(),
    };

    table(
        out,
        &[
            ("Price", with_currency(&data["price"])),
            ("Previous Close", with_currency(&data["previous_close"])),
            ("Change", change),
            ("Exchange", str_field(data, "exchange").unwrap_or("n/a").to_string()),
        ],
    );
}

fn render_recommendations(out: &mut String, data: &Value) {
    let trend = data
        .get("trend")
        .and_then(Value::as_array)
        .filter(|t| !t.is_empty());

    let Some(trend) = trend else {
        out.push_str("_no analyst coverage_\n\n");
        return;
    };

    out.push_str("| Period | Strong Buy | Buy | Hold | Sell | Strong Sell |\n");
    out.push_str("|---|---|---|---|---|---|\n");
    for row in trend {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} | {} |",
            str_field(row, "period").unwrap_or(""),
            number(&row["strong_buy"]),
            number(&row["buy"]),
            number(&row["hold"]),
            number(&row["sell"]),
            number(&row["strong_sell"]),
        );
    }
    out.push('\n');
}

fn render_fundamentals(out: &mut String, data: &Value) {
    let text = |key: &str| str_field(data, key).unwrap_or("n/a").to_string();

    let range = match (
        data["fifty_two_week_low"].as_f64(),
        data["fifty_two_week_high"].as_f64(),
    ) {
        (Some(low), Some(high)) => format!("{:.2} - {:.2}", low, high),
        _ => "n/a".to_string(),
    };

    table(
        out,
        &[
            ("Sector", text("sector")),
            ("Industry", text("industry")),
            ("Market Cap", large_number(&data["market_cap"])),
            ("Revenue", large_number(&data["revenue"])),
            ("Trailing P/E", number(&data["trailing_pe"])),
            ("Forward P/E", number(&data["forward_pe"])),
            ("EPS", number(&data["eps"])),
            ("Profit Margin", percent(&data["profit_margin"])),
            ("52-Week Range", range),
            ("Target Mean Price", number(&data["target_mean_price"])),
            ("Recommendation", text("recommendation")),
        ],
    );
}

fn render_news(out: &mut String, data: &Value) {
    let articles = data
        .get("articles")
        .and_then(Value::as_array)
        .filter(|a| !a.is_empty());

    let Some(articles) = articles else {
        out.push_str("_no recent news_\n\n");
        return;
    };

    for article in articles {
        let title = str_field(article, "title").unwrap_or("");
        let link = str_field(article, "link").unwrap_or("");
        let mut meta: Vec<&str> = Vec::new();
        if let Some(publisher) = str_field(article, "publisher") {
            meta.push(publisher);
        }
        if let Some(published) = str_field(article, "published_at") {
            meta.push(published);
        }

        if meta.is_empty() {
            let _ = writeln!(out, "- [{}]({})", title, link);
        } else {
            let _ = writeln!(out, "- [{}]({}) ({})", title, link, meta.join(", "));
        }
    }
    out.push('\n');
}

//
// ================= Formatting helpers =================
//

fn table(out: &mut String, rows: &[(&str, String)]) {
    out.push_str("| Metric | Value |\n|---|---|\n");
    for (metric, value) in rows {
        let _ = writeln!(out, "| {} | {} |", metric, value);
    }
    out.push('\n');
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn number(value: &Value) -> String {
    if let Some(n) = value.as_i64() {
        return n.to_string();
    }
    match value.as_f64() {
        Some(n) => format!("{:.2}", n),
        None => "n/a".to_string(),
    }
}

fn large_number(value: &Value) -> String {
    let Some(n) = value.as_f64() else {
        return "n/a".to_string();
    };
    let abs = n.abs();
    if abs >= 1e12 {
        format!("{:.2}T", n / 1e12)
    } else if abs >= 1e9 {
        format!("{:.2}B", n / 1e9)
    } else if abs >= 1e6 {
        format!("{:.2}M", n / 1e6)
    } else {
        format!("{:.0}", n)
    }
}

fn percent(value: &Value) -> String {
    match value.as_f64() {
        Some(n) => format!("{:.2}%", n * 100.0),
        None => "n/a".to_string(),
    }
}
