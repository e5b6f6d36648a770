//! Ticker extraction
//!
//! Resolves the companies a question mentions into exchange symbols before
//! any finance tool runs. Recognises:
//! - cash-tags (`$TSLA`)
//! - bare upper-case symbols (`NVDA`), minus common abbreviations
//! - well-known company names (`Apple` → `AAPL`)

use crate::models::Ticker;
use lazy_static::lazy_static;
use std::collections::HashMap;

/// Upper-case words that look like symbols but almost never are in a question
const STOP_WORDS: &[&str] = &[
    // Pronouns / English
    "I", "A", "AN", "AND", "OR", "THE", "OF", "TO", "IN", "ON", "FOR", "IS", "IT",
    "ME", "MY", "WE", "US", "VS", "OK", "BE", "DO", "IF", "AT", "BY", "AS", "SO",
    "NO", "NOT", "ALL", "ANY", "HOW", "WHY", "WHAT", "WHO", "NOW",
    // Finance / macro abbreviations
    "AI", "CEO", "CFO", "CTO", "IPO", "ETF", "EPS", "P", "E", "PE", "PB", "PEG", "ROI", "ROE",
    "GDP", "CPI", "FED", "FOMC", "SEC", "USD", "EUR", "INR", "GBP", "JPY",
    "USA", "UK", "EU", "NYSE", "LLC", "INC", "LTD", "YOY", "QOQ", "YTD", "ATH",
    "RSI", "MACD", "EMA", "SMA", "DCF", "EV", "API", "FAQ", "TLDR", "ESG",
    "Q1", "Q2", "Q3", "Q4", "FY", "BUY", "SELL", "HOLD",
    // Investing vocabulary that shows up in shouted questions
    "IRA", "ROTH", "STOCK", "STOCKS", "SHARE", "SHARES", "BOND", "BONDS", "FUND",
    "FUNDS", "CASH", "BEST", "TOP", "GOOD", "DOW", "INDEX", "MARKET", "PRICE",
    "RATE", "RATES", "TAX", "DEBT", "NEWS", "SHOULD", "WILL", "CAN", "THIS", "THAT",
    "WITH", "FROM", "ARE", "WAS",
];

/// English words that mark a fully upper-cased sentence rather than a list of symbols
const SHOUTING_MIN_STOP_WORDS: usize = 2;

lazy_static! {
    /// Lower-case company name → symbol
    static ref COMPANY_ALIASES: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("tesla", "TSLA");
        m.insert("nvidia", "NVDA");
        m.insert("apple", "AAPL");
        m.insert("microsoft", "MSFT");
        m.insert("amazon", "AMZN");
        m.insert("google", "GOOGL");
        m.insert("alphabet", "GOOGL");
        m.insert("meta", "META");
        m.insert("facebook", "META");
        m.insert("netflix", "NFLX");
        m.insert("amd", "AMD");
        m.insert("intel", "INTC");
        m.insert("broadcom", "AVGO");
        m.insert("oracle", "ORCL");
        m.insert("salesforce", "CRM");
        m.insert("adobe", "ADBE");
        m.insert("ibm", "IBM");
        m.insert("qualcomm", "QCOM");
        m.insert("paypal", "PYPL");
        m.insert("visa", "V");
        m.insert("mastercard", "MA");
        m.insert("jpmorgan", "JPM");
        m.insert("goldman", "GS");
        m.insert("berkshire", "BRK-B");
        m.insert("walmart", "WMT");
        m.insert("costco", "COST");
        m.insert("disney", "DIS");
        m.insert("coca-cola", "KO");
        m.insert("pepsico", "PEP");
        m.insert("boeing", "BA");
        m.insert("exxon", "XOM");
        m.insert("chevron", "CVX");
        m.insert("pfizer", "PFE");
        m.insert("uber", "UBER");
        m.insert("airbnb", "ABNB");
        m.insert("palantir", "PLTR");
        m.insert("tsmc", "TSM");
        m.insert("reliance", "RELIANCE.NS");
        m.insert("infosys", "INFY");
        m
    };
}

/// Extract ticker symbols mentioned in `query`, first appearance first,
/// at most `max` of them.
pub fn extract_tickers(query: &str, max: usize) -> Vec<Ticker> {
    let mut found: Vec<Ticker> = Vec::new();

    // Apostrophes split too, so "Tesla's" yields "Tesla"
    let separators = |c: char| {
        c.is_whitespace() || matches!(c, ',' | ';' | ':' | '(' | ')' | '?' | '!' | '/' | '"' | '\'')
    };

    let shouting = is_shouting(query.split(separators));

    for token in query.split(separators) {
        if found.len() >= max {
            break;
        }

        let token = token.trim_end_matches('.');
        if token.is_empty() {
            continue;
        }

        if let Some(ticker) = resolve_token(token, shouting) {
            if !found.contains(&ticker) {
                found.push(ticker);
            }
        }
    }

    found
}

/// True when most words are upper-case and several of them are plain English,
/// e.g. "WHAT IS THE BEST STOCK". Bare symbols cannot be told apart there.
fn is_shouting<'a>(tokens: impl Iterator<Item = &'a str>) -> bool {
    let mut words = 0;
    let mut upper = 0;
    let mut english = 0;

    for token in tokens {
        let token = token.trim_end_matches('.');
        if token.starts_with('$') || !token.chars().any(|c| c.is_ascii_alphabetic()) {
            continue;
        }
        words += 1;
        if !token.chars().any(|c| c.is_ascii_lowercase()) {
            upper += 1;
            if STOP_WORDS.contains(&token) {
                english += 1;
            }
        }
    }

    words > 0 && upper * 2 > words && english >= SHOUTING_MIN_STOP_WORDS
}

fn resolve_token(token: &str, shouting: bool) -> Option<Ticker> {
    // Cash-tags are explicit, stop-words do not apply
    if let Some(tagged) = token.strip_prefix('$') {
        return Ticker::parse(tagged);
    }

    let lowered = token.to_lowercase();

    if let Some(symbol) = COMPANY_ALIASES.get(lowered.as_str()) {
        return Ticker::parse(symbol);
    }

    if !shouting && looks_like_symbol(token) && !STOP_WORDS.contains(&token) {
        return Ticker::parse(token);
    }

    None
}

fn looks_like_symbol(token: &str) -> bool {
    let base = token.split(['.', '-']).next().unwrap_or(token);

    // Dotted initials such as U.S or E.U
    if let Some((head, tail)) = token.split_once('.') {
        if head.len() == 1 && tail.len() == 1 {
            return false;
        }
    }

    (1..=5).contains(&base.len()) && base.chars().all(|c| c.is_ascii_uppercase())
        && token.chars().all(|c| c.is_ascii_uppercase() || c == '.' || c == '-')
}
