// src/currency.rs

use crate::error::CurrencyError;
use crate::response::RecoveredDocument;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::info;

const SGD_INDICATORS: &[&str] = &["s$", "sgd", "sgd$", "singapore", "singapore dollar"];
const SINGAPORE_COMPANY_INDICATORS: &[&str] = &["pte ltd", "pte. ltd.", "singapore", ".sg"];
const DOCUMENT_INDICATORS: &[&str] = &["s$", "sgd", "singapore"];

/// Per-year figures that get converted.
const CONVERTED_METRICS: &[&str] = &[
    "revenue",
    "profit_before_tax",
    "profit_after_tax",
    "net_cash_operating",
    "net_cash_investing",
    "net_cash_financing",
    "cash_end_of_year",
];

const YEAR_KEYS: &[&str] = &["year_1", "year_2"];

/// SGD → USD multipliers keyed by year, e.g. `{"2023": 0.7446}`.
#[derive(Debug, Clone, Default)]
pub struct RateTable {
    rates: BTreeMap<String, f64>,
}

impl RateTable {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CurrencyError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CurrencyError::RatesMissing);
        }
        let content = fs::read_to_string(path).map_err(|e| CurrencyError::Failed(e.to_string()))?;
        let rates: BTreeMap<String, f64> =
            serde_json::from_str(&content).map_err(|e| CurrencyError::Failed(e.to_string()))?;
        info!(path = %path.display(), years = rates.len(), "Loaded exchange rates");
        Ok(Self { rates })
    }

    #[cfg(test)]
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, f64)>) -> Self {
        Self {
            rates: pairs.into_iter().map(|(y, r)| (y.to_string(), r)).collect(),
        }
    }

    pub fn rate_for(&self, year: &str) -> Option<f64> {
        self.rates.get(year).copied()
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    let haystack = haystack.to_lowercase();
    needles.iter().any(|n| haystack.contains(n))
}

/// Whether the document looks like it reports in Singapore dollars.
pub fn detect_sgd_currency(doc: &RecoveredDocument) -> bool {
    let currencies = doc.get("currencies").and_then(Value::as_array);

    if let Some(list) = currencies {
        let hit = list.iter().any(|c| {
            let text = c.as_str().map_or_else(|| c.to_string(), str::to_string);
            contains_any(&text, SGD_INDICATORS)
        });
        if hit {
            return true;
        }
    }

    if let Some(name) = doc.get("company_name").and_then(Value::as_str) {
        if contains_any(name, SINGAPORE_COMPANY_INDICATORS) {
            return true;
        }
    }

    let whole = Value::Object(doc.clone()).to_string();
    if contains_any(&whole, DOCUMENT_INDICATORS) {
        return true;
    }

    // Two-year private-company data with no currency stated defaults to SGD.
    let no_currencies = currencies.is_none_or(|l| l.is_empty());
    no_currencies && is_truthy(doc.get("revenue")) && is_truthy(doc.get("year_1"))
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

/// A metric value as a number, accepting numeric strings such as `"1,234.5"`.
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.replace(',', "").trim().parse().ok(),
        _ => None,
    }
}

fn year_label(year_data: &Map<String, Value>) -> String {
    match year_data.get("year") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Convert the `year_1`/`year_2` figures of a two-year document to USD.
///
/// Every year present must have a rate. Converted values are rounded to
/// whole units; values that are not numbers are left alone.
pub fn convert_sgd_to_usd(
    doc: &RecoveredDocument,
    rates: &RateTable,
) -> Result<RecoveredDocument, CurrencyError> {
    let mut converted = doc.clone();
    let mut rates_used = Map::new();

    for key in YEAR_KEYS {
        let Some(Value::Object(year_data)) = converted.get_mut(*key) else {
            continue;
        };
        if year_data.is_empty() {
            continue;
        }

        let year = year_label(year_data);
        let rate = rates
            .rate_for(&year)
            .ok_or_else(|| CurrencyError::RateNotFound(year.clone()))?;
        rates_used.insert(year.clone(), Value::from(rate));

        for metric in CONVERTED_METRICS {
            let Some(value) = year_data.get_mut(*metric) else {
                continue;
            };
            if let Some(original) = as_number(value) {
                *value = Value::from((original * rate).round());
            }
        }
        info!(year = %year, rate, "Converted year to USD");
    }

    let original = converted
        .get("currencies")
        .cloned()
        .unwrap_or_else(|| Value::Array(Vec::new()));
    converted.insert("original_currencies".to_string(), original);
    converted.insert("currencies".to_string(), Value::from(vec!["USD"]));
    converted.insert("exchange_rates_used".to_string(), Value::Object(rates_used));

    Ok(converted)
}

/// One-line note describing the rates applied, or `None` if nothing was
/// converted.
pub fn conversion_note(doc: &RecoveredDocument) -> Option<String> {
    let rates = doc.get("exchange_rates_used")?.as_object()?;
    if rates.is_empty() {
        return None;
    }

    let original = doc
        .get("original_currencies")
        .and_then(Value::as_array)
        .and_then(|l| l.first())
        .and_then(Value::as_str)
        .unwrap_or("SGD");
    let symbol = if original == "SGD" || original == "S$" {
        "S$"
    } else {
        original
    };

    // serde_json maps iterate in key order, so years come out sorted.
    let parts: Vec<String> = rates
        .iter()
        .filter_map(|(year, rate)| {
            let rate = rate.as_f64().filter(|r| *r != 0.0)?;
            let display = (1.0 / rate * 100_000.0).round() / 100_000.0;
            Some(format!("{symbol}{display} for the year {year}"))
        })
        .collect();

    if parts.is_empty() {
        return None;
    }
    Some(format!(
        "Currency converted from Singapore dollar to US dollar: US$1 = {}",
        parts.join(" and ")
    ))
}
