// src/tables.rs

use crate::response::RecoveredDocument;
use serde_json::Value;

/// A titled grid of cells ready for terminal output.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub title: &'static str,
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
}

const REVENUE_PROFIT_COLUMNS: &[(&str, &str)] = &[
    ("Year", "year"),
    ("Revenue", "revenue"),
    ("Profit before taxes", "profit_before_tax"),
];

const CASH_FLOW_COLUMNS: &[(&str, &str)] = &[
    ("Year", "year"),
    ("Net cash used in/generated from operating activities", "net_cash_operating"),
    ("Net cash used in investing activities", "net_cash_investing"),
    ("Net cash provided by/used in financing activities", "net_cash_financing"),
    ("Cash and cash equivalents at end of financial year", "cash_end_of_year"),
];

pub fn revenue_profit_table(doc: &RecoveredDocument) -> Table {
    build_table("Revenue and Profit", REVENUE_PROFIT_COLUMNS, doc)
}

pub fn cash_flow_table(doc: &RecoveredDocument) -> Table {
    build_table("Cash Flow", CASH_FLOW_COLUMNS, doc)
}

/// One row per non-empty `year_*` object, sorted by numeric year. Rows whose
/// year does not parse sort last.
fn build_table(title: &'static str, columns: &[(&'static str, &str)], doc: &RecoveredDocument) -> Table {
    let mut years: Vec<(Option<i64>, Vec<String>)> = doc
        .iter()
        .filter(|(key, _)| key.starts_with("year_"))
        .filter_map(|(_, value)| value.as_object().filter(|o| !o.is_empty()))
        .map(|year_data| {
            let sort_key = year_data.get("year").and_then(numeric_year);
            let cells = columns
                .iter()
                .map(|(_, field)| cell(year_data.get(*field)))
                .collect();
            (sort_key, cells)
        })
        .collect();

    years.sort_by_key(|(year, _)| (year.is_none(), *year));

    Table {
        title,
        headers: columns.iter().map(|(header, _)| *header).collect(),
        rows: years.into_iter().map(|(_, cells)| cells).collect(),
    }
}

fn numeric_year(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

impl Table {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Left-aligned columns separated by two spaces.
    pub fn render(&self) -> String {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (w, c) in widths.iter_mut().zip(row) {
                *w = (*w).max(c.chars().count());
            }
        }

        let line = |cells: Vec<&str>| {
            cells
                .iter()
                .zip(&widths)
                .map(|(c, w)| format!("{c:<width$}", width = *w))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        let mut out = vec![self.title.to_string(), line(self.headers.clone())];
        out.extend(
            self.rows
                .iter()
                .map(|row| line(row.iter().map(String::as_str).collect())),
        );
        out.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn report() -> RecoveredDocument {
        json!({
            "company_name": "Glints Pte Ltd",
            "year_1": {"year": 2023, "revenue": 1500000, "profit_before_tax": -20000},
            "year_2": {"year": "2022", "revenue": 1000000, "profit_before_tax": null,
                       "net_cash_operating": 5000},
            "year_3": {}
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[test]
    fn test_rows_sorted_by_year() {
        let table = revenue_profit_table(&report());
        assert_eq!(table.headers, vec!["Year", "Revenue", "Profit before taxes"]);
        assert_eq!(
            table.rows,
            vec![
                vec!["2022".to_string(), "1000000".to_string(), String::new()],
                vec!["2023".to_string(), "1500000".to_string(), "-20000".to_string()],
            ]
        );
    }

    #[test]
    fn test_cash_flow_columns() {
        let table = cash_flow_table(&report());
        assert_eq!(table.headers.len(), 5);
        assert_eq!(table.rows[0][1], "5000");
    }

    #[test]
    fn test_render_alignment() {
        let table = Table {
            title: "T",
            headers: vec!["Year", "Revenue"],
            rows: vec![vec!["2023".into(), "12".into()]],
        };
        assert_eq!(table.render(), "T\nYear  Revenue\n2023  12");
    }

    #[test]
    fn test_no_year_keys_is_empty() {
        let doc = json!({"error": "x"}).as_object().cloned().unwrap();
        assert!(revenue_profit_table(&doc).is_empty());
    }
}
