pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::{Map, Value};

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// Row collections a result may carry: grid points for `compare`, periods
/// for `amortize`.
const ROW_KEYS: [&str; 2] = ["results", "periods"];

/// The `result` object of an envelope, or the value itself.
pub(crate) fn result_of(value: &Value) -> &Value {
    value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value)
}

/// The first non-empty array of objects in the result, if any.
pub(crate) fn row_collection(result: &Map<String, Value>) -> Option<&[Value]> {
    ROW_KEYS.iter().find_map(|key| match result.get(*key) {
        Some(Value::Array(rows)) if rows.first().map_or(false, Value::is_object) => {
            Some(rows.as_slice())
        }
        _ => None,
    })
}

/// Flatten nested objects into dotted keys (`point.loan_term_years`,
/// `dca.monthly_rate`). Arrays of scalars are joined with commas.
pub(crate) fn flatten(prefix: &str, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, val) in map {
                let name = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(&name, val, out);
            }
        }
        other => out.push((prefix.to_string(), scalar(other))),
    }
}

/// Column headers across all rows, in order of first appearance.
pub(crate) fn flatten_rows(rows: &[Value]) -> (Vec<String>, Vec<Vec<(String, String)>>) {
    let mut headers: Vec<String> = Vec::new();
    let flat: Vec<Vec<(String, String)>> = rows
        .iter()
        .map(|row| {
            let mut cells = Vec::new();
            flatten("", row, &mut cells);
            for (key, _) in &cells {
                if !headers.contains(key) {
                    headers.push(key.clone());
                }
            }
            cells
        })
        .collect();
    (headers, flat)
}

pub(crate) fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(arr) => arr.iter().map(scalar).collect::<Vec<_>>().join(", "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
