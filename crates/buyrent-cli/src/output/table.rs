use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{flatten, flatten_rows, result_of, row_collection, scalar};

/// Format output as tables: a field/value summary, then one row per grid
/// point or amortization period.
pub fn print_table(value: &Value) {
    match result_of(value) {
        Value::Object(result) => {
            print_summary(result);
            if let Some(rows) = row_collection(result) {
                println!();
                print_rows(rows);
            }
        }
        other => println!("{}", scalar(other)),
    }

    if let Some(envelope) = value.as_object() {
        print_notes(envelope);
    }
}

fn print_summary(result: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in result {
        if is_row_array(val) {
            continue;
        }
        let mut cells = Vec::new();
        flatten(key, val, &mut cells);
        for (name, cell) in cells {
            builder.push_record([name, cell]);
        }
    }
    println!("{}", Table::from(builder));
}

fn print_rows(rows: &[Value]) {
    let (headers, flat) = flatten_rows(rows);
    let mut builder = Builder::default();
    builder.push_record(headers.iter().map(|h| short_header(h)));
    for cells in flat {
        let row: Vec<String> = headers
            .iter()
            .map(|h| {
                cells
                    .iter()
                    .find(|(k, _)| k == h)
                    .map(|(_, v)| v.clone())
                    .unwrap_or_default()
            })
            .collect();
        builder.push_record(row);
    }
    println!("{}", Table::from(builder));
}

fn print_notes(envelope: &Map<String, Value>) {
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn is_row_array(value: &Value) -> bool {
    matches!(value, Value::Array(rows) if rows.first().map_or(false, Value::is_object))
}

// Grid identity columns are long; the index pair is enough in a table.
fn short_header(header: &str) -> String {
    header.strip_prefix("point.").unwrap_or(header).to_string()
}
