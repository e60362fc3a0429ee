use serde_json::Value;
use std::io;

use super::{flatten, flatten_rows, result_of, row_collection};

/// Write output as CSV to stdout.
///
/// Results with a row collection (grid points, amortization periods) are
/// written one row per entry with flattened columns; anything else becomes
/// a two-column field/value listing.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let result = result_of(value);
    let written = match result {
        Value::Object(map) => match row_collection(map) {
            Some(rows) => write_rows(&mut wtr, rows),
            None => write_fields(&mut wtr, result),
        },
        other => wtr.write_record([super::scalar(other)]),
    };
    if let Err(e) = written.and_then(|_| wtr.flush().map_err(csv::Error::from)) {
        eprintln!("CSV write error: {}", e);
    }
}

fn write_rows(wtr: &mut csv::Writer<io::StdoutLock<'_>>, rows: &[Value]) -> csv::Result<()> {
    let (headers, flat) = flatten_rows(rows);
    wtr.write_record(&headers)?;
    for cells in flat {
        let row: Vec<&str> = headers
            .iter()
            .map(|h| {
                cells
                    .iter()
                    .find(|(k, _)| k == h)
                    .map_or("", |(_, v)| v.as_str())
            })
            .collect();
        wtr.write_record(&row)?;
    }
    Ok(())
}

fn write_fields(wtr: &mut csv::Writer<io::StdoutLock<'_>>, result: &Value) -> csv::Result<()> {
    let mut cells = Vec::new();
    flatten("", result, &mut cells);
    wtr.write_record(["field", "value"])?;
    for (key, val) in cells {
        wtr.write_record([key, val])?;
    }
    Ok(())
}
