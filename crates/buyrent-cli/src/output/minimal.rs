use serde_json::{Map, Value};

use super::{result_of, scalar};

/// Headline fields, most specific first.
const PRIORITY_KEYS: [&str; 5] = [
    "annualized_breakeven_rate",
    "required_irr",
    "future_value",
    "total_payment",
    "net_cost",
];

/// Print just the key answer.
///
/// A scenario grid prints one line per point: rate, term, required IRR and,
/// when the DCA comparison ran, the breakeven market return or the failure
/// kind.
pub fn print_minimal(value: &Value) {
    let result = result_of(value);

    if let Value::Object(map) = result {
        if let Some(Value::Array(points)) = map.get("results") {
            for point in points {
                println!("{}", grid_line(point));
            }
            return;
        }

        for key in PRIORITY_KEYS {
            if let Some(val) = map.get(key) {
                if !val.is_null() {
                    println!("{}", scalar(val));
                    return;
                }
            }
        }

        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, scalar(val));
            return;
        }
    }

    println!("{}", scalar(result));
}

fn grid_line(point: &Value) -> String {
    let empty = Map::new();
    let row = point.as_object().unwrap_or(&empty);
    let field = |obj: &Map<String, Value>, key: &str| obj.get(key).map(scalar).unwrap_or_default();

    let identity = row.get("point").and_then(Value::as_object).unwrap_or(&empty);
    let mut parts = vec![
        field(identity, "yearly_interest_rate"),
        field(identity, "loan_term_years"),
        field(row, "required_irr"),
    ];
    if let Some(Value::Object(dca)) = row.get("dca") {
        match dca.get("dca_market_irr") {
            Some(rate) => parts.push(scalar(rate)),
            None => parts.push(field(dca, "kind")),
        }
    }
    parts.join(" ")
}
