use serde_json::Value;
use std::io;

use truck_tco_core::breakdown::{BreakdownRow, CostBreakdown};

/// Write output as CSV to stdout.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    if let Some(rows) = breakdown_rows(value) {
        write_breakdown_csv(&mut wtr, &rows);
        let _ = wtr.flush();
        return;
    }

    match value {
        Value::Object(map) => {
            if let Some(Value::Object(result)) = map.get("result") {
                // Two-column CSV: field, value
                let _ = wtr.write_record(["field", "value"]);
                for (key, val) in result {
                    let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
                }
            } else if let Some(Value::Array(results)) = map.get("results") {
                write_array_csv(&mut wtr, results);
            } else {
                let _ = wtr.write_record(["field", "value"]);
                for (key, val) in map {
                    let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
                }
            }
        }
        Value::Array(arr) => {
            write_array_csv(&mut wtr, arr);
        }
        _ => {
            let _ = wtr.write_record([&format_csv_value(value)]);
        }
    }

    let _ = wtr.flush();
}

/// Long-format rows of a cost breakdown envelope, if `value` is one.
fn breakdown_rows(value: &Value) -> Option<Vec<BreakdownRow>> {
    let result = value.get("result")?;
    result.get("technologies")?;
    serde_json::from_value::<CostBreakdown>(result.clone())
        .ok()
        .map(|breakdown| breakdown.rows())
}

/// Long format: one row per (technology, cost type), ready for a stacked bar chart.
fn write_breakdown_csv(wtr: &mut csv::Writer<io::StdoutLock<'_>>, rows: &[BreakdownRow]) {
    let _ = wtr.write_record(["technology", "cost_type", "amount", "share_pct"]);
    for row in rows {
        let _ = wtr.write_record([
            row.technology.to_string(),
            serde_json::to_value(row.cost_type)
                .map(|v| format_csv_value(&v))
                .unwrap_or_default(),
            row.amount.to_string(),
            row.share_pct.to_string(),
        ]);
    }
}

fn write_array_csv(wtr: &mut csv::Writer<io::StdoutLock<'_>>, arr: &[Value]) {
    if arr.is_empty() {
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
        let _ = wtr.write_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(*h).map(format_csv_value).unwrap_or_default())
                    .collect();
                let _ = wtr.write_record(&row);
            }
        }
    } else {
        for item in arr {
            let _ = wtr.write_record([&format_csv_value(item)]);
        }
    }
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
