use serde_json::Value;
use tabled::{builder::Builder, Table};

use super::{breakdown_technologies, format_decimal};

/// Format output as a table using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(technologies) = breakdown_technologies(value) {
                print_breakdown(technologies, map.get("result"));
            } else if let Some(result) = map.get("result") {
                print_result_table(result);
            } else if let Some(Value::Array(rows)) = map.get("results") {
                print_array_table(rows);
            } else {
                print_flat_object(value);
            }
            print_footer(map);
        }
        Value::Array(arr) => {
            print_array_table(arr);
        }
        _ => {
            println!("{}", value);
        }
    }
}

/// One column per technology, one row per cost type, then the summary rows.
fn print_breakdown(technologies: &[Value], result: Option<&Value>) {
    if technologies.is_empty() {
        println!("(no technology selected)");
        return;
    }

    let mut header = vec!["Cost type".to_string()];
    header.extend(technologies.iter().map(|t| text(t, "technology")));

    // Cost types in first-seen order across technologies.
    let mut cost_types: Vec<(String, String)> = Vec::new();
    for t in technologies {
        for item in items(t) {
            let key = text(item, "cost_type");
            if !cost_types.iter().any(|(k, _)| *k == key) {
                cost_types.push((key, text(item, "label")));
            }
        }
    }

    let mut builder = Builder::default();
    builder.push_record(header);
    for (key, label) in &cost_types {
        let mut row = vec![label.clone()];
        for t in technologies {
            let cell = items(t)
                .iter()
                .find(|i| text(i, "cost_type") == *key)
                .map(|i| {
                    format!(
                        "{} ({}%)",
                        format_decimal(&i["amount"], 0),
                        format_decimal(&i["share_pct"], 1)
                    )
                })
                .unwrap_or_else(|| "-".to_string());
            row.push(cell);
        }
        builder.push_record(row);
    }

    let summary = [
        ("Subsidy (absorbed)", "subsidy", 0),
        ("Total", "total", 0),
        ("Cost per km", "cost_per_km", 3),
        ("Delta vs ICEV", "delta_to_baseline", 0),
        ("kWh/km", "kwh_per_km", 3),
        ("EUR/kWh", "eur_per_kwh", 4),
    ];
    for (label, field, dp) in summary {
        let mut row = vec![label.to_string()];
        row.extend(technologies.iter().map(|t| format_decimal(&t[field], dp)));
        builder.push_record(row);
    }

    println!("{}", Table::from(builder));

    if let Some(result) = result {
        println!(
            "\nYear {}, {} t, {} years",
            format_value(&result["year"]),
            format_value(&result["weight_class"]),
            format_value(&result["observation_years"])
        );
    }
}

fn items(technology: &Value) -> &[Value] {
    technology["items"].as_array().map(Vec::as_slice).unwrap_or(&[])
}

fn text(value: &Value, field: &str) -> String {
    format_value(&value[field])
}

fn print_result_table(result: &Value) {
    if let Value::Object(res_map) = result {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        let mut nested = Vec::new();
        let mut scalars = 0;
        for (key, val) in res_map {
            match val {
                Value::Array(arr) if arr.iter().all(Value::is_object) => {
                    nested.push((key, arr));
                }
                _ => {
                    builder.push_record([key.as_str(), &format_value(val)]);
                    scalars += 1;
                }
            }
        }
        if scalars > 0 {
            println!("{}", Table::from(builder));
        }
        for (key, arr) in nested {
            println!("\n{}:", key);
            print_array_table(arr);
        }
    } else {
        println!("{}", format_value(result));
    }
}

fn print_footer(envelope: &serde_json::Map<String, Value>) {
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

fn print_flat_object(value: &Value) {
    if let Value::Object(map) = value {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in map {
            builder.push_record([key.as_str(), &format_value(val)]);
        }
        let table = Table::from(builder);
        println!("{}", table);
    }
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }

        let table = Table::from(builder);
        println!("{}", table);
    } else {
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
