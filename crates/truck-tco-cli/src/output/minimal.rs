use serde_json::Value;

use super::{breakdown_technologies, format_decimal};

/// Print just the key answer from the output.
///
/// For a cost breakdown that is one `TECHNOLOGY total` line per technology;
/// otherwise the first well-known field, then the first field of the result.
pub fn print_minimal(value: &Value) {
    if let Some(technologies) = breakdown_technologies(value) {
        for t in technologies {
            println!(
                "{} {}",
                format_minimal(&t["technology"]),
                format_decimal(&t["total"], 2)
            );
        }
        return;
    }

    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    // Normalised values live one level down.
    let priority_paths: [&[&str]; 3] = [
        &["energy_cost", "normalized", "value"],
        &["consumption", "normalized", "value"],
        &["diesel_co2_kg_per_kwh"],
    ];
    for path in priority_paths {
        let found = path.iter().try_fold(result_obj, |v, key| v.get(*key));
        if let Some(val) = found.filter(|v| !v.is_null()) {
            println!("{}", format_minimal(val));
            return;
        }
    }

    if let Value::Object(map) = result_obj {
        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_minimal(val));
            return;
        }
    }

    println!("{}", format_minimal(result_obj));
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
