use serde_json::Value;

/// Headline figure of each calculator, in priority order.
const PRIORITY_KEYS: [&str; 9] = [
    "total_cost",
    "annual_savings",
    "net_investment",
    "cash_payback_year",
    "discounted_capex",
    "total",
    "rate_code",
    "rate_cents_per_kwh",
    "reference_monthly_cost",
];

/// Print just the key answer value from the output, falling back to the
/// first field of the result object.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Value::Object(map) = result_obj {
        // A null payback year is still the answer
        for key in PRIORITY_KEYS {
            if let Some(val) = map.get(key) {
                println!("{}", format_minimal(val));
                return;
            }
        }

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
        Value::Null => "none".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
