//! Recursive `err: true` counter.

use serde_json::Value;

/// Count every key literally named `err` whose value is the boolean `true`,
/// anywhere in the object graph.
pub fn count_err_true(v: &Value) -> i64 {
    match v {
        Value::Object(map) => {
            let mut count = 0;
            for (k, val) in map {
                if k == "err" && val.as_bool() == Some(true) {
                    count += 1;
                }
                count += count_err_true(val);
            }
            count
        }
        Value::Array(items) => items.iter().map(count_err_true).sum(),
        _ => 0,
    }
}
