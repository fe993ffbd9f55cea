/// Workflow node identifiers are assigned by the caller (UI or sequence file).
pub type NodeId = u64;

/// Arbitrary form value stored against a node field.
pub type FieldValues = serde_json::Map<String, serde_json::Value>;

/// JSON number for `n`, written as an integer when `n` is integral so
/// defaults and coordinates read `0`, not `0.0`.
pub fn json_number(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        serde_json::Value::from(n as i64)
    } else {
        serde_json::Value::from(n)
    }
}
