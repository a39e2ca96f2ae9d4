//! JSON canónico mínimo: claves de objeto ordenadas, sin espacios.
//! Dos `Value` semánticamente iguales producen el mismo string.

use serde_json::Value;
use std::collections::BTreeMap;

pub fn to_canonical_json(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        // Display de `Value::String` emite el literal JSON escapado.
        Value::String(_) => value.to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(to_canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        Value::Object(map) => {
            let tree: BTreeMap<&String, String> = map.iter().map(|(k, v)| (k, to_canonical_json(v))).collect();
            let items: Vec<String> = tree.into_iter()
                                         .map(|(k, v)| format!("{}:{}", Value::from(k.as_str()), v))
                                         .collect();
            format!("{{{}}}", items.join(","))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_are_sorted_recursively() {
        let v = json!({"b": {"z": 1, "a": [true, null]}, "a": "x\"y"});
        assert_eq!(to_canonical_json(&v), r#"{"a":"x\"y","b":{"a":[true,null],"z":1}}"#);
    }
}
