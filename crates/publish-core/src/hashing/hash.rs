//! Hash helpers (blake3, hex de 64 caracteres).

use blake3::Hasher;
use serde_json::Value;

use super::to_canonical_json;

/// Hashea bytes arbitrarios y devuelve hex.
pub fn hash_bytes(input: &[u8]) -> String {
    let mut h = Hasher::new();
    h.update(input);
    h.finalize().to_hex().to_string()
}

/// Hashea un string y devuelve hex.
pub fn hash_str(input: &str) -> String {
    hash_bytes(input.as_bytes())
}

/// Hash de un JSON en su forma canónica (independiente del orden de claves).
pub fn hash_value(value: &Value) -> String {
    hash_str(&to_canonical_json(value))
}
