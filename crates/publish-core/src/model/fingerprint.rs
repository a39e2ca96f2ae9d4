use serde::Serialize;
use serde_json::Value;

/// Insumos del fingerprint de un step. NO es el fingerprint final (hash)
/// sino el modelo previo a canonicalizar.
#[derive(Serialize)]
pub struct StepFingerprintInput<'a> {
    pub engine_version: &'a str,
    pub definition_hash: &'a str,
    pub step_index: usize,
    pub step_id: &'a str,
    pub output_hashes: &'a [String],
    pub params: &'a Value,
}

/// Insumos del fingerprint agregado de un run completado: fingerprints de
/// steps en orden de definición.
#[derive(Serialize)]
pub struct RunFingerprintInput<'a> {
    pub engine_version: &'a str,
    pub definition_hash: &'a str,
    pub step_fingerprints: &'a [String],
}
