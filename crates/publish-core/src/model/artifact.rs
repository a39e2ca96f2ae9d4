//! Artifact neutral del flujo.
//!
//! Un `Artifact` es la unidad de datos que un step deja memoizada para su
//! run. Es neutral:
//! - `payload` es JSON genérico; el motor no interpreta su semántica.
//! - `hash` lo calcula el engine sobre el JSON canonicalizado y sirve como
//!   identidad (direccionamiento por contenido) en el store de artifacts.
//! - `metadata` permite anotar información auxiliar que no entra al hash.
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::hashing::hash_value;

/// Tipos neutrales de artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// JSON genérico sin semántica para el motor.
    GenericJson,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::GenericJson => "generic_json",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub hash: String,            // hash canónico del payload (asignado por engine)
    pub payload: Value,          // contenido neutro JSON
    pub metadata: Option<Value>, // información auxiliar (no entra al hash)
}

impl Artifact {
    /// Crea un artifact sin hash; el engine lo completa al memoizarlo.
    pub fn new_unhashed(kind: ArtifactKind, payload: Value, metadata: Option<Value>) -> Self {
        Self { kind,
               hash: String::new(),
               payload,
               metadata }
    }

    /// Devuelve el artifact con `hash` calculado sobre el payload canónico.
    pub fn hashed(mut self) -> Self {
        self.hash = hash_value(&self.payload);
        self
    }
}
