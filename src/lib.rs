//! publishflow
//!
//! Punto de entrada del pipeline de publicación:
//! - `config`: lectura de variables de entorno (.env) a `AppConfig`.
//! - `app`: construcción de stores y del `Publisher` a partir de la
//!   configuración.
//!
//! Lo usa `main.rs` y los tests de integración del binario.

pub mod app;
pub mod config;

pub use config::{AppConfig, ConfigError};
