use std::fmt;

use serde::{Deserialize, Serialize};

/// Marcador opaco de versión de un path en el store versionado (sha del
/// blob en GitHub, hash del contenido en disco).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionToken(pub String);

impl VersionToken {
    pub fn new(token: impl Into<String>) -> Self {
        VersionToken(token.into())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resultado de la escritura condicional de un documento.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitResult {
    pub path: String,
    /// `None` si el path no existía: la escritura fue una creación.
    pub prior_version_token: Option<VersionToken>,
    pub new_version_token: VersionToken,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_id: Option<String>,
}

impl CommitResult {
    pub fn is_create(&self) -> bool {
        self.prior_version_token.is_none()
    }
}
