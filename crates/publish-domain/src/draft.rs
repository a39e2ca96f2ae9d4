//! Registro `Draft` tal como lo entrega el store externo (camelCase).
//!
//! El pipeline sólo lo lee; el único campo que escribe de vuelta es el
//! estado (`status`/`publishedAt`) vía el step de actualización.
use serde::{Deserialize, Serialize};

use crate::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentType {
    #[serde(rename = "tech-blog")]
    TechBlog,
    #[serde(rename = "articles")]
    Articles,
}

impl ContentType {
    /// Conjunto cerrado: un valor desconocido nunca cae en un default.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        match raw {
            "tech-blog" => Ok(ContentType::TechBlog),
            "articles" => Ok(ContentType::Articles),
            other => Err(DomainError::UnknownContentType(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::TechBlog => "tech-blog",
            ContentType::Articles => "articles",
        }
    }

    /// Directorio destino dentro del repositorio de contenido.
    pub fn dir(&self) -> &'static str {
        match self {
            ContentType::TechBlog => "content/tech-blog",
            ContentType::Articles => "content/articles",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftStatus {
    #[default]
    Draft,
    Publishing,
    Published,
}

impl DraftStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DraftStatus::Draft => "draft",
            DraftStatus::Publishing => "publishing",
            DraftStatus::Published => "published",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub description: String,
    /// Lista separada por comas, tal cual la guarda el editor.
    #[serde(default)]
    pub tags: String,
    /// Se mantiene en crudo; la proyección decide si es válido.
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub status: DraftStatus,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<i64>,
}

impl Draft {
    /// Tags normalizados: separados por coma, recortados y sin vacíos.
    pub fn tag_list(&self) -> Vec<&str> {
        self.tags
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect()
    }

    pub fn content_type(&self) -> Result<ContentType, DomainError> {
        ContentType::parse(&self.content_type)
    }
}
