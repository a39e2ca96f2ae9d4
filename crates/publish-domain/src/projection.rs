//! Proyección pura `Draft -> ProjectedDocument`.
//!
//! Sin I/O ni reloj: la fecha del frontmatter sale de `updatedAt` (o
//! `createdAt` si falta), de modo
//! que proyectar el mismo draft dos veces produce bytes idénticos.
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ContentType, Draft, DomainError};

/// Documento listo para commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectedDocument {
    pub path: String,
    pub slug: String,
    pub content_type: ContentType,
    /// Frontmatter + contenido crudo.
    pub body: String,
    /// Mensaje de commit (`Publish: <title>`).
    pub message: String,
}

/// Slug determinista del título.
///
/// Minúsculas, descarta todo fuera de `[a-z0-9]`, espacios y guiones;
/// colapsa espacios/guiones consecutivos en un guion y recorta los extremos.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_sep = false;
    for c in title.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_sep && !slug.is_empty() {
                slug.push('-');
            }
            pending_sep = false;
            slug.push(c);
        } else if c.is_whitespace() || c == '-' {
            pending_sep = true;
        }
    }
    slug
}

fn quoted(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

fn frontmatter(draft: &Draft, date: &str) -> String {
    let tags = draft.tag_list();
    let mut lines = vec!["---".to_string(),
                         format!("title: {}", quoted(&draft.title)),
                         format!("description: {}", quoted(&draft.description)),
                         format!("date: {date}")];
    if tags.is_empty() {
        lines.push("tags: []".to_string());
    } else {
        lines.push("tags:".to_string());
        lines.extend(tags.iter().map(|t| format!("  - {}", quoted(t))));
    }
    lines.push("---".to_string());
    lines.push(String::new());
    lines.join("\n")
}

/// Fecha `YYYY-MM-DD` (UTC) de `updatedAt`, o de `createdAt` si el registro
/// no trae `updatedAt`. Sin ninguno de los dos el draft es inválido.
fn publication_date(draft: &Draft) -> Result<String, DomainError> {
    let millis = [draft.updated_at, draft.created_at].into_iter()
                                                      .find(|ts| *ts > 0)
                                                      .ok_or(DomainError::MissingField("updatedAt"))?;
    let date = DateTime::from_timestamp_millis(millis).ok_or(DomainError::InvalidTimestamp(millis))?;
    Ok(date.format("%Y-%m-%d").to_string())
}

pub fn project(draft: &Draft) -> Result<ProjectedDocument, DomainError> {
    if draft.title.trim().is_empty() {
        return Err(DomainError::MissingField("title"));
    }
    if draft.content.is_empty() {
        return Err(DomainError::MissingField("content"));
    }
    let content_type = draft.content_type()?;
    let slug = slugify(&draft.title);
    if slug.is_empty() {
        return Err(DomainError::EmptySlug(draft.title.clone()));
    }
    let date = publication_date(draft)?;
    let body = format!("{}\n{}", frontmatter(draft, &date), draft.content);
    Ok(ProjectedDocument { path: format!("{}/{slug}.md", content_type.dir()),
                           slug,
                           content_type,
                           body,
                           message: format!("Publish: {}", draft.title) })
}
