use std::sync::Arc;

use publish_adapters::{FsVersionedStore, InMemoryDraftStore, PublishOutcome};
use publish_core::{EventStore, InMemoryEventStore};
use publish_domain::{Draft, DraftStatus};
use publishflow::app::{preview, publisher_with, status_publisher};
use publishflow::AppConfig;

fn draft(id: &str, title: &str, content: &str) -> Draft {
    Draft { id: id.into(),
            title: title.into(),
            content: content.into(),
            description: "Short intro".into(),
            tags: "rust, publishing".into(),
            content_type: "tech-blog".into(),
            status: DraftStatus::Draft,
            created_at: 1_717_200_000_000,
            updated_at: 1_717_243_200_000,
            published_at: None }
}

#[tokio::test]
async fn publish_writes_markdown_into_content_dir() {
    let dir = tempfile::tempdir().unwrap();
    let drafts = Arc::new(InMemoryDraftStore::with_drafts([draft("d1", "Local Run", "Hello from disk")]));
    let publisher = publisher_with(Arc::new(InMemoryEventStore::default()),
                                   drafts.clone(),
                                   Arc::new(FsVersionedStore::new(dir.path())));

    let ack = publisher.trigger("d1").unwrap();
    let outcome = publisher.wait(ack.run_id).await.unwrap();

    let PublishOutcome::Completed { path, commit } = outcome else {
        panic!("expected completed run, got {outcome:?}");
    };
    assert_eq!(path, "content/tech-blog/local-run.md");
    assert!(commit.is_create());

    let written = std::fs::read_to_string(dir.path().join(&path)).unwrap();
    assert!(written.starts_with("---\ntitle: \"Local Run\"\n"));
    assert!(written.contains("tags:\n  - \"rust\"\n  - \"publishing\"\n"));
    assert!(written.ends_with("---\n\nHello from disk"));
    assert_eq!(drafts.get("d1").unwrap().status, DraftStatus::Published);
}

#[tokio::test]
async fn republish_after_edit_updates_file_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let drafts = Arc::new(InMemoryDraftStore::with_drafts([draft("d1", "Local Run", "v1")]));
    let publisher = publisher_with(Arc::new(InMemoryEventStore::default()),
                                   drafts.clone(),
                                   Arc::new(FsVersionedStore::new(dir.path())));

    let first = publisher.trigger("d1").unwrap();
    publisher.wait(first.run_id).await.unwrap();
    drafts.insert(draft("d1", "Local Run", "v2"));
    let second = publisher.trigger("d1").unwrap();
    let outcome = publisher.wait(second.run_id).await.unwrap();

    let PublishOutcome::Completed { path, commit } = outcome else {
        panic!("expected completed run, got {outcome:?}");
    };
    assert!(!commit.is_create());
    let written = std::fs::read_to_string(dir.path().join(path)).unwrap();
    assert!(written.ends_with("\nv2"));
}

#[tokio::test]
async fn status_reads_outcome_from_shared_event_log() {
    let dir = tempfile::tempdir().unwrap();
    let events: Arc<dyn EventStore> = Arc::new(InMemoryEventStore::default());
    let drafts = Arc::new(InMemoryDraftStore::with_drafts([draft("d1", "Local Run", "body")]));
    let publisher = publisher_with(events.clone(), drafts, Arc::new(FsVersionedStore::new(dir.path())));
    let ack = publisher.trigger("d1").unwrap();
    let outcome = publisher.wait(ack.run_id).await.unwrap();

    // Mismo log, stores de relleno: sólo se reconstruye el estado.
    let reader = publishflow::app::publisher_with(events,
                                                  Arc::new(InMemoryDraftStore::new()),
                                                  Arc::new(publish_adapters::InMemoryVersionedStore::new()));
    assert_eq!(reader.outcome(ack.run_id).unwrap(), outcome);
}

#[test]
fn status_publisher_needs_no_external_credentials() {
    let publisher = status_publisher(&AppConfig::default()).unwrap();
    assert!(publisher.outcome(uuid::Uuid::new_v4()).is_err());
}

#[test]
fn preview_projects_draft_json_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let json = serde_json::json!({
        "id": "d9",
        "title": "Preview Me",
        "content": "Offline body",
        "tags": "",
        "contentType": "articles",
        "updatedAt": 1_717_243_200_000_i64
    });
    std::io::Write::write_all(&mut file, json.to_string().as_bytes()).unwrap();

    let doc = preview(file.path()).unwrap();
    assert_eq!(doc.path, "content/articles/preview-me.md");
    assert!(doc.body.contains("date: 2024-06-01"));
    assert!(doc.body.contains("tags: []"));
}

#[test]
fn preview_rejects_invalid_draft() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let json = serde_json::json!({ "id": "d9", "title": "  ", "content": "x", "contentType": "articles" });
    std::io::Write::write_all(&mut file, json.to_string().as_bytes()).unwrap();

    let err = preview(file.path()).unwrap_err();
    assert!(err.to_string().contains("title"), "{err}");
}
