mod test_support;

use std::sync::Arc;
use std::time::Duration;

use publish_adapters::{publish_pipeline, InMemoryDraftStore, InMemoryVersionedStore, PublishOutcome, Publisher};
use publish_core::RetryPolicy;
use publish_domain::{Draft, DraftStatus};
use test_support::pg_store;

fn draft(id: &str) -> Draft {
    Draft { id: id.into(),
            title: format!("Durable {id}"),
            content: "Body".into(),
            description: String::new(),
            tags: String::new(),
            content_type: "tech-blog".into(),
            status: DraftStatus::Draft,
            created_at: 1_717_200_000_000,
            updated_at: 1_717_243_200_000,
            published_at: None }
}

// Un segundo proceso (engine nuevo sobre la misma base) que recibe la
// re-entrega no vuelve a escribir: el memo vive en Postgres.
#[tokio::test]
async fn redelivery_from_a_fresh_engine_reuses_durable_memo() {
    let Some(first_store) = pg_store("redelivery_from_a_fresh_engine_reuses_durable_memo") else { return };
    let Some(second_store) = pg_store("redelivery_from_a_fresh_engine_reuses_durable_memo") else { return };
    let draft_id = format!("d-{}", uuid::Uuid::new_v4());
    let drafts = Arc::new(InMemoryDraftStore::with_drafts([draft(&draft_id)]));
    let files = Arc::new(InMemoryVersionedStore::new());
    let policy = RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(2));

    let first = Publisher::new(publish_pipeline(first_store, drafts.clone(), files.clone(), policy));
    let ack = first.trigger(&draft_id).unwrap();
    let outcome = first.wait(ack.run_id).await.unwrap();
    assert!(matches!(outcome, PublishOutcome::Completed { .. }));

    let second = Publisher::new(publish_pipeline(second_store, drafts.clone(), files.clone(), policy));
    assert_eq!(second.outcome(ack.run_id).unwrap(), outcome);
    assert_eq!(second.redeliver(ack.run_id).await.unwrap(), outcome);
    assert_eq!(files.commit_count(), 1);
    assert_eq!(drafts.fetch_calls(), 1);
}
