use publish_domain::{project, ContentType, DomainError, Draft, DraftStatus};

fn hello_world() -> Draft {
    Draft { id: "d1".into(),
            title: "Hello World".into(),
            content: "Body text".into(),
            description: "First post".into(),
            tags: "a, b".into(),
            content_type: "articles".into(),
            status: DraftStatus::Draft,
            created_at: 1_717_000_000_000,
            // 2024-06-01T12:00:00Z
            updated_at: 1_717_243_200_000,
            published_at: None }
}

#[test]
fn test_hello_world_projection() {
    let doc = project(&hello_world()).unwrap();
    assert_eq!(doc.path, "content/articles/hello-world.md");
    assert_eq!(doc.slug, "hello-world");
    assert_eq!(doc.content_type, ContentType::Articles);
    assert_eq!(doc.message, "Publish: Hello World");
    assert_eq!(doc.body,
               "---\ntitle: \"Hello World\"\ndescription: \"First post\"\ndate: 2024-06-01\ntags:\n  - \"a\"\n  - \"b\"\n---\n\nBody text");
}

#[test]
fn test_projection_is_byte_identical_across_calls() {
    let d = hello_world();
    assert_eq!(project(&d).unwrap(), project(&d).unwrap());
}

#[test]
fn test_tech_blog_path_and_empty_tags() {
    let mut d = hello_world();
    d.content_type = "tech-blog".into();
    d.tags = " , ".into();
    let doc = project(&d).unwrap();
    assert_eq!(doc.path, "content/tech-blog/hello-world.md");
    assert!(doc.body.contains("\ntags: []\n"));
}

#[test]
fn test_invalid_drafts_are_rejected() {
    let mut no_title = hello_world();
    no_title.title = "   ".into();
    assert_eq!(project(&no_title), Err(DomainError::MissingField("title")));

    let mut no_content = hello_world();
    no_content.content.clear();
    assert_eq!(project(&no_content), Err(DomainError::MissingField("content")));

    let mut unknown = hello_world();
    unknown.content_type = "newsletter".into();
    assert_eq!(project(&unknown), Err(DomainError::UnknownContentType("newsletter".into())));

    let mut symbols = hello_world();
    symbols.title = "!!!".into();
    assert!(matches!(project(&symbols), Err(DomainError::EmptySlug(_))));
}

#[test]
fn test_title_quotes_are_escaped_in_frontmatter() {
    let mut d = hello_world();
    d.title = "The \"best\" post".into();
    let doc = project(&d).unwrap();
    assert!(doc.body.starts_with("---\ntitle: \"The \\\"best\\\" post\"\n"));
    assert_eq!(doc.slug, "the-best-post");
}

#[test]
fn test_missing_updated_at_falls_back_to_created_at() {
    let mut d = hello_world();
    d.updated_at = 0;
    // createdAt: 2024-05-29T16:26:40Z
    let doc = project(&d).unwrap();
    assert!(doc.body.contains("\ndate: 2024-05-29\n"), "{}", doc.body);
}

#[test]
fn test_record_without_timestamps_is_rejected() {
    let d: Draft = serde_json::from_value(serde_json::json!({
        "id": "d1",
        "title": "Hello World",
        "content": "Body text",
        "contentType": "articles"
    })).unwrap();
    assert_eq!(project(&d).unwrap_err(), DomainError::MissingField("updatedAt"));
}

#[test]
fn test_tags_are_quoted_in_frontmatter() {
    let mut d = hello_world();
    d.tags = "rust: async, #tips".into();
    let doc = project(&d).unwrap();
    assert!(doc.body.contains("tags:\n  - \"rust: async\"\n  - \"#tips\"\n---"), "{}", doc.body);
}
