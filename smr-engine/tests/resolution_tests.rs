//! End-to-end resolution tests
//!
//! Requests go through the reference builder, the local library lookup and
//! the fallback orchestrator against canned sources. Nothing leaves the
//! loopback interface.

use smr_common::config::TomlConfig;
use smr_engine::library::{
    enrich_reference, open_library, FallbackLibrary, GraphqlLibrary, LibraryLookup, SqliteLibrary,
};
use smr_engine::sources::StaticSource;
use smr_engine::{
    build_reference, CandidateRecord, EngineSettings, FallbackState, LookupRequest,
    QueryFallbackOrchestrator, ReferenceDescriptor, Resolution,
};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const SCENE_URL: &str = "https://www.examplesite.com/en/video/examplesite/scene-alpha/4412";

async fn create_library(dir: &Path) -> PathBuf {
    let path = dir.join("library.sqlite");
    let pool = SqlitePool::connect(&format!("sqlite://{}?mode=rwc", path.display()))
        .await
        .unwrap();

    sqlx::query("CREATE TABLE scenes (id INTEGER PRIMARY KEY, size INTEGER, duration REAL, height INTEGER)")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO scenes (id, size, duration, height) VALUES (12, 1000000000, 600.0, 1080)")
        .execute(&pool)
        .await
        .unwrap();

    pool.close().await;
    path
}

fn listed_scene() -> CandidateRecord {
    CandidateRecord {
        id: "4412".to_string(),
        title: "Scene Alpha".to_string(),
        url_slug: Some("scene-alpha".to_string()),
        duration_seconds: Some(605),
        file_size_bytes_by_quality: Some(HashMap::from([
            ("1080p".to_string(), 1_005_000_000),
            ("4k".to_string(), 3_900_000_000),
        ])),
        site_name: Some("examplesite".to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_identifier_lookup_with_library_facts_reaches_top_tier() {
    let dir = tempfile::tempdir().unwrap();
    let library = SqliteLibrary::open(&create_library(dir.path()).await)
        .await
        .unwrap();

    let request = LookupRequest {
        title: Some("Scene.Alpha.1080p.mp4".to_string()),
        url: Some(SCENE_URL.to_string()),
        id: Some("12".to_string()),
        ..Default::default()
    };
    let mut reference = build_reference(&request);
    assert!(enrich_reference(&library, "12", &mut reference).await);

    let source = StaticSource::new("network").with_identifier("4412", vec![listed_scene()]);
    let outcome = QueryFallbackOrchestrator::new(&source, EngineSettings::default())
        .resolve(&reference)
        .await
        .unwrap();

    assert_eq!(outcome.state, FallbackState::Accepted);
    let matched = outcome.resolution.matched().unwrap();
    assert_eq!(matched.tier.code(), "ASDN");
    assert_eq!(matched.candidate.id, "4412");
    assert_eq!(source.issued(), vec!["id:4412"]);
}

#[tokio::test]
async fn test_unreachable_library_endpoint_falls_back_to_database() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = create_library(dir.path()).await;

    let endpoint = GraphqlLibrary::new("http://127.0.0.1:9", None).unwrap();
    let database = SqliteLibrary::open(&db_path).await.unwrap();
    let library = FallbackLibrary::new(endpoint, database);

    let mut reference = build_reference(&LookupRequest {
        url: Some(SCENE_URL.to_string()),
        ..Default::default()
    });
    assert!(enrich_reference(&library, "12", &mut reference).await);
    assert_eq!(reference.duration_seconds, Some(600));
    assert_eq!(reference.file_size_bytes, Some(1_000_000_000));
    assert_eq!(reference.quality_label.as_deref(), Some("1080"));
}

#[tokio::test]
async fn test_configured_library_prefers_endpoint_then_database() {
    let dir = tempfile::tempdir().unwrap();
    let config = TomlConfig {
        library_database: Some(create_library(dir.path()).await),
        library_endpoint: Some("http://127.0.0.1:9".to_string()),
        library_api_key: Some("secret".to_string()),
        ..Default::default()
    };

    let library = open_library(&config).await.unwrap();
    let facts = library.file_facts("12").await.unwrap().unwrap();
    assert_eq!(facts.duration_seconds, Some(600));
    assert_eq!(library.file_facts("999").await.unwrap(), None);
}

#[tokio::test]
async fn test_identity_search_without_local_facts_trusts_close_slug() {
    let reference = build_reference(&LookupRequest {
        url: Some(SCENE_URL.to_string()),
        ..Default::default()
    });

    let hit = CandidateRecord {
        id: "4412".to_string(),
        title: "Unrelated Marketing Title".to_string(),
        url_slug: Some("scene-alpha-part-2".to_string()),
        ..Default::default()
    };
    let source = StaticSource::new("network").with_identifier("4412", vec![hit]);

    let outcome = QueryFallbackOrchestrator::new(&source, EngineSettings::default())
        .resolve(&reference)
        .await
        .unwrap();

    let matched = outcome.resolution.matched().unwrap();
    assert_eq!(matched.tier.code(), "A");
    assert!(matched.diagnostics.url_ratio > 0.7);
}

#[tokio::test]
async fn test_title_only_reference_accepted_on_ratio() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = dir.path().join("fixture.json");
    std::fs::write(
        &fixture,
        r#"{
            "name": "network",
            "by_text": {
                "rare scene": [
                    {"id": "77", "title": "Rare Scene"},
                    {"id": "78", "title": "Rare Scenery Tour"}
                ]
            }
        }"#,
    )
    .unwrap();
    let source = StaticSource::load(&fixture).unwrap();

    let reference = build_reference(&LookupRequest {
        title: Some("Rare.Scene.mkv".to_string()),
        ..Default::default()
    });
    let outcome = QueryFallbackOrchestrator::new(&source, EngineSettings::default())
        .resolve(&reference)
        .await
        .unwrap();

    let matched = outcome.resolution.matched().unwrap();
    assert_eq!(matched.tier.code(), "R");
    assert_eq!(matched.candidate.id, "77");
    assert_eq!(matched.diagnostics.title_ratio, 1.0);
}

#[tokio::test]
async fn test_network_agreement_alone_is_not_enough() {
    let reference = ReferenceDescriptor {
        title: Some("Scene Alpha".to_string()),
        domain: Some("examplesite".to_string()),
        ..Default::default()
    };
    let hit = CandidateRecord {
        id: "5".to_string(),
        title: "Other Scene Entirely".to_string(),
        site_name: Some("ExampleSite".to_string()),
        ..Default::default()
    };
    let source = StaticSource::new("network").with_text("Scene Alpha", vec![hit]);

    let outcome = QueryFallbackOrchestrator::new(&source, EngineSettings::default())
        .resolve(&reference)
        .await
        .unwrap();

    assert_eq!(outcome.resolution, Resolution::NoMatch);
    assert_eq!(outcome.state, FallbackState::Exhausted);
}

#[tokio::test]
async fn test_resolution_is_repeatable() {
    let reference = build_reference(&LookupRequest {
        title: Some("Scene Alpha".to_string()),
        url: Some(SCENE_URL.to_string()),
        ..Default::default()
    });
    let source = StaticSource::new("network").with_text(
        "scene-alpha",
        vec![
            CandidateRecord {
                id: "1".to_string(),
                title: "Scene Alpha".to_string(),
                url_slug: Some("scene-alpha-x".to_string()),
                ..Default::default()
            },
            listed_scene(),
        ],
    );
    let orchestrator = QueryFallbackOrchestrator::new(&source, EngineSettings::default());

    let first = orchestrator.resolve(&reference).await.unwrap();
    let second = orchestrator.resolve(&reference).await.unwrap();
    assert_eq!(first.resolution, second.resolution);
    assert_eq!(first.resolution.matched().unwrap().candidate.id, "4412");
}
