//! End-to-end tests for the crawl pipeline
//!
//! These tests serve a small catalog from a wiremock server and drive
//! complete sessions through `crawl`, checking what lands in the dataset.

mod common;

use common::{mount_card, mount_list_page, test_config, SiteCard};
use dokkan_archive::config::FetchStrategy;
use dokkan_archive::crawler::{crawl, StopSignal};
use dokkan_archive::output::{export_dataset, CardFilter, Catalog};
use dokkan_archive::storage::{SessionLock, SqliteStorage, Storage};
use dokkan_archive::{DokkanError, Rarity, SessionState};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_full_crawl_builds_linked_dataset() {
    let server = MockServer::start().await;
    let cards = [
        SiteCard::new("1", "Son Goku [Kid]", "sr"),
        SiteCard::new("2", "Son Goku [Legendary]", "lr"),
        SiteCard::new("3", "Son Goku [Super Saiyan]", "ur"),
        SiteCard::new("4", "Son Goku [Angel]", "ssr"),
        SiteCard::new("5", "Vegeta", "ur"),
    ];
    mount_list_page(&server, 1, &["1", "2", "3", "4", "5"], None).await;
    for card in &cards {
        mount_card(&server, card, 1).await;
    }

    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("cards.db");
    let config = test_config(&server.uri(), &db, 50);

    let report = crawl(&config, "hash", StopSignal::new()).await.unwrap();

    assert_eq!(report.state, SessionState::Done);
    assert_eq!(report.inserted, 5);
    assert_eq!(report.pending, 0);

    let storage = SqliteStorage::new(&db).unwrap();
    assert!(storage.check_integrity().unwrap().is_empty());
    assert_eq!(storage.load_index().unwrap().len(), 5);
    assert!(storage.load_frontier().unwrap().is_none());

    let catalog = Catalog::load(&storage).unwrap();
    let goku = catalog.get("1").unwrap();
    assert_eq!(goku.versions.key, "Son Goku");
    assert_eq!(goku.versions.card_ids, vec!["2", "3", "4", "1"]);

    let urs = catalog.list(&CardFilter {
        rarity: Some(Rarity::UR),
        ..CardFilter::default()
    });
    assert_eq!(urs.len(), 2);

    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, SessionState::Done);
    assert_eq!(run.items_committed, 5);
    assert!(!SessionLock::lock_path(&db).exists());
}

#[tokio::test]
async fn test_budget_then_resume_finishes_remaining() {
    let server = MockServer::start().await;
    let ids = ["11", "12", "13", "14", "15", "16", "17", "18"];
    mount_list_page(&server, 1, &ids, None).await;
    for id in ids {
        mount_card(&server, &SiteCard::new(id, &format!("Piccolo {}", id), "ssr"), 1).await;
    }

    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("cards.db");
    let config = test_config(&server.uri(), &db, 5);

    let first = crawl(&config, "hash", StopSignal::new()).await.unwrap();
    assert_eq!(first.state, SessionState::BudgetReached);
    assert_eq!(first.new_items(), 5);
    {
        let storage = SqliteStorage::new(&db).unwrap();
        assert_eq!(storage.count_cards().unwrap(), 5);
        let cursor = storage.load_frontier().unwrap().unwrap();
        assert_eq!(cursor.pending_details(), 3);
    }

    let second = crawl(&config, "hash", StopSignal::new()).await.unwrap();
    assert_eq!(second.state, SessionState::Done);
    assert_eq!(second.inserted, 3);

    let storage = SqliteStorage::new(&db).unwrap();
    assert_eq!(storage.count_cards().unwrap(), 8);
    assert!(storage.load_frontier().unwrap().is_none());
}

#[tokio::test]
async fn test_second_run_fetches_no_known_cards() {
    let server = MockServer::start().await;
    mount_list_page(&server, 1, &["21", "22", "23"], None).await;
    for id in ["21", "22", "23"] {
        mount_card(&server, &SiteCard::new(id, "Gohan", "ur"), 1).await;
    }

    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("cards.db");
    let config = test_config(&server.uri(), &db, 50);

    crawl(&config, "hash", StopSignal::new()).await.unwrap();
    let before = SqliteStorage::new(&db).unwrap().load_index().unwrap();

    let report = crawl(&config, "hash", StopSignal::new()).await.unwrap();
    assert_eq!(report.state, SessionState::Done);
    assert_eq!(report.commits(), 0);

    let after = SqliteStorage::new(&db).unwrap().load_index().unwrap();
    assert_eq!(before, after);
    // Detail mocks expect exactly one hit each; verified when the server drops
}

#[tokio::test]
async fn test_forced_refresh_keeps_dataset_unchanged() {
    let server = MockServer::start().await;
    mount_list_page(&server, 1, &["31", "32"], None).await;
    for id in ["31", "32"] {
        mount_card(&server, &SiteCard::new(id, "Trunks", "sr"), 2).await;
    }

    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("cards.db");
    let mut config = test_config(&server.uri(), &db, 50);

    crawl(&config, "hash", StopSignal::new()).await.unwrap();
    let fingerprints: Vec<_> = {
        let index = SqliteStorage::new(&db).unwrap().load_index().unwrap();
        let mut f: Vec<_> = index.into_iter().map(|(id, e)| (id, e.fingerprint)).collect();
        f.sort();
        f
    };

    config.crawler.forced_refresh = true;
    let report = crawl(&config, "hash", StopSignal::new()).await.unwrap();

    assert_eq!(report.unchanged, 2);
    assert_eq!(report.new_items(), 0);
    let index = SqliteStorage::new(&db).unwrap().load_index().unwrap();
    let mut after: Vec<_> = index.into_iter().map(|(id, e)| (id, e.fingerprint)).collect();
    after.sort();
    assert_eq!(fingerprints, after);
}

#[tokio::test]
async fn test_export_marks_missing_sections_null() {
    let server = MockServer::start().await;
    mount_list_page(&server, 1, &["41", "42"], None).await;
    mount_card(&server, &SiteCard::new("41", "Broly", "ssr"), 1).await;
    mount_card(&server, &SiteCard::new("42", "Broly [Legendary]", "lr").with_ultra(), 1).await;

    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("cards.db");
    let config = test_config(&server.uri(), &db, 50);
    crawl(&config, "hash", StopSignal::new()).await.unwrap();

    let export_path = dir.path().join("cards.json");
    let storage = SqliteStorage::new(&db).unwrap();
    assert_eq!(export_dataset(&storage, &export_path).unwrap(), 2);

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&export_path).unwrap()).unwrap();
    let cards = json["cards"].as_array().unwrap();
    let plain = cards.iter().find(|c| c["id"] == "41").unwrap();
    let ultra = cards.iter().find(|c| c["id"] == "42").unwrap();

    assert!(plain["ultraSuperAttack"].is_null());
    assert_eq!(ultra["ultraSuperAttack"]["name"], "Ultimate Kamehameha");
    assert_eq!(json["versionGroups"][0]["cardIds"], serde_json::json!(["42", "41"]));
}

#[tokio::test]
async fn test_broken_detail_page_is_skipped() {
    let server = MockServer::start().await;
    mount_list_page(&server, 1, &["51", "52", "53"], None).await;
    mount_card(&server, &SiteCard::new("51", "Frieza", "ur"), 1).await;
    mount_card(&server, &SiteCard::new("53", "Cell", "ur"), 1).await;
    Mock::given(method("GET"))
        .and(path("/cards/52"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body><h1>Cooler</h1></body></html>"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("cards.db");
    let config = test_config(&server.uri(), &db, 50);

    let report = crawl(&config, "hash", StopSignal::new()).await.unwrap();

    assert_eq!(report.state, SessionState::Done);
    assert_eq!(report.inserted, 2);
    assert!(report.failed >= 1);
    let storage = SqliteStorage::new(&db).unwrap();
    assert!(storage.get_card("52").unwrap().is_none());
}

#[tokio::test]
async fn test_rendered_strategy_goes_through_render_service() {
    let server = MockServer::start().await;
    let base = server.uri();
    let card = SiteCard::new("61", "Beerus", "lr");

    Mock::given(method("POST"))
        .and(path("/render"))
        .and(body_json(serde_json::json!({
            "url": format!("{}/cards?sort=open_at&page=1", base)
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string(common::list_html(&["61"], None)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/render"))
        .and(body_json(serde_json::json!({ "url": format!("{}/cards/61", base) })))
        .respond_with(ResponseTemplate::new(200).set_body_string(card.html()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/render"))
        .respond_with(ResponseTemplate::new(200).insert_header("x-response-code", "404"))
        .with_priority(10)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("cards.db");
    let mut config = test_config(&base, &db, 50);
    config.source.strategy = FetchStrategy::Rendered;
    config.source.render_endpoint = Some(format!("{}/render", base));

    let report = crawl(&config, "hash", StopSignal::new()).await.unwrap();

    assert_eq!(report.state, SessionState::Done);
    assert_eq!(report.inserted, 1);
    let record = SqliteStorage::new(&db).unwrap().get_card("61").unwrap().unwrap();
    assert_eq!(record.rarity, Rarity::LR);
}

#[tokio::test]
async fn test_locked_dataset_is_refused() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("cards.db");
    let config = test_config(&server.uri(), &db, 50);

    let _held = SessionLock::acquire(&db).unwrap();
    let err = crawl(&config, "hash", StopSignal::new()).await.unwrap_err();

    assert!(matches!(err, DokkanError::Locked(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_stop_before_start_keeps_seed() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("cards.db");
    let config = test_config(&server.uri(), &db, 50);

    let stop = StopSignal::new();
    stop.trigger();
    let report = crawl(&config, "hash", stop).await.unwrap();

    assert_eq!(report.state, SessionState::Stopped);
    assert_eq!(report.pending, 1);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_lock_left_by_dead_process_does_not_block_crawl() {
    let server = MockServer::start().await;
    mount_list_page(&server, 1, &["71"], None).await;
    mount_card(&server, &SiteCard::new("71", "Gotenks", "ur"), 1).await;

    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("cards.db");
    std::fs::write(SessionLock::lock_path(&db), "4000000000\n").unwrap();
    let config = test_config(&server.uri(), &db, 50);

    let report = crawl(&config, "hash", StopSignal::new()).await.unwrap();

    assert_eq!(report.state, SessionState::Done);
    assert_eq!(report.inserted, 1);
    assert!(!SessionLock::lock_path(&db).exists());
}
