//! Credential repository against a mock backend: fetching, ordering,
//! optimistic updates with rollback, server-confirmed mutations and the
//! session epoch guard.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use passvault_core::{
    ApiClient, CredentialRepository, CredentialUpdate, EntryKey, FetchOutcome, MemoryStorage,
    NewCredential, RepositoryError, SessionStore,
};

use crate::common::{self, collections, link_json, record_json};

#[tokio::test]
async fn test_fetch_all_populates_both_collections() {
    let server = MockServer::start().await;
    let (_session, repo) = common::logged_in(&server).await;
    common::mount_passwords(
        &server,
        collections(
            vec![record_json("r1", "GitHub", false, None), record_json("r2", "Bank", true, None)],
            vec![link_json("l1", "r9", "Team Wiki", false, None)],
        ),
    )
    .await;

    let outcome = repo.fetch_all().await;

    assert_eq!(outcome, FetchOutcome::Synced { owned: 2, shared: 1 });
    assert_eq!(repo.owned_len(), 2);
    assert_eq!(repo.shared_len(), 1);
    let wiki = repo.entry(&EntryKey::shared("l1")).expect("shared entry");
    assert_eq!(wiki.record_id(), "r9");
}

#[tokio::test]
async fn test_fetch_failure_empties_both_collections() {
    let server = MockServer::start().await;
    let (_session, repo) = common::loaded(
        &server,
        collections(
            vec![record_json("r1", "GitHub", false, None)],
            vec![link_json("l1", "r9", "Team Wiki", false, None)],
        ),
    )
    .await;
    assert!(!repo.is_empty());

    Mock::given(method("GET"))
        .and(path("/api/passwords"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database unavailable"))
        .mount(&server)
        .await;

    assert_eq!(repo.fetch_all().await, FetchOutcome::Failed);
    assert_eq!(repo.owned_len(), 0);
    assert_eq!(repo.shared_len(), 0);
    assert!(repo.unified_view().is_empty());
}

#[tokio::test]
async fn test_fetch_without_session_is_skipped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/passwords"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let session = SessionStore::new(ApiClient::new(server.uri()).unwrap(), MemoryStorage::new());
    let repo = CredentialRepository::new(session.subscribe());

    assert_eq!(repo.fetch_all().await, FetchOutcome::Skipped);
    assert!(matches!(
        repo.add(NewCredential::new("GitHub", "ana", "long-enough")).await,
        Err(RepositoryError::NotAuthenticated)
    ));
}

#[tokio::test]
async fn test_unified_view_orders_by_last_used() {
    let server = MockServer::start().await;
    let (_session, repo) = common::loaded(
        &server,
        collections(
            vec![
                record_json("old", "Old", false, Some("2025-03-01T08:00:00Z")),
                record_json("never", "Never", false, None),
                record_json("new", "New", false, Some("2025-03-03T08:00:00Z")),
            ],
            vec![link_json("mid", "r9", "Mid", false, Some("2025-03-02T08:00:00Z"))],
        ),
    )
    .await;

    let ids: Vec<String> = repo
        .unified_view()
        .iter()
        .map(|e| e.effective_id().to_string())
        .collect();
    assert_eq!(ids, vec!["new", "mid", "old", "never"]);
}

#[tokio::test]
async fn test_toggle_favorite_confirmed_by_server() {
    let server = MockServer::start().await;
    let (_session, repo) = common::loaded(&server, collections(vec![record_json("r1", "GitHub", false, None)], vec![])).await;

    Mock::given(method("PATCH"))
        .and(path("/api/passwords/r1/favorite"))
        .and(body_json(json!({ "shared": false })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    common::mount_passwords(&server, collections(vec![record_json("r1", "GitHub", true, None)], vec![])).await;

    let entry = repo.entry(&EntryKey::owned("r1")).unwrap();
    repo.toggle_favorite(&entry).await.expect("toggle failed");

    assert!(repo.entry(&EntryKey::owned("r1")).unwrap().favorite());
}

#[tokio::test]
async fn test_toggle_favorite_visible_before_confirmation() {
    let server = MockServer::start().await;
    let (_session, repo) = common::loaded(&server, collections(vec![record_json("r1", "GitHub", false, None)], vec![])).await;

    Mock::given(method("PATCH"))
        .and(path("/api/passwords/r1/favorite"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;
    common::mount_passwords(&server, collections(vec![record_json("r1", "GitHub", true, None)], vec![])).await;

    let entry = repo.entry(&EntryKey::owned("r1")).unwrap();
    let task = {
        let repo = repo.clone();
        tokio::spawn(async move { repo.toggle_favorite(&entry).await })
    };

    let flipped = common::eventually(|| repo.entry(&EntryKey::owned("r1")).is_some_and(|e| e.favorite())).await;
    assert!(flipped, "optimistic change not visible while the request is in flight");

    task.await.unwrap().expect("toggle failed");
    assert!(repo.entry(&EntryKey::owned("r1")).unwrap().favorite());
}

#[tokio::test]
async fn test_failed_toggle_rolls_back() {
    let server = MockServer::start().await;
    let (_session, repo) = common::loaded(&server, collections(vec![record_json("r1", "GitHub", false, None)], vec![])).await;

    Mock::given(method("PATCH"))
        .and(path("/api/passwords/r1/favorite"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "error": "write failed" })))
        .mount(&server)
        .await;
    common::mount_passwords(&server, collections(vec![record_json("r1", "GitHub", false, None)], vec![])).await;

    let entry = repo.entry(&EntryKey::owned("r1")).unwrap();
    let err = repo.toggle_favorite(&entry).await.unwrap_err();

    assert_eq!(err.user_message(), "write failed");
    assert!(!repo.entry(&EntryKey::owned("r1")).unwrap().favorite());
}

#[tokio::test]
async fn test_failed_toggle_rolls_back_even_if_refetch_fails() {
    let server = MockServer::start().await;
    let (_session, repo) = common::loaded(
        &server,
        collections(vec![record_json("r1", "GitHub", false, None), record_json("r2", "Bank", false, None)], vec![]),
    )
    .await;

    Mock::given(method("PATCH"))
        .and(path("/api/passwords/r1/favorite"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/passwords"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let entry = repo.entry(&EntryKey::owned("r1")).unwrap();
    assert!(repo.toggle_favorite(&entry).await.is_err());
    // Fail-closed: the unconfirmed flip is never what remains
    assert!(repo.entry(&EntryKey::owned("r1")).is_none());
}

#[tokio::test]
async fn test_toggle_unknown_entry_contacts_nobody() {
    let server = MockServer::start().await;
    let (_session, repo) = common::loaded(&server, collections(vec![record_json("r1", "GitHub", false, None)], vec![])).await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let stranger = {
        let other = common::loaded(
            &MockServer::start().await,
            collections(vec![record_json("gone", "Gone", false, None)], vec![]),
        )
        .await;
        other.1.entry(&EntryKey::owned("gone")).unwrap()
    };

    assert!(matches!(
        repo.toggle_favorite(&stranger).await,
        Err(RepositoryError::NotFound(ref id)) if id == "gone"
    ));
}

#[tokio::test]
async fn test_mark_used_on_shared_entry_targets_link() {
    let server = MockServer::start().await;
    let (_session, repo) = common::loaded(
        &server,
        collections(
            vec![record_json("dup", "Mine", false, None)],
            vec![link_json("dup", "r9", "Theirs", false, None)],
        ),
    )
    .await;

    Mock::given(method("PATCH"))
        .and(path("/api/passwords/dup/use"))
        .and(body_json(json!({ "shared": true })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    common::mount_passwords(
        &server,
        collections(
            vec![record_json("dup", "Mine", false, None)],
            vec![link_json("dup", "r9", "Theirs", false, Some("2025-05-05T10:00:00Z"))],
        ),
    )
    .await;

    let shared = repo.entry(&EntryKey::shared("dup")).unwrap();
    repo.mark_used(&shared).await.expect("mark_used failed");

    assert!(repo.entry(&EntryKey::shared("dup")).unwrap().last_used_at().is_some());
    assert!(repo.entry(&EntryKey::owned("dup")).unwrap().last_used_at().is_none());
}

#[tokio::test]
async fn test_shared_favorite_leaves_owned_twin_alone() {
    let server = MockServer::start().await;
    let (_session, repo) = common::loaded(
        &server,
        collections(
            vec![record_json("dup", "Mine", false, None)],
            vec![link_json("dup", "r9", "Theirs", false, None)],
        ),
    )
    .await;

    Mock::given(method("PATCH"))
        .and(path("/api/passwords/dup/favorite"))
        .and(body_json(json!({ "shared": true })))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .expect(1)
        .mount(&server)
        .await;
    common::mount_passwords(
        &server,
        collections(
            vec![record_json("dup", "Mine", false, None)],
            vec![link_json("dup", "r9", "Theirs", true, None)],
        ),
    )
    .await;

    let shared = repo.entry(&EntryKey::shared("dup")).unwrap();
    let task = {
        let repo = repo.clone();
        tokio::spawn(async move { repo.toggle_favorite(&shared).await })
    };

    assert!(common::eventually(|| repo.entry(&EntryKey::shared("dup")).is_some_and(|e| e.favorite())).await);
    assert!(!repo.entry(&EntryKey::owned("dup")).unwrap().favorite());

    task.await.unwrap().unwrap();
    assert!(repo.entry(&EntryKey::shared("dup")).unwrap().favorite());
    assert!(!repo.entry(&EntryKey::owned("dup")).unwrap().favorite());
}

#[tokio::test]
async fn test_add_refetches_on_success() {
    let server = MockServer::start().await;
    let (_session, repo) = common::loaded(&server, collections(vec![], vec![])).await;

    Mock::given(method("POST"))
        .and(path("/api/passwords"))
        .respond_with(ResponseTemplate::new(201).set_body_json(record_json("r-new", "GitHub", false, None)))
        .expect(1)
        .mount(&server)
        .await;
    common::mount_passwords(&server, collections(vec![record_json("r-new", "GitHub", false, None)], vec![])).await;

    let created = repo
        .add(NewCredential::new("GitHub", "ana", "long-enough-secret"))
        .await
        .expect("add failed");

    assert_eq!(created.id, "r-new");
    assert_eq!(repo.owned_len(), 1);
}

#[tokio::test]
async fn test_add_failure_and_invalid_input_leave_state_untouched() {
    let server = MockServer::start().await;
    let (_session, repo) = common::loaded(&server, collections(vec![record_json("r1", "GitHub", false, None)], vec![])).await;

    Mock::given(method("POST"))
        .and(path("/api/passwords"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "Title taken" })))
        .expect(1)
        .mount(&server)
        .await;
    // No re-fetch may happen after a failed add
    Mock::given(method("GET"))
        .and(path("/api/passwords"))
        .respond_with(ResponseTemplate::new(200).set_body_json(collections(vec![], vec![])))
        .expect(0)
        .mount(&server)
        .await;

    let invalid = repo.add(NewCredential::new("", "ana", "long-enough-secret")).await;
    assert!(matches!(invalid, Err(RepositoryError::Invalid(_))));

    let rejected = repo.add(NewCredential::new("GitHub", "ana", "long-enough-secret")).await;
    assert_eq!(rejected.unwrap_err().user_message(), "Title taken");
    assert_eq!(repo.owned_len(), 1);
}

#[tokio::test]
async fn test_edit_refetches_even_on_failure() {
    let server = MockServer::start().await;
    let (_session, repo) = common::loaded(
        &server,
        collections(
            vec![record_json("r1", "GitHub", false, None)],
            vec![link_json("l1", "r9", "Team Wiki", false, None)],
        ),
    )
    .await;

    Mock::given(method("PUT"))
        .and(path("/api/passwords/r1"))
        .and(body_json(json!({ "title": "GitHub (work)" })))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/passwords"))
        .respond_with(ResponseTemplate::new(200).set_body_json(collections(
            vec![record_json("r1", "GitHub (server)", false, None)],
            vec![],
        )))
        .expect(1)
        .mount(&server)
        .await;

    let updates = CredentialUpdate {
        title: Some("GitHub (work)".to_string()),
        ..Default::default()
    };
    assert!(repo.edit("r1", updates).await.is_err());
    assert_eq!(repo.entry(&EntryKey::owned("r1")).unwrap().title(), "GitHub (server)");
}

#[tokio::test]
async fn test_edit_and_delete_reject_shared_ids() {
    let server = MockServer::start().await;
    let (_session, repo) = common::loaded(
        &server,
        collections(vec![], vec![link_json("l1", "r9", "Team Wiki", false, None)]),
    )
    .await;

    let updates = CredentialUpdate {
        title: Some("Mine now".to_string()),
        ..Default::default()
    };
    assert!(matches!(repo.edit("l1", updates).await, Err(RepositoryError::NotOwned(_))));
    assert!(matches!(repo.delete("l1").await, Err(RepositoryError::NotOwned(_))));
    assert!(matches!(repo.delete("missing").await, Err(RepositoryError::NotFound(_))));
}

#[tokio::test]
async fn test_delete_refetches() {
    let server = MockServer::start().await;
    let (_session, repo) = common::loaded(
        &server,
        collections(vec![record_json("r1", "GitHub", false, None), record_json("r2", "Bank", false, None)], vec![]),
    )
    .await;

    Mock::given(method("DELETE"))
        .and(path("/api/passwords/r1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    common::mount_passwords(&server, collections(vec![record_json("r2", "Bank", false, None)], vec![])).await;

    repo.delete("r1").await.expect("delete failed");
    assert!(repo.entry(&EntryKey::owned("r1")).is_none());
    assert_eq!(repo.owned_len(), 1);
}

#[tokio::test]
async fn test_unshare_removes_link() {
    let server = MockServer::start().await;
    let (_session, repo) = common::loaded(
        &server,
        collections(
            vec![record_json("r1", "GitHub", false, None)],
            vec![link_json("l1", "r9", "Team Wiki", false, None)],
        ),
    )
    .await;

    Mock::given(method("DELETE"))
        .and(path("/api/passwords/shared/l1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    common::mount_passwords(&server, collections(vec![record_json("r1", "GitHub", false, None)], vec![])).await;

    let owned = repo.entry(&EntryKey::owned("r1")).unwrap();
    assert!(matches!(repo.unshare(&owned).await, Err(RepositoryError::NotShared(_))));

    let link = repo.entry(&EntryKey::shared("l1")).unwrap();
    repo.unshare(&link).await.expect("unshare failed");
    assert_eq!(repo.shared_len(), 0);
    assert_eq!(repo.owned_len(), 1);
}

#[tokio::test]
async fn test_fetch_completing_after_logout_is_discarded() {
    let server = MockServer::start().await;
    let (mut session, repo) = common::logged_in(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/passwords"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(collections(vec![record_json("r1", "GitHub", false, None)], vec![]))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let fetch = {
        let repo = repo.clone();
        tokio::spawn(async move { repo.fetch_all().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    session.logout();

    assert_eq!(fetch.await.unwrap(), FetchOutcome::Stale);
    assert!(repo.unified_view().is_empty());
}

#[tokio::test]
async fn test_follow_session_fetches_and_clears() {
    let server = MockServer::start().await;
    common::mount_login(&server).await;
    common::mount_passwords(&server, collections(vec![record_json("r1", "GitHub", false, None)], vec![])).await;

    let mut session = SessionStore::new(ApiClient::new(server.uri()).unwrap(), MemoryStorage::new());
    let repo = CredentialRepository::new(session.subscribe());
    let follower = tokio::spawn(repo.clone().follow_session());

    session.login(common::EMAIL, common::PASSWORD).await.unwrap();
    assert!(common::eventually(|| repo.owned_len() == 1).await);

    session.logout();
    assert!(common::eventually(|| repo.is_empty()).await);

    drop(session);
    tokio::time::timeout(Duration::from_secs(2), follower)
        .await
        .expect("follower did not stop")
        .unwrap();
}

#[tokio::test]
async fn test_failed_mark_used_rolls_back() {
    let server = MockServer::start().await;
    let (_session, repo) = common::loaded(
        &server,
        collections(vec![record_json("r1", "GitHub", false, Some("2025-03-01T08:00:00Z"))], vec![]),
    )
    .await;
    let before = repo.entry(&EntryKey::owned("r1")).unwrap().last_used_at();

    Mock::given(method("PATCH"))
        .and(path("/api/passwords/r1/use"))
        .and(body_json(json!({ "shared": false })))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "error": "write failed" })))
        .expect(1)
        .mount(&server)
        .await;
    // The re-fetch after the rollback still happens
    Mock::given(method("GET"))
        .and(path("/api/passwords"))
        .respond_with(ResponseTemplate::new(200).set_body_json(collections(
            vec![record_json("r1", "GitHub", false, Some("2025-03-01T08:00:00Z"))],
            vec![],
        )))
        .expect(1)
        .mount(&server)
        .await;

    let entry = repo.entry(&EntryKey::owned("r1")).unwrap();
    let err = repo.mark_used(&entry).await.unwrap_err();

    assert_eq!(err.user_message(), "write failed");
    assert_eq!(repo.entry(&EntryKey::owned("r1")).unwrap().last_used_at(), before);
}

#[tokio::test]
async fn test_mutation_completing_after_logout_is_discarded() {
    let server = MockServer::start().await;
    let (mut session, repo) = common::loaded(&server, collections(vec![record_json("r1", "GitHub", false, None)], vec![])).await;

    Mock::given(method("PATCH"))
        .and(path("/api/passwords/r1/use"))
        .respond_with(ResponseTemplate::new(500).set_delay(Duration::from_millis(300)))
        .mount(&server)
        .await;
    common::mount_passwords(&server, collections(vec![record_json("r1", "GitHub", false, None)], vec![])).await;

    let entry = repo.entry(&EntryKey::owned("r1")).unwrap();
    let task = {
        let repo = repo.clone();
        tokio::spawn(async move { repo.mark_used(&entry).await })
    };
    assert!(common::eventually(|| repo.entry(&EntryKey::owned("r1")).is_some_and(|e| e.last_used_at().is_some())).await);
    session.logout();

    assert!(task.await.unwrap().is_err());
    // Neither the rollback nor the re-fetch may repopulate the old session
    assert!(repo.unified_view().is_empty());
    assert_eq!(repo.owned_len(), 0);
}

#[tokio::test]
async fn test_unknown_category_does_not_empty_view() {
    let server = MockServer::start().await;
    let (_session, repo) = common::logged_in(&server).await;
    let mut odd = record_json("r2", "Payroll", false, None);
    odd["category"] = json!("Work");
    common::mount_passwords(&server, collections(vec![record_json("r1", "GitHub", false, None), odd], vec![])).await;

    assert_eq!(repo.fetch_all().await, FetchOutcome::Synced { owned: 2, shared: 0 });
    assert_eq!(
        repo.entry(&EntryKey::owned("r2")).unwrap().category(),
        passvault_core::Category::Other
    );
}
