//! Index maintenance and query tests

mod common;

use alexandria::models::ScrollId;
use alexandria::search::{IndexManager, SearchService};
use common::{hours_ago, hours_ahead, set_mtime, TestLibrary};
use std::sync::Arc;

fn search_service(library: &TestLibrary) -> (Arc<IndexManager>, SearchService) {
    let manager = Arc::new(IndexManager::from_config(&library.config));
    (manager.clone(), SearchService::new(manager))
}

async fn matching(service: &SearchService, query: &str) -> Vec<String> {
    let mut ids: Vec<String> = service
        .search(query)
        .await
        .unwrap()
        .hits
        .into_iter()
        .map(|hit| hit.id.to_string())
        .collect();
    ids.sort();
    ids
}

#[tokio::test]
async fn test_new_index_includes_everything() {
    let library = TestLibrary::new();
    library.write_scroll("a", "first scroll");
    library.write_scroll("b", "second scroll");
    set_mtime(&library.scroll_path("a"), hours_ago(48));
    set_mtime(&library.scroll_path("b"), hours_ago(48));

    let (manager, service) = search_service(&library);
    // A marker without an index must not hide old scrolls
    manager.marker().touch().unwrap();

    let report = manager
        .update_index(&alexandria::library::ScrollStore::from_config(&library.config))
        .await
        .unwrap();
    assert!(report.created);
    assert_eq!(report.indexed, 2);
    assert_eq!(matching(&service, "scroll").await, vec!["a", "b"]);
}

#[tokio::test]
async fn test_only_modified_scrolls_are_reindexed() {
    let library = TestLibrary::new();
    let store = alexandria::library::ScrollStore::from_config(&library.config);
    library.write_scroll("a", "apple");
    library.write_scroll("b", "banana");

    let (manager, service) = search_service(&library);
    manager.update_index(&store).await.unwrap();
    let marker = manager.marker().last_update();

    // Both change on disk, but only b is newer than the marker
    library.write_scroll("a", "apple yak");
    library.write_scroll("b", "banana zebra");
    set_mtime(&library.scroll_path("a"), hours_ago(1));
    set_mtime(&library.scroll_path("b"), hours_ahead(1));

    let report = manager.update_index(&store).await.unwrap();
    assert!(!report.created);
    assert_eq!(report.considered, 1);
    assert_eq!(report.indexed, 1);
    assert_eq!(report.unchanged, 1);
    assert!(manager.marker().last_update() >= marker);

    assert_eq!(matching(&service, "zebra").await, vec!["b"]);
    assert!(matching(&service, "yak").await.is_empty());
    assert_eq!(matching(&service, "apple").await, vec!["a"]);
    assert_eq!(manager.doc_count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_prefix_query_semantics() {
    let library = TestLibrary::new();
    let store = alexandria::library::ScrollStore::from_config(&library.config);
    library.write_scroll("ab", "alpha beta");
    library.write_scroll("ag", "alpha gamma");
    library.write_scroll("a", "alpha");
    library.write_scroll("g", "gamma");

    let (manager, service) = search_service(&library);
    manager.update_index(&store).await.unwrap();

    assert_eq!(matching(&service, "alpha -beta ~gamma").await, vec!["a", "ag"]);
    assert_eq!(matching(&service, "alpha gamma").await, vec!["ag"]);
    assert_eq!(matching(&service, "~beta ~gamma").await, vec!["ab", "ag", "g"]);

    // The best match comes first
    let response = service.search("alpha ~gamma").await.unwrap();
    assert_eq!(response.hits[0].id, ScrollId::from("ag"));
}

#[tokio::test]
async fn test_metadata_fields_are_searchable() {
    let library = TestLibrary::new();
    let store = alexandria::library::ScrollStore::from_config(&library.config);
    library.write_scroll(
        "open-set",
        "%@type definition\n%@tags topology\n%@source Munkres\n%@hidden neighbourhood\nA set is open if...",
    );

    let (manager, service) = search_service(&library);
    manager.update_index(&store).await.unwrap();

    for query in ["definition", "topology", "munkres", "neighbourhood", "open-set"] {
        assert_eq!(matching(&service, query).await, vec!["open-set"], "query {query}");
    }
}

#[tokio::test]
async fn test_malformed_and_empty_queries() {
    let library = TestLibrary::new();
    let store = alexandria::library::ScrollStore::from_config(&library.config);
    library.write_scroll("a", "alpha");

    let (manager, service) = search_service(&library);
    manager.update_index(&store).await.unwrap();

    assert!(matching(&service, "(alpha").await.is_empty());
    assert!(matching(&service, "").await.is_empty());
    assert!(matching(&service, "+ - ~").await.is_empty());
}

#[tokio::test]
async fn test_exclusion_only_queries() {
    let library = TestLibrary::new();
    let store = alexandria::library::ScrollStore::from_config(&library.config);
    library.write_scroll("a", "alpha");
    library.write_scroll("b", "beta");
    library.write_scroll("g", "gamma");

    let (manager, service) = search_service(&library);
    manager.update_index(&store).await.unwrap();

    assert_eq!(matching(&service, "-alpha").await, vec!["b", "g"]);
    assert_eq!(matching(&service, "-alpha -beta").await, vec!["g"]);
}

#[tokio::test]
async fn test_colons_are_searched_literally() {
    let library = TestLibrary::new();
    let store = alexandria::library::ScrollStore::from_config(&library.config);
    library.write_scroll("meeting", "Seminar at 10:30 in room 4");
    library.write_scroll("link", "%@type reference\nSee https://example.org for details");
    library.write_scroll("other", "Seminar at 11:00");

    let (manager, service) = search_service(&library);
    manager.update_index(&store).await.unwrap();

    assert_eq!(matching(&service, "10:30").await, vec!["meeting"]);
    assert_eq!(matching(&service, "https://example.org").await, vec!["link"]);
    assert!(matching(&service, "foo:bar").await.is_empty());
    assert_eq!(matching(&service, "seminar -10:30").await, vec!["other"]);

    // Schema fields can still be addressed
    assert_eq!(matching(&service, "type:reference").await, vec!["link"]);
}

#[tokio::test]
async fn test_remove_from_index() {
    let library = TestLibrary::new();
    let store = alexandria::library::ScrollStore::from_config(&library.config);
    library.write_scroll("a", "alpha");
    library.write_scroll("b", "alpha");

    let (manager, service) = search_service(&library);
    manager.update_index(&store).await.unwrap();

    // Deleting the file alone leaves the entry behind
    library.delete_scroll("a");
    manager.update_index(&store).await.unwrap();
    assert_eq!(matching(&service, "alpha").await, vec!["a", "b"]);

    manager.remove_from_index(&ScrollId::from("a")).await.unwrap();
    assert_eq!(matching(&service, "alpha").await, vec!["b"]);

    // Removing an unknown scroll is harmless
    manager.remove_from_index(&ScrollId::from("zzz")).await.unwrap();
    assert_eq!(manager.doc_count().await.unwrap(), 1);
}
