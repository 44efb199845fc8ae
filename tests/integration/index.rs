//! Workspace index integration tests.
//!
//! These tests register specs and their documents in `.spw-index.db` and
//! verify full-text search across them.

use spw::config::StoreConfig;
use spw::layout;
use spw::stage::SpecStage;
use spw::store::IndexStore;

use crate::fixtures::{SpecFixture, TWO_WAVE_TASKS};

/// Test: Register a spec by its stage
/// Given a spec with tasks.md and a waves directory
/// When it is registered in the index
/// Then it is recorded at the execution stage
#[test]
fn test_register_spec_at_stage() {
    let fixture = SpecFixture::new();
    fixture.write_tasks(TWO_WAVE_TASKS);
    fixture.exec_run(1, 1);

    let index = IndexStore::open(&fixture.workspace).unwrap();
    assert_eq!(index.register_spec(&fixture.spec_dir).unwrap(), SpecStage::Execution);

    let specs = index.list_specs().unwrap();
    assert_eq!(specs.len(), 1);
    assert_eq!(specs[0].name, "demo");
    assert_eq!(specs[0].stage, "execution");
}

/// Test: Search across specs with an optional filter
/// Given documents from two specs mentioning the same term
/// When searching with and without a spec filter
/// Then results honour the filter and the limit
#[test]
fn test_search_across_specs() {
    let fixture = SpecFixture::new();
    let index = IndexStore::open(&fixture.workspace).unwrap();
    index
        .index_document("demo", "design", "design", "Storage", "SQLite store", "The store uses SQLite in WAL mode")
        .unwrap();
    index
        .index_document("demo", "tasks", "planning", "Tasks", "", "Wire the SQLite harvest")
        .unwrap();
    index
        .index_document("billing", "design", "design", "Ledger", "", "Ledger rows live in SQLite")
        .unwrap();

    assert_eq!(index.search("sqlite", None, 0).unwrap().len(), 3);
    assert_eq!(index.search("sqlite", None, 2).unwrap().len(), 2);

    let billing = index.search("sqlite", Some("billing"), 10).unwrap();
    assert_eq!(billing.len(), 1);
    assert_eq!(billing[0].title, "Ledger");
    assert_eq!(billing[0].phase, "design");

    let storage = index.search("WAL mode", Some("demo"), 10).unwrap();
    assert_eq!(storage.len(), 1);
    assert_eq!(storage[0].snippet, "SQLite store");
}

/// Test: Re-indexing replaces documents
/// Given an indexed design document
/// When it is deleted and indexed again with new content
/// Then search only finds the new content
#[test]
fn test_reindex_document() {
    let fixture = SpecFixture::new();
    let index = IndexStore::open(&fixture.workspace).unwrap();
    index
        .index_document("demo", "design", "design", "Design", "", "sessions use cookies")
        .unwrap();

    index.delete_documents("demo", "design").unwrap();
    index
        .index_document("demo", "design", "design", "Design", "", "sessions use bearer tokens")
        .unwrap();

    assert!(index.search("cookies", None, 5).unwrap().is_empty());
    assert_eq!(index.search("bearer tokens", None, 5).unwrap().len(), 1);
}

/// Test: Configured index file name
/// Given a store config with a custom index file
/// When the index is opened and reopened
/// Then the same file holds the registered specs
#[test]
fn test_custom_index_file() {
    let fixture = SpecFixture::new();
    let config = StoreConfig {
        index_file: "search.db".to_string(),
        ..StoreConfig::default()
    };
    {
        let index = IndexStore::open_with(&fixture.workspace, &config).unwrap();
        index
            .index_spec("demo", "planning", &layout::spec_db_path(&fixture.spec_dir).to_string_lossy())
            .unwrap();
        index.close().unwrap();
    }

    assert!(fixture.workspace.join("search.db").exists());
    let index = IndexStore::open_path(&fixture.workspace.join("search.db")).unwrap();
    assert_eq!(index.get_spec("demo").unwrap().unwrap().stage, "planning");
}
