//! Save/load tests against the file-backed store.
//!
//! Run with: `cargo test -p tabletop-core --test persistence`

use tabletop_core::testing::{assert_active, TestHarness};
use tabletop_core::{
    Cell, DirectoryStore, KeyValueStore, Mode, TableConfig, TerrainKind, Tool,
};
use tempfile::TempDir;

#[tokio::test]
async fn test_save_and_load_full_table() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let store = DirectoryStore::new(temp_dir.path());

    let mut harness = TestHarness::with_initiatives(&[("Aria", 15), ("Goblin", 12)]);
    harness.start();
    harness.advance();

    let table = &mut harness.table;
    table.click(10, 10).unwrap();
    table.set_tool(Tool::Token);
    table.click(120, 60).unwrap();
    table.set_tool(Tool::Fog);
    table.click(300, 300).unwrap();
    table.set_grid_color("#333333");
    table.toggle_mode();

    table.save(&store).await.expect("Save should succeed");

    let mut restored = TestHarness::with_seed(1);
    assert!(restored.table.load(&store).await.expect("Load should succeed"));

    let map = restored.table.map();
    assert_eq!(map.grid.color, "#333333");
    assert_eq!(map.mode, Mode::Play);
    assert_eq!(map.terrain_at(Cell::new(0, 0)), Some(TerrainKind::Wall));
    assert!(map.is_fogged(Cell::new(300, 300)));

    let aria = restored.id_of("Aria").unwrap();
    assert_eq!(map.placement(&aria).unwrap().cell, Cell::new(100, 50));
    assert_active(&restored, "Goblin");
    assert_eq!(restored.advance(), "Aria");
    assert_eq!(restored.round(), 2);
}

#[tokio::test]
async fn test_load_without_save_is_noop() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let store = DirectoryStore::new(temp_dir.path().join("never-created"));

    let mut harness = TestHarness::with_initiatives(&[("Aria", 15)]);
    assert!(!harness.table.load(&store).await.unwrap());
    assert_eq!(harness.names(), vec!["Aria"]);
}

#[tokio::test]
async fn test_custom_storage_key() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let store = DirectoryStore::new(temp_dir.path());
    let config = TableConfig::new().with_storage_key("crypt");

    let mut harness = TestHarness::with_config(config.clone(), 3);
    harness.add("Lich", 18);
    harness.table.save(&store).await.unwrap();

    assert!(store.get("crypt").await.unwrap().is_some());
    assert!(store.get("ttrpgMapData").await.unwrap().is_none());

    let mut other = TestHarness::new();
    assert!(!other.table.load(&store).await.unwrap());

    let mut same_key = TestHarness::with_config(config, 4);
    assert!(same_key.table.load(&store).await.unwrap());
    assert_eq!(same_key.names(), vec!["Lich"]);
}

#[tokio::test]
async fn test_corrupt_save_reports_error_and_keeps_table() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let store = DirectoryStore::new(temp_dir.path());
    store
        .set("ttrpgMapData", "[1, 2, 3]".to_string())
        .await
        .unwrap();

    let mut harness = TestHarness::with_initiatives(&[("Aria", 15)]);
    assert!(harness.table.load(&store).await.is_err());
    assert_eq!(harness.names(), vec!["Aria"]);
}
