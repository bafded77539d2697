//! Loading decks and ability files from disk.

use std::fs;
use std::path::PathBuf;

use bunker_catalog::{AbilityCatalog, AssetCatalog, CatalogError, SpecialAssetIndex};

/// Creates an empty per-test directory under the system temp dir.
fn fixture_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("bunker-catalog-{name}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn touch(path: PathBuf) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, b"img").unwrap();
}

#[test]
fn test_load_scans_decks_one_level_deep() {
    let root = fixture_dir("scan");
    let decks = root.join("decks");
    touch(decks.join("Хобби").join("Рыбалка.png"));
    touch(decks.join("Хобби").join("Шахматы.JPEG"));
    touch(decks.join("Хобби").join("notes.txt"));
    touch(decks.join("Хобби").join("nested").join("deep.png"));
    touch(decks.join("temp").join("draft.png"));
    touch(decks.join("Багаж").join("Рюкзак.webp"));

    let catalog = AssetCatalog::load(&root).unwrap();

    let names: Vec<_> = catalog.deck_names().collect();
    assert_eq!(names, vec!["Багаж", "Хобби"]);

    let hobby = catalog.deck("Хобби");
    assert_eq!(hobby.len(), 2);
    assert_eq!(hobby[0].id, "decks/Хобби/Рыбалка.png");
    assert_eq!(hobby[0].label, "Рыбалка");
    assert_eq!(hobby[1].label, "Шахматы");

    fs::remove_dir_all(root).ok();
}

#[test]
fn test_load_missing_root_is_error() {
    let root = fixture_dir("missing");
    let err = AssetCatalog::load(&root).unwrap_err();
    assert!(matches!(err, CatalogError::Io { .. }));
    fs::remove_dir_all(root).ok();
}

#[test]
fn test_load_decks_file_is_not_a_directory() {
    let root = fixture_dir("notdir");
    fs::write(root.join("decks"), b"oops").unwrap();
    let err = AssetCatalog::load(&root).unwrap_err();
    assert!(matches!(err, CatalogError::NotADirectory(_)));
    fs::remove_dir_all(root).ok();
}

#[test]
fn test_ability_file_fallback_on_malformed_json() {
    let root = fixture_dir("abilities-bad");
    let path = root.join("SPECIAL_CONDITIONS.json");
    fs::write(&path, "[{ broken").unwrap();

    let catalog = AbilityCatalog::load_or_builtin(Some(&path));
    assert_eq!(catalog.len(), 27);

    let missing = root.join("absent.json");
    let catalog = AbilityCatalog::load_or_builtin(Some(&missing));
    assert_eq!(catalog.len(), 27);

    fs::remove_dir_all(root).ok();
}

#[test]
fn test_ability_file_loads_declared_entries() {
    let root = fixture_dir("abilities-good");
    let path = root.join("SPECIAL_CONDITIONS.json");
    fs::write(
        &path,
        r#"[
            {"id": "loud", "title": "Громкий Голос", "file": "Особые условия/loud.png",
             "trigger": "onVote", "implemented": true, "requires": ["phase=voting"],
             "effect": {"type": "voteWeight", "params": {"weight": 3}}}
        ]"#,
    )
    .unwrap();

    let catalog = AbilityCatalog::load_or_builtin(Some(&path));
    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog.definitions()[0].id, "loud");
    assert_eq!(
        catalog.definitions()[0].effect.params_json(),
        serde_json::json!({"weight": 3})
    );

    fs::remove_dir_all(root).ok();
}

#[test]
fn test_special_assets_resolve_from_scanned_deck() {
    let root = fixture_dir("special-assets");
    touch(root.join("decks").join("Особые условия").join("Будь другом.png"));
    let catalog = AssetCatalog::load(&root).unwrap();

    let index = SpecialAssetIndex::build(&catalog.pools());
    let builtin = AbilityCatalog::builtin();
    let friend = builtin.find("ban_vote_against").unwrap();
    let candidates = friend.asset_candidates();
    assert_eq!(
        index.lookup(candidates.iter().map(String::as_str)),
        Some("decks/Особые условия/Будь другом.png")
    );

    fs::remove_dir_all(root).ok();
}
