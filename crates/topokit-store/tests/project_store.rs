use chrono::{TimeZone, Utc};
use tempfile::tempdir;
use topokit_core::NewProject;
use topokit_store::ProjectStore;

#[test]
fn test_list_is_newest_first() {
    let store = ProjectStore::open_in_memory().unwrap();
    let day = |d| Utc.with_ymd_and_hms(2024, 5, d, 9, 30, 0).unwrap();

    store.insert(&NewProject::new("middle").created_at(day(2))).unwrap();
    store.insert(&NewProject::new("oldest").created_at(day(1))).unwrap();
    store.insert(&NewProject::new("newest").created_at(day(3))).unwrap();

    let names: Vec<String> = store.list().unwrap().into_iter().map(|p| p.name).collect();
    assert_eq!(names, vec!["newest", "middle", "oldest"]);
}

#[test]
fn test_same_second_ties_break_by_id() {
    let store = ProjectStore::open_in_memory().unwrap();
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

    let first = store.insert(&NewProject::new("first").created_at(at)).unwrap();
    let second = store.insert(&NewProject::new("second").created_at(at)).unwrap();

    let ids: Vec<i64> = store.list().unwrap().into_iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);
}

#[test]
fn test_empty_store_lists_nothing() {
    let store = ProjectStore::open_in_memory().unwrap();
    assert!(store.list().unwrap().is_empty());
}

#[test]
fn test_rows_survive_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("projects.db");

    {
        let store = ProjectStore::open(&path).unwrap();
        store.insert(&NewProject::new("Gantry plate")).unwrap();
    }

    let store = ProjectStore::open(&path).unwrap();
    assert_eq!(store.path(), Some(path.as_path()));
    let projects = store.list().unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].name, "Gantry plate");
}

#[test]
fn test_open_fails_on_directory_path() {
    let dir = tempdir().unwrap();
    assert!(ProjectStore::open(dir.path()).is_err());
}

#[test]
fn test_scalar_settings_survive_numeric_affinity() {
    let store = ProjectStore::open_in_memory().unwrap();

    let beam = store
        .insert(&NewProject::new("Beam").with_settings(serde_json::json!(0.3)))
        .unwrap();
    assert_eq!(beam.settings, serde_json::json!(0.3));
    store
        .insert(&NewProject::new("Truss").with_settings(serde_json::json!(3)))
        .unwrap();
    store
        .insert(&NewProject::new("Plate").with_settings(serde_json::json!("dense")))
        .unwrap();

    let mut settings: Vec<(String, serde_json::Value)> = store
        .list()
        .unwrap()
        .into_iter()
        .map(|p| (p.name, p.settings))
        .collect();
    settings.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(
        settings,
        vec![
            ("Beam".to_string(), serde_json::json!(0.3)),
            ("Plate".to_string(), serde_json::json!("dense")),
            ("Truss".to_string(), serde_json::json!(3)),
        ]
    );
}
