use std::collections::BTreeMap;

use evacsim_local_store::LocalStore;

const DRAWINGS_KEY: &str = "floor-plan-drawings";
const WIZARD_STATE_KEY: &str = "wizard-state";

fn open() -> (tempfile::TempDir, LocalStore) {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = LocalStore::open(dir.path().join("nested")).expect("store opens");
    (dir, store)
}

#[test]
fn missing_key_is_none() {
    let (_dir, store) = open();
    assert_eq!(store.get::<Vec<String>>(DRAWINGS_KEY), None);
}

#[test]
fn values_survive_reopening() {
    let (dir, store) = open();
    let mut state = BTreeMap::new();
    let _ = state.insert("stage".to_owned(), "exits".to_owned());
    store.set(WIZARD_STATE_KEY, &state).expect("written");

    let reopened = LocalStore::open(dir.path().join("nested")).expect("store opens");
    assert_eq!(
        reopened.get::<BTreeMap<String, String>>(WIZARD_STATE_KEY),
        Some(state)
    );
}

#[test]
fn corrupt_entry_is_discarded() {
    let (_dir, store) = open();
    let path = store.dir().join(format!("{DRAWINGS_KEY}.json"));
    std::fs::write(&path, "{not json").expect("write corrupt file");

    assert_eq!(store.get::<Vec<u32>>(DRAWINGS_KEY), None);
    assert!(!path.exists(), "corrupt payload is removed");
    store.set(DRAWINGS_KEY, &vec![1_u32, 2]).expect("store keeps working");
    assert_eq!(store.get::<Vec<u32>>(DRAWINGS_KEY), Some(vec![1, 2]));
}

#[test]
fn wrong_shape_is_treated_as_corrupt() {
    let (_dir, store) = open();
    store.set(DRAWINGS_KEY, &"a string").expect("written");
    assert_eq!(store.get::<Vec<u32>>(DRAWINGS_KEY), None);
    assert_eq!(store.get::<String>(DRAWINGS_KEY), None, "entry was dropped");
}

#[test]
fn remove_reports_presence() {
    let (_dir, store) = open();
    store.set(WIZARD_STATE_KEY, &1).expect("written");
    assert!(store.remove(WIZARD_STATE_KEY));
    assert!(!store.remove(WIZARD_STATE_KEY));
    assert_eq!(store.get::<u32>(WIZARD_STATE_KEY), None);
}
