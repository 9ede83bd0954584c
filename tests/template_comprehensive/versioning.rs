//! Optimistic concurrency through version tokens

use crate::fixtures::{versioned, VersionedClass};
use sediment::{DocumentTemplate, MemoryStore};

#[test]
fn insert_sets_version_from_the_assigned_token() {
    let template = DocumentTemplate::new(MemoryStore::new());
    let mut v = versioned("versioned:insert", "initial");
    assert_eq!(v.version, 0);
    template.insert(&mut v).unwrap();
    assert_ne!(v.version, 0);

    let found: VersionedClass = template.find_by_id("versioned:insert").unwrap().unwrap();
    assert_eq!(found.version, v.version);
}

#[test]
fn second_insert_fails_and_leaves_version_unchanged() {
    let template = DocumentTemplate::new(MemoryStore::new());
    let mut first = versioned("versioned:dup", "first");
    template.insert(&mut first).unwrap();

    let mut second = versioned("versioned:dup", "second");
    let err = template.insert(&mut second).unwrap_err();
    assert!(err.is_optimistic_locking());
    assert_eq!(second.version, 0);

    let stored: VersionedClass = template.find_by_id("versioned:dup").unwrap().unwrap();
    assert_eq!(stored.field, "first");
}

#[test]
fn save_with_fresh_token_advances_it() {
    let template = DocumentTemplate::new(MemoryStore::new());
    let mut v = versioned("versioned:advance", "one");
    template.save(&mut v).unwrap();
    let first_token = v.version;

    v.field = "two".into();
    template.save(&mut v).unwrap();
    assert_ne!(v.version, first_token);

    let stored: VersionedClass = template.find_by_id("versioned:advance").unwrap().unwrap();
    assert_eq!(stored.field, "two");
}

#[test]
fn save_with_stale_token_is_rejected() {
    let template = DocumentTemplate::new(MemoryStore::new());
    let mut v = versioned("versioned:stale", "base");
    template.save(&mut v).unwrap();

    let mut stale: VersionedClass = template.find_by_id("versioned:stale").unwrap().unwrap();
    let mut fresh = stale.clone();
    fresh.field = "fresh wins".into();
    template.save(&mut fresh).unwrap();

    stale.field = "stale loses".into();
    let err = template.save(&mut stale).unwrap_err();
    assert!(err.is_optimistic_locking());

    let stored: VersionedClass = template.find_by_id("versioned:stale").unwrap().unwrap();
    assert_eq!(stored.field, "fresh wins");
}

#[test]
fn zero_token_save_overwrites_unconditionally() {
    let template = DocumentTemplate::new(MemoryStore::new());
    let mut v = versioned("versioned:zero", "original");
    template.save(&mut v).unwrap();

    // a second writer that never read the document
    let mut blind = versioned("versioned:zero", "blind overwrite");
    template.save(&mut blind).unwrap();

    let stored: VersionedClass = template.find_by_id("versioned:zero").unwrap().unwrap();
    assert_eq!(stored.field, "blind overwrite");
}

#[test]
fn update_does_not_insert() {
    let template = DocumentTemplate::new(MemoryStore::new());
    let mut v = versioned("versioned:noinsert", "never stored");
    template.update(&mut v).unwrap();
    assert!(template
        .find_by_id::<VersionedClass>("versioned:noinsert")
        .unwrap()
        .is_none());
}

#[test]
fn update_with_stale_token_is_rejected() {
    let template = DocumentTemplate::new(MemoryStore::new());
    let mut v = versioned("versioned:updstale", "base");
    template.save(&mut v).unwrap();

    let mut stale = v.clone();
    v.field = "advanced".into();
    template.save(&mut v).unwrap();

    stale.field = "from the past".into();
    let err = template.update(&mut stale).unwrap_err();
    assert!(err.is_optimistic_locking());
}

#[test]
fn reading_always_yields_the_current_token() {
    let template = DocumentTemplate::new(MemoryStore::new());
    let mut v = versioned("versioned:read", "x");
    template.save(&mut v).unwrap();
    template.save(&mut v).unwrap();

    let read: VersionedClass = template.find_by_id("versioned:read").unwrap().unwrap();
    assert_eq!(read.version, v.version);
    // a save from the freshly read state goes through
    let mut read = read;
    read.field = "y".into();
    template.save(&mut read).unwrap();
}
