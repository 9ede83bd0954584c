//! Basic save/find/update/remove behavior and the stored document shape

use crate::fixtures::{beer, Beer, ComplexPerson};
use sediment::{DocumentTemplate, MemoryStore, Value, TYPE_KEY};
use std::collections::BTreeMap;

#[test]
fn save_then_find_round_trips() {
    let template = DocumentTemplate::new(MemoryStore::new());
    let mut stout = beer("beers:awesome-stout", "The Awesome Stout");
    stout.description = Some("dark and roasty".into());
    template.save(&mut stout).unwrap();

    let found: Beer = template.find_by_id("beers:awesome-stout").unwrap().unwrap();
    assert_eq!(found, stout);
}

#[test]
fn stored_document_carries_discriminator_but_not_identity() {
    let template = DocumentTemplate::new(MemoryStore::new());
    template.save(&mut beer("beers:shape", "Shape")).unwrap();

    let docs = template.store().snapshot();
    assert_eq!(docs.len(), 1);
    let payload = &docs[0].payload;
    assert_eq!(
        payload.get(TYPE_KEY),
        Some(&Value::String("fixtures.Beer".into()))
    );
    assert!(payload.get("id").is_none());
    // the discriminator is the first key written
    assert_eq!(payload.keys().next(), Some(TYPE_KEY));
}

#[test]
fn null_fields_are_omitted_and_read_back_as_default() {
    let template = DocumentTemplate::new(MemoryStore::new());
    template.save(&mut beer("beers:nulls", "No Description")).unwrap();

    let docs = template.store().snapshot();
    assert!(!docs[0].payload.contains_key("description"));

    let found: Beer = template.find_by_id("beers:nulls").unwrap().unwrap();
    assert_eq!(found.description, None);
}

#[test]
fn save_without_identity_generates_one() {
    let template = DocumentTemplate::new(MemoryStore::new());
    let mut anon = Beer {
        id: None,
        name: "Anonymous Ale".into(),
        active: true,
        description: None,
    };
    template.save(&mut anon).unwrap();

    let id = anon.id.clone().expect("identity assigned on save");
    let found: Beer = template.find_by_id(&id).unwrap().unwrap();
    assert_eq!(found.name, "Anonymous Ale");
}

#[test]
fn find_on_absent_key_is_none_not_an_error() {
    let template = DocumentTemplate::new(MemoryStore::new());
    assert!(template.find_by_id::<Beer>("beers:nope").unwrap().is_none());
}

#[test]
fn exists_tracks_saves_and_removes() {
    let template = DocumentTemplate::new(MemoryStore::new());
    assert!(!template.exists("beers:here").unwrap());

    let mut b = beer("beers:here", "Here");
    template.save(&mut b).unwrap();
    assert!(template.exists("beers:here").unwrap());

    template.remove(&b).unwrap();
    assert!(!template.exists("beers:here").unwrap());
}

#[test]
fn remove_on_absent_key_surfaces_not_found() {
    let template = DocumentTemplate::new(MemoryStore::new());
    let err = template.remove_by_id("beers:gone").unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("beers:gone"));
}

#[test]
fn save_all_persists_every_entity() {
    let template = DocumentTemplate::new(MemoryStore::new());
    let mut batch = vec![
        beer("beers:one", "One"),
        beer("beers:two", "Two"),
        beer("beers:three", "Three"),
    ];
    template.save_all(&mut batch).unwrap();
    assert_eq!(template.store().len(), 3);
    for b in &batch {
        assert!(template.exists(b.id.as_deref().unwrap()).unwrap());
    }
}

#[test]
fn stored_payload_serializes_to_stable_json() {
    let template = DocumentTemplate::new(MemoryStore::new());
    template.save(&mut beer("beers:json", "Json Lager")).unwrap();

    let docs = template.store().snapshot();
    let json = serde_json::to_string(&docs[0].payload).unwrap();
    assert_eq!(
        json,
        r#"{"_class":"fixtures.Beer","name":"Json Lager","is_active":true}"#
    );
}

#[test]
fn collections_round_trip_with_explicit_nulls() {
    let template = DocumentTemplate::new(MemoryStore::new());
    let mut person = ComplexPerson {
        id: Some("persons:complex".into()),
        first_names: vec!["Verena".into(), "Anton".into()],
        scores: vec![Some(1), None, Some(3)],
        info: BTreeMap::from([
            ("nickname".to_string(), Some("Toni".to_string())),
            ("middle_name".to_string(), None),
        ]),
    };
    template.save(&mut person).unwrap();

    let found: ComplexPerson = template.find_by_id("persons:complex").unwrap().unwrap();
    assert_eq!(found, person);

    // nulls inside containers are preserved in the stored document
    let docs = template.store().snapshot();
    let scores = docs[0].payload.get("scores").unwrap();
    assert_eq!(
        scores,
        &Value::Array(vec![Value::Int(1), Value::Null, Value::Int(3)])
    );
}
