//! View-index lookups mapped back to entities

use crate::fixtures::{beer, versioned, Beer};
use sediment::{
    DocumentStore, DocumentTemplate, MemoryStore, RawDocument, StoreResult, Value,
    ViewIndexExecutor, ViewQuery, TYPE_KEY,
};

/// Executor over the store snapshot with a discriminator guard, standing
/// in for a real index with a type predicate in its map function.
struct TypeGuardedView<'a> {
    store: &'a MemoryStore,
    discriminator: &'a str,
}

impl ViewIndexExecutor for TypeGuardedView<'_> {
    fn execute(&self, query: &ViewQuery) -> StoreResult<Vec<RawDocument>> {
        let mut docs: Vec<RawDocument> = self
            .store
            .snapshot()
            .into_iter()
            .filter(|doc| {
                doc.payload.get(TYPE_KEY).and_then(Value::as_str) == Some(self.discriminator)
            })
            .collect();
        if query.descending {
            docs.reverse();
        }
        if let Some(limit) = query.limit {
            docs.truncate(limit);
        }
        Ok(docs)
    }
}

fn seeded() -> DocumentTemplate<MemoryStore> {
    let template = DocumentTemplate::new(MemoryStore::new());
    for (id, name) in [
        ("beers:amber", "Amber"),
        ("beers:dunkel", "Dunkel"),
        ("beers:export", "Export"),
    ] {
        template.save(&mut beer(id, name)).unwrap();
    }
    // a different type sharing the store
    template
        .save(&mut versioned("versioned:intruder", "not a beer"))
        .unwrap();
    template
}

#[test]
fn view_results_map_to_entities_in_index_order() {
    let template = seeded();
    let view = TypeGuardedView {
        store: template.store(),
        discriminator: "fixtures.Beer",
    };

    let beers: Vec<Beer> = template
        .find_by_view(&view, &ViewQuery::from("beers", "by_id"))
        .unwrap();
    let names: Vec<&str> = beers.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["Amber", "Dunkel", "Export"]);
}

#[test]
fn descending_and_limit_are_the_executors_concern() {
    let template = seeded();
    let view = TypeGuardedView {
        store: template.store(),
        discriminator: "fixtures.Beer",
    };

    let beers: Vec<Beer> = template
        .find_by_view(&view, &ViewQuery::from("beers", "by_id").descending().limit(2))
        .unwrap();
    let names: Vec<&str> = beers.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["Export", "Dunkel"]);
}

#[test]
fn unconvertible_document_is_skipped_without_aborting() {
    let template = seeded();
    // break one document's field typing in place
    let mut broken = sediment::Payload::new();
    broken.insert(TYPE_KEY, Value::String("fixtures.Beer".into()));
    broken.insert("name", Value::Int(1));
    template.store().upsert("beers:dunkel", &broken, 0).unwrap();

    let view = TypeGuardedView {
        store: template.store(),
        discriminator: "fixtures.Beer",
    };
    let beers: Vec<Beer> = template
        .find_by_view(&view, &ViewQuery::from("beers", "by_id"))
        .unwrap();
    let names: Vec<&str> = beers.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["Amber", "Export"]);
}

#[test]
fn per_document_outcomes_are_available_at_the_lower_level() {
    let template = seeded();
    let view = TypeGuardedView {
        store: template.store(),
        discriminator: "fixtures.Beer",
    };
    let docs = view.execute(&ViewQuery::from("beers", "by_id")).unwrap();

    let outcomes = template.map_documents::<Beer>(&docs);
    assert_eq!(outcomes.len(), 3);
    assert!(outcomes.iter().all(Result::is_ok));
}
