//! Declared expiry and touch-on-read
//!
//! Timings mirror the declared 2-second expiry of the fixtures: reads
//! inside the window see the document, reads past it see nothing, and for
//! the touch-on-read type each find restarts the countdown.

use crate::fixtures::{ExpiringNote, TouchyNote};
use sediment::{DocumentTemplate, MemoryStore};
use std::thread::sleep;
use std::time::Duration;

#[test]
fn document_expires_after_the_declared_window() {
    let template = DocumentTemplate::new(MemoryStore::new());
    let mut note = ExpiringNote {
        id: Some("notes:fleeting".into()),
        text: "soon gone".into(),
    };
    template.save(&mut note).unwrap();

    assert!(template
        .find_by_id::<ExpiringNote>("notes:fleeting")
        .unwrap()
        .is_some());

    sleep(Duration::from_millis(2500));
    assert!(template
        .find_by_id::<ExpiringNote>("notes:fleeting")
        .unwrap()
        .is_none());
    assert!(!template.exists("notes:fleeting").unwrap());
}

#[test]
fn plain_reads_do_not_extend_the_window() {
    let template = DocumentTemplate::new(MemoryStore::new());
    let mut note = ExpiringNote {
        id: Some("notes:reads".into()),
        text: "reads change nothing".into(),
    };
    template.save(&mut note).unwrap();

    sleep(Duration::from_millis(1200));
    assert!(template
        .find_by_id::<ExpiringNote>("notes:reads")
        .unwrap()
        .is_some());

    // past the original deadline despite the read above
    sleep(Duration::from_millis(1200));
    assert!(template
        .find_by_id::<ExpiringNote>("notes:reads")
        .unwrap()
        .is_none());
}

#[test]
fn touching_reads_keep_the_document_alive() {
    let template = DocumentTemplate::new(MemoryStore::new());
    let mut note = TouchyNote {
        id: Some("notes:touchy".into()),
        text: "still here".into(),
    };
    template.save(&mut note).unwrap();

    // each read lands before the current deadline and restarts it
    sleep(Duration::from_millis(1200));
    assert!(template
        .find_by_id::<TouchyNote>("notes:touchy")
        .unwrap()
        .is_some());

    sleep(Duration::from_millis(1200));
    assert!(template
        .find_by_id::<TouchyNote>("notes:touchy")
        .unwrap()
        .is_some());

    // stop touching and let it lapse
    sleep(Duration::from_millis(2500));
    assert!(template
        .find_by_id::<TouchyNote>("notes:touchy")
        .unwrap()
        .is_none());
}

#[test]
fn every_write_restarts_the_countdown() {
    let template = DocumentTemplate::new(MemoryStore::new());
    let mut note = ExpiringNote {
        id: Some("notes:rewrite".into()),
        text: "v1".into(),
    };
    template.save(&mut note).unwrap();

    sleep(Duration::from_millis(1200));
    note.text = "v2".into();
    template.save(&mut note).unwrap();

    // past the first write's deadline, inside the second's
    sleep(Duration::from_millis(1200));
    let found: ExpiringNote = template.find_by_id("notes:rewrite").unwrap().unwrap();
    assert_eq!(found.text, "v2");
}
