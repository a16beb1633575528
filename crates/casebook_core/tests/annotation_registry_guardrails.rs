use std::collections::HashMap;

use casebook_core::lang::annotations::{self, ANNOTATIONS, AnnotationId};

const ALL: &[AnnotationId] = &[
    AnnotationId::Provide,
    AnnotationId::Inject,
    AnnotationId::Example,
    AnnotationId::Examples,
    AnnotationId::BeforeEach,
    AnnotationId::AfterEach,
    AnnotationId::Ignore,
];

#[test]
fn every_annotation_has_exactly_one_row() {
    for id in ALL {
        let rows = ANNOTATIONS.iter().filter(|a| a.id == *id).count();
        assert_eq!(rows, 1, "annotation {:?} must have exactly one registry row", id);
        assert_eq!(annotations::info_for(*id).id, *id);
    }
    assert_eq!(ANNOTATIONS.len(), ALL.len());
}

#[test]
fn annotation_spellings_unique_and_snake_case() {
    let mut seen: HashMap<&'static str, AnnotationId> = HashMap::new();

    for info in ANNOTATIONS {
        assert_eq!(annotations::as_str(info.id), info.canonical);
        assert!(
            info.canonical.chars().all(|c| c.is_ascii_lowercase() || c == '_'),
            "annotation spelling is not snake_case: {}",
            info.canonical
        );
        if let Some(prev) = seen.insert(info.canonical, info.id) {
            panic!("duplicate annotation spelling {:?}: {:?} and {:?}", info.canonical, prev, info.id);
        }
    }
}
