//! Integration tests for entity matching

use movediff_core::config::{EntitiesConfig, IndexKind};
use movediff_core::entity::{
    extract_entities, match_entities, Criterion, Entity, EntityKind, EntityMatcher, KindMatcher,
    MatchState, Relationship,
};
use movediff_core::{Side, Snapshot};

// ============================================================================
// Test Utilities
// ============================================================================

fn make_snapshot(files: &[(&str, &str)]) -> Snapshot {
    Snapshot::from_sexp_files(files).expect("fixture trees parse")
}

fn constant_index() -> movediff_core::entity::SimilarityIndex {
    Box::new(|_: &Entity, _: &Entity| 1.0)
}

// ============================================================================
// Priority
// ============================================================================

#[test]
fn test_deeper_type_wins_tied_candidate() {
    // Outer (level 1) and Outer.Inner (level 2) before; Inner2 (level 2,
    // nested in a method) after. Scores tie, so priority decides.
    let before = make_snapshot(&[("P.java", "(Unit (Class \"Outer\" (Class \"Inner\")))")]);
    let after = make_snapshot(&[("Q.java", "(Unit (Method \"setup\" (Class \"Inner2\")))")]);
    let before = extract_entities(&before, Side::Source);
    let after = extract_entities(&after, Side::Destination);

    let matcher = KindMatcher::new(EntityKind::Type).using(constant_index()).add_criterion(
        Criterion::new(
            Relationship::MoveAndRenameType,
            0.5,
            Box::new(|_: &MatchState<'_>, _: &Entity, _: &Entity| true),
        ),
    );
    let mut state = MatchState::new(&before, &after);
    matcher.run(&mut state);

    let m = &state.matches()[0];
    assert_eq!(before.get(m.before).qualified_name, "P.Outer.Inner");
    assert_eq!(after.get(m.after).name, "Inner2");
    assert!(!m.low_confidence);
}

#[test]
fn test_flat_priority_falls_back_to_declaration_order() {
    let before = make_snapshot(&[("P.java", "(Unit (Class \"Outer\" (Class \"Inner\")))")]);
    let after = make_snapshot(&[("Q.java", "(Unit (Method \"setup\" (Class \"Inner2\")))")]);
    let before = extract_entities(&before, Side::Source);
    let after = extract_entities(&after, Side::Destination);

    let matcher = KindMatcher::new(EntityKind::Type)
        .using(constant_index())
        .with_priority(Box::new(|_: &Entity, _: &Entity| 0.0))
        .add_criterion(Criterion::new(
            Relationship::MoveAndRenameType,
            0.5,
            Box::new(|_: &MatchState<'_>, _: &Entity, _: &Entity| true),
        ));
    let mut state = MatchState::new(&before, &after);
    matcher.run(&mut state);

    let m = &state.matches()[0];
    assert_eq!(before.get(m.before).name, "Outer");
    assert!(m.low_confidence);
}

// ============================================================================
// Default criteria
// ============================================================================

#[test]
fn test_renamed_container_and_nested_type() {
    let body = "(Method \"read\" (Block (Return (Call \"next\" (Name \"stream\") (Num \"8\")))))";
    let before = make_snapshot(&[(
        "io/Reader.java",
        &format!("(Unit (Class \"Reader\" {} (Class \"Buffer\" (Field (Type \"int\") (VariableDeclarator \"size\")))))", body),
    )]);
    let after = make_snapshot(&[(
        "io/Reader.java",
        &format!("(Unit (Class \"Source\" {} (Class \"Chunk\" (Field (Type \"int\") (VariableDeclarator \"size\")))))", body),
    )]);

    let result = match_entities(&before, &after, &EntitiesConfig::default());

    let renamed: Vec<_> = result.with_relationship(Relationship::RenameType).collect();
    assert_eq!(renamed.len(), 2);
    assert_eq!(result.with_relationship(Relationship::ChangeSignature).count(), 1);
    assert_eq!(result.with_relationship(Relationship::MoveAttribute).count(), 1);
    assert!(result.matches.iter().all(|m| !m.low_confidence));
}

#[test]
fn test_unrelated_entities_stay_unmatched() {
    let before = make_snapshot(&[(
        "A.java",
        "(Unit (Class \"Alpha\" (Method \"one\" (Block (Call \"first\" (Name \"x\"))))))",
    )]);
    let after = make_snapshot(&[(
        "B.java",
        "(Unit (Class \"Beta\" (Method \"two\" (Block (Assign (Name \"y\") (Num \"2\"))))))",
    )]);

    let result = match_entities(&before, &after, &EntitiesConfig::default());
    assert!(result.is_empty());
}

#[test]
fn test_configured_indices() {
    let config = EntitiesConfig::default();
    let mut strict = config.clone();
    strict.methods.indices = vec![IndexKind::Name];
    strict.methods.threshold = 0.9;

    let before = make_snapshot(&[(
        "A.java",
        "(Unit (Class \"A\" (Method \"load\" (Block (Call \"fetch\" (Name \"url\"))))))",
    )]);
    let after = make_snapshot(&[(
        "A.java",
        "(Unit (Class \"A\" (Method \"fetchAll\" (Block (Call \"fetch\" (Name \"url\"))))))",
    )]);
    let before_model = extract_entities(&before, Side::Source);
    let after_model = extract_entities(&after, Side::Destination);

    let loose = EntityMatcher::new(&config).match_models(&before_model, &after_model);
    let tight = EntityMatcher::new(&strict).match_models(&before_model, &after_model);

    assert_eq!(loose.with_relationship(Relationship::RenameMethod).count(), 1);
    assert_eq!(tight.with_relationship(Relationship::RenameMethod).count(), 0);
}
