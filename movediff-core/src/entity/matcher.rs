//! Greedy, priority-ordered entity matching.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::extract::extract_entities;
use super::similarity::{self, PriorityFn, SimilarityIndex};
use super::{Entity, EntityId, EntityKind, EntityModel};
use crate::config::{EntitiesConfig, EntityKindSettings};
use crate::snapshot::{Side, Snapshot};

/// Why two entities were paired.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relationship {
    /// Same kind and qualified name.
    Same,
    MoveType,
    RenameType,
    MoveAndRenameType,
    ChangeSignature,
    RenameMethod,
    MoveMethod,
    MoveAttribute,
}

impl Relationship {
    pub fn as_str(&self) -> &'static str {
        match self {
            Relationship::Same => "same",
            Relationship::MoveType => "move_type",
            Relationship::RenameType => "rename_type",
            Relationship::MoveAndRenameType => "move_and_rename_type",
            Relationship::ChangeSignature => "change_signature",
            Relationship::RenameMethod => "rename_method",
            Relationship::MoveMethod => "move_method",
            Relationship::MoveAttribute => "move_attribute",
        }
    }
}

/// One matched before/after pair.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityMatch {
    pub before: EntityId,
    pub after: EntityId,
    pub kind: EntityKind,
    pub relationship: Relationship,
    pub score: f64,
    /// Another candidate had the same score and priority; declaration
    /// order decided.
    pub low_confidence: bool,
}

/// Pairs found so far, one-to-one.
pub struct MatchState<'m> {
    pub before: &'m EntityModel,
    pub after: &'m EntityModel,
    matches: Vec<EntityMatch>,
    forward: HashMap<EntityId, EntityId>,
    backward: HashMap<EntityId, EntityId>,
}

impl<'m> MatchState<'m> {
    pub fn new(before: &'m EntityModel, after: &'m EntityModel) -> Self {
        Self {
            before,
            after,
            matches: Vec::new(),
            forward: HashMap::new(),
            backward: HashMap::new(),
        }
    }

    pub fn is_before_matched(&self, id: EntityId) -> bool {
        self.forward.contains_key(&id)
    }

    pub fn is_after_matched(&self, id: EntityId) -> bool {
        self.backward.contains_key(&id)
    }

    pub fn after_of(&self, before: EntityId) -> Option<EntityId> {
        self.forward.get(&before).copied()
    }

    /// Whether two containers correspond: both top-level, or matched to
    /// each other.
    pub fn entities_match(&self, before: Option<EntityId>, after: Option<EntityId>) -> bool {
        match (before, after) {
            (None, None) => true,
            (Some(b), Some(a)) => self.after_of(b) == Some(a),
            _ => false,
        }
    }

    fn record(&mut self, m: EntityMatch) {
        self.forward.insert(m.before, m.after);
        self.backward.insert(m.after, m.before);
        self.matches.push(m);
    }

    pub fn matches(&self) -> &[EntityMatch] {
        &self.matches
    }
}

pub type CanMatch = Box<dyn Fn(&MatchState<'_>, &Entity, &Entity) -> bool + Send + Sync>;

/// One matching round: pairs allowed by `can_match` and scoring at least
/// `threshold` are tagged `relationship`.
pub struct Criterion {
    pub relationship: Relationship,
    pub threshold: f64,
    pub can_match: CanMatch,
}

impl Criterion {
    pub fn new(relationship: Relationship, threshold: f64, can_match: CanMatch) -> Self {
        Self {
            relationship,
            threshold,
            can_match,
        }
    }
}

/// Matcher for one entity kind.
pub struct KindMatcher {
    pub kind: EntityKind,
    indices: Vec<SimilarityIndex>,
    priority: PriorityFn,
    criteria: Vec<Criterion>,
}

struct Candidate {
    priority: f64,
    score: f64,
    before: EntityId,
    after: EntityId,
    before_order: usize,
    after_order: usize,
}

impl KindMatcher {
    /// No indices, nesting-level priority, no criteria.
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            indices: Vec::new(),
            priority: similarity::nesting_level(),
            criteria: Vec::new(),
        }
    }

    /// Add a similarity index. Several indices are averaged.
    pub fn using(mut self, index: SimilarityIndex) -> Self {
        self.indices.push(index);
        self
    }

    pub fn with_priority(mut self, priority: PriorityFn) -> Self {
        self.priority = priority;
        self
    }

    pub fn add_criterion(mut self, criterion: Criterion) -> Self {
        self.criteria.push(criterion);
        self
    }

    /// Indices and priority from config, criteria still empty.
    pub fn from_settings(kind: EntityKind, settings: &EntityKindSettings) -> Self {
        settings.indices.iter().fold(
            Self::new(kind).with_priority(similarity::priority(settings.priority)),
            |m, &index| m.using(similarity::index(index)),
        )
    }

    pub fn similarity(&self, before: &Entity, after: &Entity) -> f64 {
        if self.indices.is_empty() {
            return 0.0;
        }
        let total: f64 = self.indices.iter().map(|index| index(before, after)).sum();
        total / self.indices.len() as f64
    }

    /// Run every criterion in order over the still unmatched entities.
    /// Repeats while a round adds matches, since a new container match can
    /// enable criteria for what it contains.
    pub fn run(&self, state: &mut MatchState<'_>) {
        loop {
            let matched = state.matches.len();
            for criterion in &self.criteria {
                self.run_criterion(criterion, state);
            }
            if state.matches.len() == matched {
                break;
            }
        }
    }

    fn run_criterion(&self, criterion: &Criterion, state: &mut MatchState<'_>) {
        let mut candidates = Vec::new();
        for b in state.before.of_kind(self.kind) {
            if state.is_before_matched(b.id) {
                continue;
            }
            for a in state.after.of_kind(self.kind) {
                if state.is_after_matched(a.id) || !(criterion.can_match)(&*state, b, a) {
                    continue;
                }
                let score = self.similarity(b, a);
                if score < criterion.threshold {
                    continue;
                }
                candidates.push(Candidate {
                    priority: (self.priority)(b, a),
                    score,
                    before: b.id,
                    after: a.id,
                    before_order: b.order,
                    after_order: a.order,
                });
            }
        }
        candidates.sort_by(|x, y| {
            y.priority
                .total_cmp(&x.priority)
                .then(y.score.total_cmp(&x.score))
                .then(x.before_order.cmp(&y.before_order))
                .then(x.after_order.cmp(&y.after_order))
        });

        for i in 0..candidates.len() {
            let c = &candidates[i];
            if state.is_before_matched(c.before) || state.is_after_matched(c.after) {
                continue;
            }
            // a rival with the same rank competing for either side
            let low_confidence = candidates[i + 1..]
                .iter()
                .take_while(|r| r.priority == c.priority && r.score == c.score)
                .any(|r| {
                    (r.before == c.before || r.after == c.after)
                        && !state.is_before_matched(r.before)
                        && !state.is_after_matched(r.after)
                });
            if low_confidence {
                tracing::warn!(
                    "Low-confidence {} match {} -> {} (score {:.2}, priority {})",
                    criterion.relationship.as_str(),
                    state.before.get(c.before).qualified_name,
                    state.after.get(c.after).qualified_name,
                    c.score,
                    c.priority
                );
            }
            state.record(EntityMatch {
                before: c.before,
                after: c.after,
                kind: self.kind,
                relationship: criterion.relationship,
                score: c.score,
                low_confidence,
            });
        }
    }
}

fn same_name() -> CanMatch {
    Box::new(|_: &MatchState<'_>, b: &Entity, a: &Entity| b.name == a.name)
}

fn containers_match() -> CanMatch {
    Box::new(|m: &MatchState<'_>, b: &Entity, a: &Entity| m.entities_match(b.container, a.container))
}

/// Types, then methods, then attributes, each with its default criteria.
pub struct EntityMatcher {
    matchers: Vec<KindMatcher>,
}

impl EntityMatcher {
    pub fn new(config: &EntitiesConfig) -> Self {
        let types = KindMatcher::from_settings(EntityKind::Type, &config.types);
        let t = config.types.threshold;
        let types = types
            .add_criterion(Criterion::new(Relationship::MoveType, t, same_name()))
            .add_criterion(Criterion::new(Relationship::RenameType, t, containers_match()))
            .add_criterion(Criterion::new(
                Relationship::MoveAndRenameType,
                t,
                Box::new(|m: &MatchState<'_>, b: &Entity, a: &Entity| {
                    b.name != a.name && !m.entities_match(b.container, a.container)
                }),
            ));

        let methods = KindMatcher::from_settings(EntityKind::Method, &config.methods);
        let t = config.methods.threshold;
        let methods = methods
            .add_criterion(Criterion::new(
                Relationship::ChangeSignature,
                t,
                Box::new(|m: &MatchState<'_>, b: &Entity, a: &Entity| {
                    b.name == a.name && m.entities_match(b.container, a.container)
                }),
            ))
            .add_criterion(Criterion::new(
                Relationship::RenameMethod,
                t,
                Box::new(|m: &MatchState<'_>, b: &Entity, a: &Entity| {
                    b.name != a.name && m.entities_match(b.container, a.container)
                }),
            ))
            .add_criterion(Criterion::new(
                Relationship::MoveMethod,
                t,
                Box::new(|m: &MatchState<'_>, b: &Entity, a: &Entity| {
                    b.name == a.name && !m.entities_match(b.container, a.container)
                }),
            ));

        let attributes = KindMatcher::from_settings(EntityKind::Attribute, &config.attributes)
            .add_criterion(Criterion::new(
                Relationship::MoveAttribute,
                config.attributes.threshold,
                same_name(),
            ));

        Self::with_matchers(vec![types, methods, attributes])
    }

    /// Custom matchers, run in the given order.
    pub fn with_matchers(matchers: Vec<KindMatcher>) -> Self {
        Self { matchers }
    }

    /// Pair entities with equal kind and qualified name when the name is
    /// unique on both sides.
    fn identity_pass(&self, state: &mut MatchState<'_>) {
        let (before, after) = (state.before, state.after);
        let mut counts: HashMap<(EntityKind, &str), (usize, usize)> = HashMap::new();
        for e in before.entities() {
            counts.entry((e.kind, e.qualified_name.as_str())).or_default().0 += 1;
        }
        for e in after.entities() {
            counts.entry((e.kind, e.qualified_name.as_str())).or_default().1 += 1;
        }
        let after_by_name: HashMap<(EntityKind, &str), EntityId> = after
            .entities()
            .iter()
            .map(|e| ((e.kind, e.qualified_name.as_str()), e.id))
            .collect();

        for b in before.entities() {
            let key = (b.kind, b.qualified_name.as_str());
            if counts.get(&key) != Some(&(1, 1)) {
                continue;
            }
            let Some(&a) = after_by_name.get(&key) else {
                continue;
            };
            let score = self
                .matchers
                .iter()
                .find(|m| m.kind == b.kind)
                .map_or(1.0, |m| m.similarity(b, after.get(a)));
            state.record(EntityMatch {
                before: b.id,
                after: a,
                kind: b.kind,
                relationship: Relationship::Same,
                score,
                low_confidence: false,
            });
        }
    }

    pub fn match_models(&self, before: &EntityModel, after: &EntityModel) -> EntityMatches {
        let mut state = MatchState::new(before, after);
        self.identity_pass(&mut state);
        for matcher in &self.matchers {
            matcher.run(&mut state);
        }
        let matches = state.matches;
        tracing::debug!(
            "Matched {} of {} before / {} after entities",
            matches.len(),
            before.len(),
            after.len()
        );
        EntityMatches { matches }
    }
}

/// Result of entity matching.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EntityMatches {
    pub matches: Vec<EntityMatch>,
}

impl EntityMatches {
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn after_of(&self, before: EntityId) -> Option<&EntityMatch> {
        self.matches.iter().find(|m| m.before == before)
    }

    pub fn before_of(&self, after: EntityId) -> Option<&EntityMatch> {
        self.matches.iter().find(|m| m.after == after)
    }

    pub fn with_relationship(&self, relationship: Relationship) -> impl Iterator<Item = &EntityMatch> + '_ {
        self.matches.iter().filter(move |m| m.relationship == relationship)
    }
}

/// Extract entities from both snapshots and match them.
pub fn match_entities(before: &Snapshot, after: &Snapshot, config: &EntitiesConfig) -> EntityMatches {
    let before = extract_entities(before, Side::Source);
    let after = extract_entities(after, Side::Destination);
    EntityMatcher::new(config).match_models(&before, &after)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{FileId, NodeRef};
    use crate::text::{token_bag, tokenize};
    use crate::tree::NodeId;

    fn make_entity(id: u32, name: &str, qualified_name: &str, nesting_level: u32, text: &str) -> Entity {
        Entity {
            id: EntityId(id),
            kind: EntityKind::Type,
            name: name.to_string(),
            qualified_name: qualified_name.to_string(),
            container: None,
            nesting_level,
            file: FileId(0),
            node: NodeRef::new(FileId(0), NodeId(id)),
            order: id as usize,
            tokens: token_bag(tokenize(text)),
            members: Default::default(),
        }
    }

    fn any_pair() -> CanMatch {
        Box::new(|_: &MatchState<'_>, _: &Entity, _: &Entity| true)
    }

    #[test]
    fn test_nesting_priority_beats_document_order() {
        let body = "void run ( ) { step ( ) ; }";
        let before = EntityModel::new(
            Side::Source,
            vec![
                make_entity(0, "Outer", "Outer", 1, body),
                make_entity(1, "Inner", "Outer.Inner", 2, body),
            ],
        );
        let after = EntityModel::new(
            Side::Destination,
            vec![make_entity(0, "Inner2", "Outer.Inner2", 2, body)],
        );
        let matcher = KindMatcher::new(EntityKind::Type)
            .using(similarity::source_text())
            .add_criterion(Criterion::new(Relationship::RenameType, 0.5, any_pair()));

        let mut state = MatchState::new(&before, &after);
        matcher.run(&mut state);

        assert_eq!(state.matches().len(), 1);
        assert_eq!(state.matches()[0].before, EntityId(1));
        assert!(!state.matches()[0].low_confidence);
    }

    #[test]
    fn test_full_tie_is_low_confidence_and_uses_order() {
        let body = "int x ;";
        let before = EntityModel::new(
            Side::Source,
            vec![make_entity(0, "A", "A", 1, body), make_entity(1, "B", "B", 1, body)],
        );
        let after = EntityModel::new(Side::Destination, vec![make_entity(0, "C", "C", 1, body)]);
        let matcher = KindMatcher::new(EntityKind::Type)
            .using(similarity::source_text())
            .add_criterion(Criterion::new(Relationship::RenameType, 0.5, any_pair()));

        let mut state = MatchState::new(&before, &after);
        matcher.run(&mut state);

        assert_eq!(state.matches()[0].before, EntityId(0));
        assert!(state.matches()[0].low_confidence);
    }

    #[test]
    fn test_threshold_and_one_to_one() {
        let before = EntityModel::new(
            Side::Source,
            vec![
                make_entity(0, "A", "A", 1, "alpha beta gamma"),
                make_entity(1, "B", "B", 1, "delta epsilon"),
            ],
        );
        let after = EntityModel::new(
            Side::Destination,
            vec![make_entity(0, "A2", "A2", 1, "alpha beta gamma")],
        );
        let matcher = KindMatcher::new(EntityKind::Type)
            .using(similarity::source_text())
            .add_criterion(Criterion::new(Relationship::RenameType, 0.5, any_pair()))
            .add_criterion(Criterion::new(Relationship::MoveAndRenameType, 0.0, any_pair()));

        let mut state = MatchState::new(&before, &after);
        matcher.run(&mut state);

        // the after entity is taken; B finds nothing even at threshold 0
        assert_eq!(state.matches().len(), 1);
        assert_eq!(state.matches()[0].relationship, Relationship::RenameType);
    }

    #[test]
    fn test_match_entities_default_criteria() {
        let before = Snapshot::from_sexp_files(&[
            (
                "A.java",
                "(Unit (Class \"A\" (Method \"foo\" (Block (Assign (Name \"x\") (Num \"1\")))) (Method \"bar\" (Block (Call \"log\" (Name \"msg\"))))))",
            ),
            ("B.java", "(Unit (Class \"B\"))"),
        ])
        .unwrap();
        let after = Snapshot::from_sexp_files(&[
            (
                "A.java",
                "(Unit (Class \"A\" (Method \"baz\" (Block (Call \"log\" (Name \"msg\"))))))",
            ),
            (
                "B.java",
                "(Unit (Class \"B\" (Method \"foo\" (Block (Assign (Name \"x\") (Num \"1\"))))))",
            ),
        ])
        .unwrap();

        let result = match_entities(&before, &after, &EntitiesConfig::default());
        let rels: Vec<Relationship> = result.matches.iter().map(|m| m.relationship).collect();

        assert_eq!(result.with_relationship(Relationship::Same).count(), 2);
        assert!(rels.contains(&Relationship::RenameMethod));
        assert!(rels.contains(&Relationship::MoveMethod));
        assert_eq!(result.len(), 4);
    }
}
