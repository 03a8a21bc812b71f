//! Entity matching: declarations aligned across versions.
//!
//! A coarser pass than node matching. Types, methods and attributes are
//! extracted from each snapshot ([`extract_entities`]) and paired by an
//! [`EntityMatcher`] built from pluggable similarity indices and a priority
//! function. Nothing here depends on the node-level mapping.
//!
//! # Example
//!
//! ```
//! use movediff_core::config::EntitiesConfig;
//! use movediff_core::entity::{match_entities, Relationship};
//! use movediff_core::Snapshot;
//!
//! let before = Snapshot::from_sexp_files(&[(
//!     "A.java",
//!     "(Unit (Class \"A\" (Method \"run\" (Block (Call \"go\" (Name \"speed\") (Num \"2\"))))))",
//! )]).unwrap();
//! let after = Snapshot::from_sexp_files(&[(
//!     "A.java",
//!     "(Unit (Class \"A\" (Method \"start\" (Block (Call \"go\" (Name \"speed\") (Num \"2\"))))))",
//! )]).unwrap();
//!
//! let result = match_entities(&before, &after, &EntitiesConfig::default());
//! assert!(result.matches.iter().any(|m| m.relationship == Relationship::RenameMethod));
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::snapshot::{FileId, NodeRef, Side};
use crate::text::TokenBag;

pub mod extract;
pub mod matcher;
pub mod similarity;

pub use extract::extract_entities;
pub use matcher::{
    match_entities, Criterion, EntityMatch, EntityMatcher, EntityMatches, KindMatcher, MatchState,
    Relationship,
};
pub use similarity::{PriorityFn, SimilarityIndex};

/// Declaration category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Type,
    Method,
    Attribute,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Type => "type",
            EntityKind::Method => "method",
            EntityKind::Attribute => "attribute",
        }
    }
}

/// Index of an entity inside its [`EntityModel`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl EntityId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A declaration extracted from a tree.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    /// Simple name, e.g. `Inner`.
    pub name: String,
    /// Module path plus enclosing declarations, e.g. `src.Outer.Outer.Inner`.
    pub qualified_name: String,
    /// Nearest enclosing entity.
    pub container: Option<EntityId>,
    /// 1 for top-level declarations, plus one per enclosing declaration.
    pub nesting_level: u32,
    pub file: FileId,
    pub node: NodeRef,
    /// Declaration order over the whole snapshot.
    pub order: usize,
    /// Token counts of every label in the declaration's subtree.
    pub tokens: TokenBag,
    /// Names of directly nested entities.
    pub members: BTreeSet<String>,
}

/// All entities of one snapshot.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntityModel {
    pub side: Side,
    entities: Vec<Entity>,
}

impl EntityModel {
    pub fn new(side: Side, entities: Vec<Entity>) -> Self {
        Self { side, entities }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get(&self, id: EntityId) -> &Entity {
        &self.entities[id.index()]
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn of_kind(&self, kind: EntityKind) -> impl Iterator<Item = &Entity> + '_ {
        self.entities.iter().filter(move |e| e.kind == kind)
    }

    pub fn find(&self, qualified_name: &str) -> Option<&Entity> {
        self.entities
            .iter()
            .find(|e| e.qualified_name == qualified_name)
    }
}
