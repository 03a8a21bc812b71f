//! Similarity indices and priority functions for entity matching.
//!
//! Both are plain boxed closures so callers can plug in their own:
//!
//! ```
//! use movediff_core::entity::{Entity, EntityKind, KindMatcher};
//!
//! let matcher = KindMatcher::new(EntityKind::Method)
//!     .using(Box::new(|a: &Entity, b: &Entity| if a.name == b.name { 1.0 } else { 0.0 }))
//!     .with_priority(Box::new(|_: &Entity, _: &Entity| 0.0));
//! ```

use super::Entity;
use crate::config::{IndexKind, PriorityKind};
use crate::text::{bigram_dice, weighted_jaccard};

/// Scores a before/after pair in `[0, 1]`.
pub type SimilarityIndex = Box<dyn Fn(&Entity, &Entity) -> f64 + Send + Sync>;

/// Ranks candidate pairs; higher wins before score is considered.
pub type PriorityFn = Box<dyn Fn(&Entity, &Entity) -> f64 + Send + Sync>;

/// Weighted Jaccard over the tokens of the whole declaration.
pub fn source_text() -> SimilarityIndex {
    Box::new(|a: &Entity, b: &Entity| weighted_jaccard(&a.tokens, &b.tokens))
}

/// Character bigram Dice over simple names.
pub fn name() -> SimilarityIndex {
    Box::new(|a: &Entity, b: &Entity| bigram_dice(&a.name, &b.name))
}

/// Jaccard over the names of nested entities.
pub fn members() -> SimilarityIndex {
    Box::new(|a: &Entity, b: &Entity| {
        if a.members.is_empty() && b.members.is_empty() {
            return 1.0;
        }
        let common = a.members.intersection(&b.members).count();
        let union = a.members.union(&b.members).count();
        common as f64 / union as f64
    })
}

pub fn index(kind: IndexKind) -> SimilarityIndex {
    match kind {
        IndexKind::SourceText => source_text(),
        IndexKind::Name => name(),
        IndexKind::Members => members(),
    }
}

/// Deeper declarations first, so a nested type is not pre-empted by a
/// coincidental match of its container.
pub fn nesting_level() -> PriorityFn {
    Box::new(|a: &Entity, b: &Entity| (a.nesting_level + b.nesting_level) as f64)
}

/// Every pair ranks the same; score alone decides.
pub fn flat() -> PriorityFn {
    Box::new(|_: &Entity, _: &Entity| 0.0)
}

pub fn priority(kind: PriorityKind) -> PriorityFn {
    match kind {
        PriorityKind::NestingLevel => nesting_level(),
        PriorityKind::None => flat(),
    }
}
