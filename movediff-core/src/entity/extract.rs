//! Entity extraction from trees.

use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

use super::{Entity, EntityId, EntityKind, EntityModel};
use crate::snapshot::{NodeRef, Side, Snapshot};
use crate::text::{token_bag, tokenize};
use crate::tree::{NodeId, Tree};

/// Node kinds that declare a type: tree-sitter grammars plus the
/// capitalized kinds used by fixture trees.
static TYPE_KINDS: Lazy<HashSet<&str>> = Lazy::new(|| {
    HashSet::from([
        // java, csharp, typescript
        "class_declaration",
        "interface_declaration",
        "enum_declaration",
        "record_declaration",
        "annotation_type_declaration",
        "struct_declaration",
        "abstract_class_declaration",
        // python
        "class_definition",
        // rust
        "struct_item",
        "enum_item",
        "trait_item",
        "union_item",
        // go
        "type_spec",
        // fixtures
        "TypeDeclaration",
        "EnumDeclaration",
        "AnnotationTypeDeclaration",
        "RecordDeclaration",
        "Class",
        "Interface",
        "Enum",
    ])
});

static METHOD_KINDS: Lazy<HashSet<&str>> = Lazy::new(|| {
    HashSet::from([
        "method_declaration",
        "constructor_declaration",
        "function_declaration",
        "method_definition",
        "function_definition",
        "function_item",
        "local_function_statement",
        "MethodDeclaration",
        "Method",
        "Function",
    ])
});

static ATTRIBUTE_KINDS: Lazy<HashSet<&str>> = Lazy::new(|| {
    HashSet::from([
        "field_declaration",
        "property_declaration",
        "public_field_definition",
        "FieldDeclaration",
        "Field",
    ])
});

/// Entity kind declared by a node kind, if any.
pub fn entity_kind(node_kind: &str) -> Option<EntityKind> {
    if TYPE_KINDS.contains(node_kind) {
        Some(EntityKind::Type)
    } else if METHOD_KINDS.contains(node_kind) {
        Some(EntityKind::Method)
    } else if ATTRIBUTE_KINDS.contains(node_kind) {
        Some(EntityKind::Attribute)
    } else {
        None
    }
}

/// The declaration's own label, or the first declarator or identifier
/// below it (field declarations carry their name on a child).
fn entity_name(tree: &Tree, node: NodeId) -> String {
    if !tree.label(node).is_empty() {
        return tree.label(node).to_string();
    }
    tree.preorder_from(node)
        .into_iter()
        .skip(1)
        .find(|&n| {
            let kind = tree.kind(n).to_ascii_lowercase();
            !tree.label(n).is_empty()
                && (kind.ends_with("declarator") || kind.contains("identifier") || kind == "name")
        })
        .map(|n| tree.label(n).to_string())
        .unwrap_or_default()
}

/// `src/util/Helpers.java` becomes `src.util.Helpers`.
fn module_path(path: &str) -> String {
    let stem = match path.rfind('.') {
        Some(dot) if dot > path.rfind('/').map_or(0, |s| s + 1) => &path[..dot],
        _ => path,
    };
    stem.replace('/', ".")
}

/// Extract every type, method and attribute declaration of a snapshot,
/// files in path order, each file in document order.
pub fn extract_entities(snapshot: &Snapshot, side: Side) -> EntityModel {
    let mut entities: Vec<Entity> = Vec::new();

    for file in snapshot.file_ids() {
        let tree = snapshot.tree(file);
        let module = module_path(snapshot.path(file));
        let mut by_node: HashMap<NodeId, EntityId> = HashMap::new();

        for node in tree.preorder() {
            let Some(kind) = entity_kind(tree.kind(node)) else {
                continue;
            };
            let container = tree.ancestors(node).find_map(|a| by_node.get(&a).copied());
            let name = entity_name(tree, node);
            let (qualified_name, nesting_level) = match container {
                Some(c) => {
                    let parent = &entities[c.index()];
                    (
                        format!("{}.{}", parent.qualified_name, name),
                        parent.nesting_level + 1,
                    )
                }
                None => (format!("{}.{}", module, name), 1),
            };
            let tokens = token_bag(
                tree.preorder_from(node)
                    .into_iter()
                    .flat_map(|n| tokenize(tree.label(n))),
            );

            let id = EntityId(entities.len() as u32);
            by_node.insert(node, id);
            entities.push(Entity {
                id,
                kind,
                name,
                qualified_name,
                container,
                nesting_level,
                file,
                node: NodeRef::new(file, node),
                order: id.index(),
                tokens,
                members: Default::default(),
            });
        }
    }

    for i in 0..entities.len() {
        if let Some(c) = entities[i].container {
            let name = entities[i].name.clone();
            entities[c.index()].members.insert(name);
        }
    }

    tracing::debug!(
        "Extracted {} entities from {} snapshot",
        entities.len(),
        side.as_str()
    );
    EntityModel::new(side, entities)
}
