#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core node-type data structures for graft.
//!
//! Two layers:
//! - **Deserialization layer**: 1:1 mapping to `node-types.json`
//! - **Kind table**: ID-indexed accessor registry used by the binding to
//!   dispatch field access on node wrappers
//!
//! This crate is engine-independent: name→ID resolution is injected through
//! closures so the table can be built against any loaded grammar.

use std::collections::HashMap;
use std::num::NonZeroU16;

// ============================================================================
// Deserialization Layer
// ============================================================================

/// Raw node definition from `node-types.json`.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct RawNode {
    #[serde(rename = "type")]
    pub type_name: String,
    pub named: bool,
    #[serde(default)]
    pub root: bool,
    #[serde(default)]
    pub extra: bool,
    #[serde(default)]
    pub fields: HashMap<String, RawCardinality>,
    pub children: Option<RawCardinality>,
    pub subtypes: Option<Vec<RawTypeRef>>,
}

/// Cardinality constraints for a field or children slot.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct RawCardinality {
    pub multiple: bool,
    pub required: bool,
    pub types: Vec<RawTypeRef>,
}

/// Reference to a node type.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct RawTypeRef {
    #[serde(rename = "type")]
    pub type_name: String,
    pub named: bool,
}

/// Parse `node-types.json` content into raw nodes.
pub fn parse_node_types(json: &str) -> Result<Vec<RawNode>, serde_json::Error> {
    serde_json::from_str(json)
}

// ============================================================================
// Common Types
// ============================================================================

/// Node kind ID (tree-sitter uses u16).
pub type NodeTypeId = u16;

/// Field ID (tree-sitter uses NonZeroU16).
pub type NodeFieldId = NonZeroU16;

/// Cardinality info for a field or children slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cardinality {
    pub multiple: bool,
    pub required: bool,
}

// ============================================================================
// Kind Table
// ============================================================================

/// One field accessor on a node kind.
///
/// `multiple` decides the accessor shape: singular accessors resolve to one
/// child (or none) through the engine's child-for-field-id operation, plural
/// accessors to an ordered child sequence through children-for-field-id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldAccessor {
    /// Field name as declared by the grammar.
    pub name: String,
    /// Engine field ID resolved at table-build time.
    pub field_id: NodeFieldId,
    /// Whether the grammar marks this field as repeatable.
    pub multiple: bool,
}

/// Accessor metadata for one named grammar symbol.
#[derive(Debug, Clone, Default)]
pub struct NodeKind {
    /// Display name of the symbol.
    pub name: String,
    /// Accessors sorted by field name.
    pub accessors: Vec<FieldAccessor>,
}

impl NodeKind {
    /// Look up an accessor by field name (binary search).
    pub fn accessor(&self, field_name: &str) -> Option<&FieldAccessor> {
        self.accessors
            .binary_search_by(|a| a.name.as_str().cmp(field_name))
            .ok()
            .map(|idx| &self.accessors[idx])
    }

    /// Sorted field-accessor names.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.accessors.iter().map(|a| a.name.as_str())
    }
}

/// Kind-ID-indexed accessor registry for one grammar.
///
/// Built once per language at load time and shared by every tree parsed with
/// that language. Anonymous symbols and the synthetic error symbol have no
/// entry; lookups for them fall back to a generic kind with no accessors.
#[derive(Debug, Clone, Default)]
pub struct KindTable {
    kinds: HashMap<NodeTypeId, NodeKind>,
    generic: NodeKind,
}

impl KindTable {
    /// Build the table from raw node-types records and ID resolution closures.
    ///
    /// `node_id_for_name` resolves a (type name, named) pair to a kind ID;
    /// `field_id_for_name` resolves a field name to an engine field ID.
    /// Records that fail to resolve are skipped: the grammar and its
    /// node-types file can disagree across engine versions, and an unresolved
    /// symbol simply keeps the generic kind.
    pub fn build<F, G>(raw_nodes: &[RawNode], node_id_for_name: F, field_id_for_name: G) -> Self
    where
        F: Fn(&str, bool) -> Option<NodeTypeId>,
        G: Fn(&str) -> Option<NodeFieldId>,
    {
        let mut kinds = HashMap::new();

        for raw in raw_nodes {
            if !raw.named {
                continue;
            }
            let Some(kind_id) = node_id_for_name(&raw.type_name, true) else {
                continue;
            };

            let mut accessors: Vec<FieldAccessor> = raw
                .fields
                .iter()
                .filter_map(|(field_name, card)| {
                    let field_id = field_id_for_name(field_name)?;
                    Some(FieldAccessor {
                        name: field_name.clone(),
                        field_id,
                        multiple: card.multiple,
                    })
                })
                .collect();
            accessors.sort_by(|a, b| a.name.cmp(&b.name));

            kinds.insert(
                kind_id,
                NodeKind {
                    name: raw.type_name.clone(),
                    accessors,
                },
            );
        }

        Self {
            kinds,
            generic: NodeKind::default(),
        }
    }

    /// Accessor metadata for a kind ID, falling back to the generic kind.
    pub fn get(&self, kind_id: NodeTypeId) -> &NodeKind {
        self.kinds.get(&kind_id).unwrap_or(&self.generic)
    }

    /// Whether a kind ID has a dedicated entry.
    pub fn contains(&self, kind_id: NodeTypeId) -> bool {
        self.kinds.contains_key(&kind_id)
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeTypeId, &NodeKind)> {
        self.kinds.iter().map(|(&id, kind)| (id, kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_JSON: &str = r#"[
        {
            "type": "function_declaration",
            "named": true,
            "fields": {
                "name": {
                    "multiple": false,
                    "required": true,
                    "types": [{"type": "identifier", "named": true}]
                },
                "body": {
                    "multiple": false,
                    "required": true,
                    "types": [{"type": "block", "named": true}]
                }
            }
        },
        {
            "type": "switch_body",
            "named": true,
            "fields": {
                "member": {
                    "multiple": true,
                    "required": false,
                    "types": [{"type": "switch_case", "named": true}]
                }
            }
        },
        {
            "type": "program",
            "named": true,
            "root": true,
            "fields": {},
            "children": {
                "multiple": true,
                "required": false,
                "types": [{"type": "statement", "named": true}]
            }
        },
        {
            "type": "comment",
            "named": true,
            "extra": true
        },
        {
            "type": "identifier",
            "named": true
        },
        {
            "type": "+",
            "named": false
        }
    ]"#;

    fn sample_table() -> KindTable {
        let raw = parse_node_types(SAMPLE_JSON).unwrap();

        let node_ids: HashMap<(&str, bool), NodeTypeId> = [
            (("function_declaration", true), 2),
            (("switch_body", true), 3),
            (("program", true), 4),
            (("comment", true), 5),
            (("identifier", true), 6),
            (("+", false), 7),
        ]
        .into_iter()
        .collect();

        let field_ids: HashMap<&str, NodeFieldId> = [
            ("name", NonZeroU16::new(1).unwrap()),
            ("body", NonZeroU16::new(2).unwrap()),
            ("member", NonZeroU16::new(3).unwrap()),
        ]
        .into_iter()
        .collect();

        KindTable::build(
            &raw,
            |name, named| node_ids.get(&(name, named)).copied(),
            |name| field_ids.get(name).copied(),
        )
    }

    #[test]
    fn parse_raw_nodes() {
        let nodes = parse_node_types(SAMPLE_JSON).unwrap();
        assert_eq!(nodes.len(), 6);

        let func = nodes
            .iter()
            .find(|n| n.type_name == "function_declaration")
            .unwrap();
        assert!(func.named);
        assert!(func.fields.contains_key("name"));
        assert!(func.fields.contains_key("body"));

        let plus = nodes.iter().find(|n| n.type_name == "+").unwrap();
        assert!(!plus.named);
    }

    #[test]
    fn build_named_kinds_only() {
        let table = sample_table();

        // "+" is anonymous and gets no entry; everything named resolves.
        assert_eq!(table.len(), 5);
        assert!(table.contains(2));
        assert!(!table.contains(7));
    }

    #[test]
    fn accessors_are_sorted_and_typed() {
        let table = sample_table();

        let func = table.get(2);
        assert_eq!(func.name, "function_declaration");
        let names: Vec<_> = func.field_names().collect();
        assert_eq!(names, vec!["body", "name"]);

        let name = func.accessor("name").unwrap();
        assert_eq!(name.field_id.get(), 1);
        assert!(!name.multiple);

        let member = table.get(3).accessor("member").unwrap();
        assert!(member.multiple);

        assert!(func.accessor("nope").is_none());
    }

    #[test]
    fn generic_fallback_has_no_accessors() {
        let table = sample_table();

        // Unknown and anonymous kinds share the generic entry.
        let generic = table.get(999);
        assert!(generic.name.is_empty());
        assert!(generic.accessor("name").is_none());

        // A named kind without field declarations still gets its own entry.
        let identifier = table.get(6);
        assert_eq!(identifier.name, "identifier");
        assert_eq!(identifier.accessors.len(), 0);
    }

    #[test]
    fn unresolved_symbols_are_skipped() {
        let raw = parse_node_types(SAMPLE_JSON).unwrap();
        let table = KindTable::build(&raw, |_, _| None, |_| None);
        assert!(table.is_empty());
    }

    #[test]
    fn unresolved_fields_are_skipped() {
        let raw = parse_node_types(SAMPLE_JSON).unwrap();
        let table = KindTable::build(
            &raw,
            |name, _| (name == "function_declaration").then_some(2),
            |name| (name == "name").then(|| NonZeroU16::new(1).unwrap()),
        );

        let func = table.get(2);
        assert_eq!(func.accessors.len(), 1);
        assert_eq!(func.accessors[0].name, "name");
    }
}
