//! Language wrapper: an engine grammar plus its kind table.

use std::sync::Arc;

use graft_core::{KindTable, NodeFieldId};
use tree_sitter as ts;

use crate::error::LanguageError;

/// A loaded grammar together with the accessor registry derived from its
/// node-types description. Building the registry happens once here; every
/// tree parsed with this language shares it.
///
/// Cheap to clone (shared allocation).
#[derive(Clone)]
pub struct Language {
    inner: Arc<LanguageInner>,
}

struct LanguageInner {
    ts: ts::Language,
    kinds: KindTable,
}

impl Language {
    /// Wrap an engine grammar, deriving the kind table from its
    /// `node-types.json` content (grammar crates export it as `NODE_TYPES`).
    pub fn new(
        language: impl Into<ts::Language>,
        node_types_json: &str,
    ) -> Result<Self, LanguageError> {
        let ts: ts::Language = language.into();
        let raw = graft_core::parse_node_types(node_types_json)?;

        let kinds = KindTable::build(
            &raw,
            |name, named| {
                let id = ts.id_for_node_kind(name, named);
                // 0 means "not found" for named symbols.
                (id != 0).then_some(id)
            },
            |name| ts.field_id_for_name(name),
        );

        tracing::debug!(kinds = kinds.len(), "built kind table");
        Ok(Self {
            inner: Arc::new(LanguageInner { ts, kinds }),
        })
    }

    /// Display name for a kind id, if the grammar defines one.
    pub fn node_kind_for_id(&self, kind_id: u16) -> Option<&'static str> {
        self.inner.ts.node_kind_for_id(kind_id)
    }

    /// Kind id for a node kind name; 0 is "not found" for named symbols.
    pub fn id_for_node_kind(&self, kind: &str, named: bool) -> Option<u16> {
        let id = self.inner.ts.id_for_node_kind(kind, named);
        (id != 0).then_some(id)
    }

    /// Engine field id for a field name.
    pub fn field_id_for_name(&self, name: &str) -> Option<NodeFieldId> {
        self.inner.ts.field_id_for_name(name)
    }

    /// Number of distinct node kinds in the grammar.
    pub fn node_kind_count(&self) -> usize {
        self.inner.ts.node_kind_count()
    }

    /// Two `Language` values compare equal when they share the same loaded
    /// grammar instance. Handles are only meaningful within one language.
    pub fn same(&self, other: &Language) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn ts(&self) -> &ts::Language {
        &self.inner.ts
    }

    pub(crate) fn kinds(&self) -> &KindTable {
        &self.inner.kinds
    }
}

impl std::fmt::Debug for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Language")
            .field("node_kinds", &self.node_kind_count())
            .field("table_entries", &self.inner.kinds.len())
            .finish()
    }
}
