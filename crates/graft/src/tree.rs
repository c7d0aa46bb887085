//! Tree host objects and their source-text accessors.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tree_sitter as ts;

use crate::cache::NodeCache;
use crate::channel::ScratchChannel;
use crate::language::Language;
use crate::native;
use crate::node::SyntaxNode;
use crate::point::{InputEdit, Point, Range};

/// External mutable text storage a tree can be parsed from. The tree keeps
/// the buffer alive and reads node text back through it on demand.
pub trait TextBuffer: Send + Sync {
    fn len(&self) -> usize;

    /// Text chunk starting at `offset`; `None` at or past the end.
    fn chunk_at(&self, offset: usize) -> Option<String>;
}

/// How a tree reads its source text back.
pub(crate) enum SourceText {
    Owned(String),
    Chunks(Arc<dyn Fn(usize) -> Option<String> + Send + Sync>),
    Buffer(Arc<dyn TextBuffer>),
}

impl SourceText {
    /// Extract the text of a byte range, pulling chunked sources until the
    /// goal length is reached.
    pub(crate) fn slice(&self, range: std::ops::Range<usize>) -> String {
        if range.end <= range.start {
            return String::new();
        }
        match self {
            SourceText::Owned(text) => text
                .as_bytes()
                .get(range)
                .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
                .unwrap_or_default(),
            SourceText::Chunks(read) => {
                assemble(range, |offset| read(offset))
            }
            SourceText::Buffer(buffer) => {
                assemble(range, |offset| buffer.chunk_at(offset))
            }
        }
    }
}

fn assemble(
    range: std::ops::Range<usize>,
    read: impl Fn(usize) -> Option<String>,
) -> String {
    let goal = range.end - range.start;
    let mut bytes = Vec::with_capacity(goal);
    while bytes.len() < goal {
        match read(range.start + bytes.len()) {
            Some(chunk) if !chunk.is_empty() => bytes.extend_from_slice(chunk.as_bytes()),
            _ => break,
        }
    }
    bytes.truncate(goal);
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Shared state behind one parsed tree: the engine tree, the language used to
/// parse it, the text accessor, the wrapper cache, and the scratch channel
/// every marshal operation for this tree runs through. The locks serialize
/// marshaling; edits take the write side, so a tree is never edited while a
/// marshal call is reading it.
pub(crate) struct TreeCore {
    pub(crate) ts: RwLock<ts::Tree>,
    pub(crate) language: Language,
    pub(crate) text: SourceText,
    pub(crate) cache: Mutex<NodeCache>,
    pub(crate) channel: Mutex<ScratchChannel>,
}

/// A parsed syntax tree.
///
/// Clones share the same underlying tree. The tree is dropped once no clone
/// and no caller-held reference remains; wrappers hold only weak
/// back-references and do not keep it alive.
#[derive(Clone)]
pub struct Tree {
    pub(crate) core: Arc<TreeCore>,
}

impl Tree {
    pub(crate) fn new(ts_tree: ts::Tree, language: Language, text: SourceText) -> Self {
        Self {
            core: Arc::new(TreeCore {
                ts: RwLock::new(ts_tree),
                language,
                text,
                cache: Mutex::new(NodeCache::new()),
                channel: Mutex::new(ScratchChannel::new()),
            }),
        }
    }

    pub fn language(&self) -> &Language {
        &self.core.language
    }

    pub fn root_node(&self) -> SyntaxNode {
        let handle = {
            let ts = self.core.ts.read();
            let mut channel = self.core.channel.lock();
            native::root(&ts, &mut channel)
        };
        self.core
            .cache
            .lock()
            .materialize(&self.core, handle)
            .expect("tree has a root node")
    }

    /// Root node with all positions shifted by the given offset, for trees
    /// parsed out of a larger document.
    pub fn root_node_with_offset(&self, offset_bytes: usize, offset_extent: Point) -> SyntaxNode {
        let handle = {
            let ts = self.core.ts.read();
            let mut channel = self.core.channel.lock();
            native::root_with_offset(&ts, &mut channel, offset_bytes, offset_extent)
        };
        self.core
            .cache
            .lock()
            .materialize(&self.core, handle)
            .expect("tree has a root node")
    }

    /// Record a text edit: the engine tree is adjusted in place and every
    /// cached wrapper's context is shifted with it. Identities never change;
    /// reconciling structure requires a re-parse against this tree.
    pub fn edit(&self, edit: &InputEdit) {
        {
            let mut ts = self.core.ts.write();
            ts.edit(&edit.to_ts());
        }
        self.core.cache.lock().shift_all(edit);
    }

    /// Ranges whose syntactic structure changed between this tree and
    /// `other` (a re-parse of it).
    pub fn changed_ranges(&self, other: &Tree) -> Vec<Range> {
        let this = self.core.ts.read();
        let that = other.core.ts.read();
        this.changed_ranges(&that).map(Range::from_ts).collect()
    }

    /// Source text of a byte range, through this tree's text accessor.
    pub fn text_in_range(&self, range: std::ops::Range<usize>) -> String {
        self.core.text.slice(range)
    }

    #[cfg(test)]
    pub(crate) fn cached_node_count(&self) -> usize {
        self.core.cache.lock().len()
    }
}

impl PartialEq for Tree {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.core, &other.core)
    }
}

impl Eq for Tree {}

impl std::fmt::Debug for Tree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tree")
            .field("language", &self.core.language)
            .finish_non_exhaustive()
    }
}
