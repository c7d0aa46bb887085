//! Parser host object.

use std::sync::Arc;
use std::time::Instant;

use tree_sitter as ts;

use crate::error::LanguageError;
use crate::language::Language;
use crate::tree::{SourceText, TextBuffer, Tree};

/// Cooperative time-slice budget for the asynchronous parse variant.
const PARSE_SLICE_MICROS: u64 = 2_000;

/// Wraps an engine parser together with the language assigned to it.
///
/// Parsing is synchronous; a microsecond timeout turns an over-budget parse
/// into `None`, and the engine resumes from its internal checkpoint on the
/// next call unless [`reset`](Parser::reset) discards it. The one
/// asynchronous variant, [`parse_buffer_async`](Parser::parse_buffer_async),
/// runs the same engine in cooperative slices.
pub struct Parser {
    ts: ts::Parser,
    language: Option<Language>,
}

impl Parser {
    pub fn new() -> Self {
        Self {
            ts: ts::Parser::new(),
            language: None,
        }
    }

    /// Assign the language used by subsequent parses.
    pub fn set_language(&mut self, language: &Language) -> Result<(), LanguageError> {
        self.ts.set_language(language.ts())?;
        self.language = Some(language.clone());
        Ok(())
    }

    pub fn language(&self) -> Option<&Language> {
        self.language.as_ref()
    }

    /// Maximum parse duration in microseconds; 0 means no limit.
    pub fn set_timeout_micros(&mut self, timeout_micros: u64) {
        self.ts.set_timeout_micros(timeout_micros);
    }

    pub fn timeout_micros(&self) -> u64 {
        self.ts.timeout_micros()
    }

    /// Discard the engine's resume checkpoint from a timed-out parse.
    pub fn reset(&mut self) {
        self.ts.reset();
    }

    fn assigned_language(&self) -> Language {
        self.language
            .clone()
            .expect("parser has no language assigned")
    }

    /// Parse a string. `old_tree` enables incremental re-parse after edits.
    /// `None` means the timeout elapsed before the parse finished.
    pub fn parse(&mut self, source: impl Into<String>, old_tree: Option<&Tree>) -> Option<Tree> {
        let language = self.assigned_language();
        let source = source.into();

        let tree = {
            let old = old_tree.map(|t| t.core.ts.read());
            let old_ref = old.as_ref().map(|guard| &**guard);
            self.ts.parse(source.as_bytes(), old_ref)?
        };

        tracing::debug!(
            bytes = source.len(),
            incremental = old_tree.is_some(),
            "parsed source string"
        );
        Some(Tree::new(tree, language, SourceText::Owned(source)))
    }

    /// Parse from a chunk-producing function: called with a byte offset, it
    /// returns the text starting there (`None` or an empty chunk ends the
    /// input). The tree retains the function as its text accessor.
    pub fn parse_with<F>(&mut self, read: F, old_tree: Option<&Tree>) -> Option<Tree>
    where
        F: Fn(usize) -> Option<String> + Send + Sync + 'static,
    {
        let language = self.assigned_language();
        let read: Arc<dyn Fn(usize) -> Option<String> + Send + Sync> = Arc::new(read);

        let tree = {
            let chunks = Arc::clone(&read);
            let mut callback =
                move |offset: usize, _position: ts::Point| chunks(offset).unwrap_or_default();
            let old = old_tree.map(|t| t.core.ts.read());
            let old_ref = old.as_ref().map(|guard| &**guard);
            self.ts.parse_with(&mut callback, old_ref)?
        };

        Some(Tree::new(tree, language, SourceText::Chunks(read)))
    }

    /// Parse from an external text buffer. The tree keeps the buffer alive
    /// and reads node text back through it.
    pub fn parse_buffer(
        &mut self,
        buffer: Arc<dyn TextBuffer>,
        old_tree: Option<&Tree>,
    ) -> Option<Tree> {
        let language = self.assigned_language();

        let tree = {
            let source = Arc::clone(&buffer);
            let mut callback = move |offset: usize, _position: ts::Point| {
                source.chunk_at(offset).unwrap_or_default()
            };
            let old = old_tree.map(|t| t.core.ts.read());
            let old_ref = old.as_ref().map(|guard| &**guard);
            self.ts.parse_with(&mut callback, old_ref)?
        };

        Some(Tree::new(tree, language, SourceText::Buffer(buffer)))
    }

    /// Asynchronous variant of [`parse_buffer`](Parser::parse_buffer): the
    /// engine runs in cooperative time slices, yielding to the executor
    /// between slices and resuming from its checkpoint, so a large parse does
    /// not monopolize the task. Completes synchronously when the first slice
    /// suffices. An assigned overall timeout still applies; expiry resolves
    /// to `None` with partial progress discarded by the next [`reset`].
    pub async fn parse_buffer_async(
        &mut self,
        buffer: Arc<dyn TextBuffer>,
        old_tree: Option<&Tree>,
    ) -> Option<Tree> {
        let language = self.assigned_language();
        let overall = self.ts.timeout_micros();
        let started = Instant::now();

        loop {
            let slice = if overall == 0 {
                PARSE_SLICE_MICROS
            } else {
                let elapsed = started.elapsed().as_micros() as u64;
                if elapsed >= overall {
                    self.ts.set_timeout_micros(overall);
                    return None;
                }
                PARSE_SLICE_MICROS.min(overall - elapsed)
            };
            self.ts.set_timeout_micros(slice);

            let parsed = {
                let source = Arc::clone(&buffer);
                let mut callback = move |offset: usize, _position: ts::Point| {
                    source.chunk_at(offset).unwrap_or_default()
                };
                let old = old_tree.map(|t| t.core.ts.read());
                let old_ref = old.as_ref().map(|guard| &**guard);
                self.ts.parse_with(&mut callback, old_ref)
            };

            if let Some(tree) = parsed {
                self.ts.set_timeout_micros(overall);
                return Some(Tree::new(tree, language, SourceText::Buffer(buffer)));
            }

            tokio::task::yield_now().await;
        }
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Parser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parser")
            .field("language", &self.language)
            .finish_non_exhaustive()
    }
}
