//! Tree-pattern queries with compiled predicates.
//!
//! A [`Query`] hands the engine a predicate-stripped copy of the pattern text
//! and keeps the predicate pipeline to itself: the scanner lifts raw step
//! streams out of the source, the compiler turns them into typed specs at
//! construction time, and every produced match is filtered through the
//! evaluator against its own captures before callers see it.

mod assemble;
mod eval;
mod predicate;
mod scan;

#[cfg(test)]
mod query_tests;

use std::ops::Range as ByteRange;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tree_sitter as ts;

use crate::error::QueryError;
use crate::language::Language;
use crate::native;
use crate::node::SyntaxNode;
use crate::point::Point;

use eval::ResolvedCapture;
use predicate::CompiledPattern;

pub use predicate::Properties;

/// Options for one query run. Unset means unrestricted.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub(crate) byte_range: Option<ByteRange<usize>>,
    pub(crate) point_range: Option<ByteRange<Point>>,
    pub(crate) match_limit: Option<u32>,
    pub(crate) max_start_depth: Option<u32>,
    pub(crate) timeout_micros: Option<u64>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the search window to a byte range.
    pub fn byte_range(mut self, range: ByteRange<usize>) -> Self {
        self.byte_range = Some(range);
        self
    }

    /// Restrict the search window to a point range.
    pub fn point_range(mut self, range: ByteRange<Point>) -> Self {
        self.point_range = Some(range);
        self
    }

    /// Cap the number of in-flight matches the engine tracks. Overrunning the
    /// cap drops match states; the query reports it through
    /// [`Query::did_exceed_match_limit`].
    pub fn match_limit(mut self, limit: u32) -> Self {
        self.match_limit = Some(limit);
        self
    }

    /// Cap the depth at which a pattern's root may start. Nested sub-patterns
    /// are not restricted.
    pub fn max_start_depth(mut self, depth: u32) -> Self {
        self.max_start_depth = Some(depth);
        self
    }

    /// Execution budget in microseconds; expiry yields the partial result set
    /// produced so far.
    pub fn timeout_micros(mut self, micros: u64) -> Self {
        self.timeout_micros = Some(micros);
        self
    }
}

/// A named binding of one pattern sub-part to a matched node.
#[derive(Debug, Clone)]
pub struct QueryCapture {
    pub name: String,
    pub node: SyntaxNode,
    pub set_properties: Option<Arc<Properties>>,
    pub asserted_properties: Option<Arc<Properties>>,
    pub refuted_properties: Option<Arc<Properties>>,
}

/// One surviving match: the pattern index, its captures in order, and any
/// properties the pattern declared.
#[derive(Debug, Clone)]
pub struct QueryMatch {
    pub pattern_index: usize,
    pub captures: Vec<QueryCapture>,
    pub set_properties: Option<Arc<Properties>>,
    pub asserted_properties: Option<Arc<Properties>>,
    pub refuted_properties: Option<Arc<Properties>>,
}

impl QueryMatch {
    /// Nodes captured under the given name, in capture order.
    pub fn nodes_for_capture(&self, name: &str) -> Vec<&SyntaxNode> {
        self.captures
            .iter()
            .filter(|c| c.name == name)
            .map(|c| &c.node)
            .collect()
    }
}

/// A compiled query: the engine's structural matcher plus the predicate
/// specs and property maps derived once at construction.
pub struct Query {
    language: Language,
    ts: ts::Query,
    capture_names: Vec<String>,
    patterns: Vec<CompiledPattern>,
    exceeded: AtomicBool,
}

impl Query {
    /// Compile a query against a language. Structural errors come from the
    /// engine; malformed predicates are rejected here with an error naming
    /// the offending operator.
    pub fn new(language: &Language, source: &str) -> Result<Self, QueryError> {
        let extraction = scan::extract(source)?;
        let ts_query = ts::Query::new(language.ts(), &extraction.stripped)?;

        let mut compiled_forms = Vec::with_capacity(extraction.forms.len());
        for form in &extraction.forms {
            compiled_forms.push((form.span.clone(), predicate::compile(&form.streams)?));
        }

        // Patterns are tied back to their enclosing top-level form by start
        // offset; blanking preserved offsets, so containment is exact. A form
        // expanding to several patterns shares its predicates across them.
        let patterns = (0..ts_query.pattern_count())
            .map(|index| {
                let start = ts_query.start_byte_for_pattern(index);
                compiled_forms
                    .iter()
                    .find(|(span, _)| span.contains(&start))
                    .map(|(_, compiled)| compiled.clone())
                    .unwrap_or_default()
            })
            .collect::<Vec<_>>();

        let capture_names = ts_query
            .capture_names()
            .iter()
            .map(|name| (*name).to_owned())
            .collect();

        tracing::debug!(
            patterns = patterns.len(),
            predicates = patterns.iter().map(|p| p.predicates.len()).sum::<usize>(),
            "compiled query"
        );

        Ok(Self {
            language: language.clone(),
            ts: ts_query,
            capture_names,
            patterns,
            exceeded: AtomicBool::new(false),
        })
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    pub fn capture_names(&self) -> &[String] {
        &self.capture_names
    }

    /// Whether the most recent run overran its match limit. Overrun is not an
    /// error: the run still returned the matches the engine produced.
    pub fn did_exceed_match_limit(&self) -> bool {
        self.exceeded.load(Ordering::Relaxed)
    }

    /// `#set!` properties declared by a pattern.
    pub fn set_properties(&self, pattern_index: usize) -> Option<&Properties> {
        self.patterns[pattern_index].set_properties.as_deref()
    }

    /// `#is?` properties declared by a pattern.
    pub fn asserted_properties(&self, pattern_index: usize) -> Option<&Properties> {
        self.patterns[pattern_index].asserted_properties.as_deref()
    }

    /// `#is-not?` properties declared by a pattern.
    pub fn refuted_properties(&self, pattern_index: usize) -> Option<&Properties> {
        self.patterns[pattern_index].refuted_properties.as_deref()
    }

    /// Permanently disable a capture; its bindings stop appearing in results.
    pub fn disable_capture(&mut self, name: &str) {
        self.ts.disable_capture(name);
    }

    /// Permanently disable a pattern.
    pub fn disable_pattern(&mut self, pattern_index: usize) {
        self.ts.disable_pattern(pattern_index);
    }

    /// All surviving matches under `node`, in the engine's match order.
    pub fn matches(&self, node: &SyntaxNode, options: &QueryOptions) -> Vec<QueryMatch> {
        let (stream, nodes) = self.run(node, options, native::run_matches);

        let mut results = Vec::new();
        for decoded in assemble::decode(&stream.entries, nodes) {
            let pattern = &self.patterns[decoded.pattern_index];
            let captures = self.bind_captures(decoded.captures);
            if !self.filter(pattern, &captures) {
                continue;
            }
            results.push(QueryMatch {
                pattern_index: decoded.pattern_index,
                captures,
                set_properties: pattern.set_properties.clone(),
                asserted_properties: pattern.asserted_properties.clone(),
                refuted_properties: pattern.refuted_properties.clone(),
            });
        }

        tracing::debug!(
            matches = results.len(),
            exceeded = self.did_exceed_match_limit(),
            "query matches"
        );
        results
    }

    /// All surviving captures under `node`, in the order the engine reports
    /// them. Predicates are evaluated over each entry's full match, not just
    /// the yielded capture.
    pub fn captures(&self, node: &SyntaxNode, options: &QueryOptions) -> Vec<QueryCapture> {
        let (stream, nodes) = self.run(node, options, native::run_captures);

        let mut results = Vec::new();
        for decoded in assemble::decode(&stream.entries, nodes) {
            let pattern = &self.patterns[decoded.pattern_index];
            let captures = self.bind_captures(decoded.captures);
            if !self.filter(pattern, &captures) {
                continue;
            }
            let index = decoded.yield_index.expect("capture streams carry an index");
            let mut capture = captures
                .into_iter()
                .nth(index)
                .expect("yield index within the match's captures");
            capture.set_properties = pattern.set_properties.clone();
            capture.asserted_properties = pattern.asserted_properties.clone();
            capture.refuted_properties = pattern.refuted_properties.clone();
            results.push(capture);
        }
        results
    }

    fn run(
        &self,
        node: &SyntaxNode,
        options: &QueryOptions,
        exec: impl FnOnce(
            &ts::Tree,
            &mut crate::channel::ScratchChannel,
            &ts::Query,
            &QueryOptions,
            &dyn Fn(ByteRange<usize>) -> String,
        ) -> native::RawStream,
    ) -> (native::RawStream, Vec<SyntaxNode>) {
        let core = node.core();
        assert!(
            self.language.same(&core.language),
            "query language does not match the node's tree"
        );

        let stream = {
            let ts_tree = core.ts.read();
            let mut channel = core.channel.lock();
            channel.write_node(&node.handle(), 0);
            let text = |range: ByteRange<usize>| core.text.slice(range);
            exec(&*ts_tree, &mut *channel, &self.ts, options, &text)
        };
        self.exceeded.store(stream.exceeded, Ordering::Relaxed);

        let nodes = core
            .cache
            .lock()
            .materialize_batch(&core, &stream.nodes)
            .into_iter()
            .map(|node| node.expect("capture nodes are never null"))
            .collect();
        (stream, nodes)
    }

    fn bind_captures(&self, raw: Vec<(u32, SyntaxNode)>) -> Vec<QueryCapture> {
        raw.into_iter()
            .map(|(name_index, node)| QueryCapture {
                name: self.capture_names[name_index as usize].clone(),
                node,
                set_properties: None,
                asserted_properties: None,
                refuted_properties: None,
            })
            .collect()
    }

    /// Apply a pattern's predicates to one match's captures.
    fn filter(&self, pattern: &CompiledPattern, captures: &[QueryCapture]) -> bool {
        if pattern.predicates.is_empty() {
            return true;
        }
        let texts: Vec<String> = captures.iter().map(|c| c.node.text()).collect();
        let resolved: Vec<ResolvedCapture<'_>> = captures
            .iter()
            .zip(&texts)
            .map(|(capture, text)| ResolvedCapture {
                name: &capture.name,
                text,
            })
            .collect();
        eval::passes(&pattern.predicates, &resolved)
    }
}

impl std::fmt::Debug for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("patterns", &self.patterns.len())
            .field("captures", &self.capture_names)
            .finish_non_exhaustive()
    }
}
