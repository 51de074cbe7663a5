use std::collections::{BTreeMap, BTreeSet};
use std::ops::ControlFlow;
use std::rc::Rc;

use hoard_kv::{prefix_end, Span};
use hoard_types::Oid;
use regex::bytes::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backend::QueryBackend;
use crate::config::QueryConfig;
use crate::error::{QueryError, QueryResult};
use crate::predicate::{Predicate, Query};

/// Outcome of a query: matching OIDs in ascending order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSet {
    pub ids: Vec<Oid>,
    pub offset: usize,
    pub count: usize,
    /// Total number of matches, when known.
    pub total: Option<usize>,
}

impl ResultSet {
    fn new(ids: Vec<Oid>) -> Self {
        Self {
            count: ids.len(),
            ids,
            offset: 0,
            total: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, oid: &Oid) -> bool {
        self.ids.binary_search(oid).is_ok()
    }
}

/// Evaluate `query` against `backend`.
pub fn execute<B>(backend: &B, query: &Query, config: &QueryConfig) -> QueryResult<ResultSet>
where
    B: QueryBackend + ?Sized,
{
    let ids = Evaluator { backend, config }.run(query)?;
    debug!(op = query.predicate.op(), results = ids.len(), "query evaluated");
    Ok(ResultSet::new(ids.into_iter().collect()))
}

/// OIDs a node is restricted to. `None` means the node scans the index.
type Candidates = Option<Rc<BTreeSet<Oid>>>;

struct Evaluator<'a, B: ?Sized> {
    backend: &'a B,
    config: &'a QueryConfig,
}

/// Pending combinator on the evaluation stack.
struct Frame<'q> {
    subs: &'q [Query],
    next: usize,
    limit: usize,
    candidates: Candidates,
    acc: Accumulator,
}

enum Accumulator {
    /// Match count per OID; an OID survives a round only if every completed
    /// round matched it once.
    And(BTreeMap<Oid, usize>),
    Or(BTreeSet<Oid>),
}

impl<'q> Frame<'q> {
    fn new(subs: &'q [Query], limit: usize, candidates: Candidates, acc: Accumulator) -> Self {
        Self {
            subs,
            next: 0,
            limit,
            candidates,
            acc,
        }
    }

    fn absorb(&mut self, result: BTreeSet<Oid>) {
        match &mut self.acc {
            Accumulator::And(counts) => {
                let round = self.next;
                for oid in result {
                    *counts.entry(oid).or_insert(0) += 1;
                }
                counts.retain(|_, count| *count >= round);
            }
            Accumulator::Or(union) => union.extend(result),
        }
    }

    /// Next subquery to run and the candidates it is restricted to, or
    /// `None` once this node is decided.
    fn next_child(&mut self) -> Option<(&'q Query, Candidates)> {
        let subs = self.subs;
        let query = subs.get(self.next)?;
        let candidates = match &self.acc {
            Accumulator::And(_) if self.next == 0 => self.candidates.clone(),
            Accumulator::And(counts) if counts.is_empty() => return None,
            Accumulator::And(counts) => Some(Rc::new(counts.keys().copied().collect())),
            Accumulator::Or(union) if union.len() >= self.limit => return None,
            Accumulator::Or(_) => self.candidates.clone(),
        };
        self.next += 1;
        Some((query, candidates))
    }

    /// Limit a child inherits when it leaves its own at zero. AND children
    /// run unbounded, since a later round may reject any early match.
    fn child_limit(&self) -> usize {
        match self.acc {
            Accumulator::And(_) => usize::MAX,
            Accumulator::Or(_) => self.limit,
        }
    }

    fn finish(self) -> BTreeSet<Oid> {
        match self.acc {
            Accumulator::And(counts) => counts.into_keys().take(self.limit).collect(),
            Accumulator::Or(union) => union.into_iter().take(self.limit).collect(),
        }
    }
}

impl<B: QueryBackend + ?Sized> Evaluator<'_, B> {
    /// Walk the predicate tree with an explicit stack so nesting depth is
    /// bounded by configuration rather than by the thread stack.
    fn run(&self, root: &Query) -> QueryResult<BTreeSet<Oid>> {
        let mut stack: Vec<Frame<'_>> = Vec::new();
        let mut launch = Some((root, None, self.config.default_limit));
        let mut finished: Option<BTreeSet<Oid>> = None;

        loop {
            if let Some((query, candidates, inherited)) = launch.take() {
                if stack.len() >= self.config.max_depth {
                    return Err(QueryError::TooDeep {
                        max: self.config.max_depth,
                    });
                }
                let limit = if query.limit == 0 {
                    inherited
                } else {
                    query.limit
                };
                match &query.predicate {
                    Predicate::And(subs) if subs.is_empty() => {
                        finished = Some(self.any(candidates.as_deref(), limit)?);
                    }
                    Predicate::And(subs) => stack.push(Frame::new(
                        subs,
                        limit,
                        candidates,
                        Accumulator::And(BTreeMap::new()),
                    )),
                    Predicate::Or(subs) => stack.push(Frame::new(
                        subs,
                        limit,
                        candidates,
                        Accumulator::Or(BTreeSet::new()),
                    )),
                    leaf => finished = Some(self.leaf(leaf, candidates.as_deref(), limit)?),
                }
            }

            let Some(frame) = stack.last_mut() else {
                return Ok(finished.unwrap_or_default());
            };
            if let Some(result) = finished.take() {
                frame.absorb(result);
            }
            match frame.next_child() {
                Some((child, candidates)) => {
                    let limit = frame.child_limit();
                    launch = Some((child, candidates, limit));
                }
                None => finished = stack.pop().map(Frame::finish),
            }
        }
    }

    fn leaf(
        &self,
        predicate: &Predicate,
        candidates: Option<&BTreeSet<Oid>>,
        limit: usize,
    ) -> QueryResult<BTreeSet<Oid>> {
        let (key, matcher) = match predicate {
            Predicate::None | Predicate::And(_) | Predicate::Or(_) => return Ok(BTreeSet::new()),
            Predicate::Any => return self.any(candidates, limit),
            Predicate::Eq { key, value } => (key, Matcher::Eq(value)),
            Predicate::Lt { key, value } => (key, Matcher::Lt(value)),
            Predicate::Gt { key, value } => (key, Matcher::Gt(value)),
            Predicate::Contains { key, value } => (key, Matcher::Contains(value)),
            Predicate::Regexp { key, regex } => (key, Matcher::Regexp(regex)),
            Predicate::In { key, values } => (key, Matcher::In(values)),
        };
        // Keys can never hold the separator byte.
        if key.as_bytes().contains(&0) {
            return Ok(BTreeSet::new());
        }
        match candidates {
            Some(candidates) => self.probe(key, &matcher, candidates, limit),
            None => self.scan_inverted(key, &matcher, limit),
        }
    }

    fn any(&self, candidates: Option<&BTreeSet<Oid>>, limit: usize) -> QueryResult<BTreeSet<Oid>> {
        if let Some(candidates) = candidates {
            return Ok(candidates.iter().take(limit).copied().collect());
        }
        let mut out = BTreeSet::new();
        if limit == 0 {
            return Ok(out);
        }
        self.backend.scan(&Span::all(), &mut |oid, _, _| {
            out.insert(oid);
            if out.len() >= limit {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })?;
        Ok(out)
    }

    /// Test only the given OIDs through point lookups.
    fn probe(
        &self,
        key: &str,
        matcher: &Matcher<'_>,
        candidates: &BTreeSet<Oid>,
        limit: usize,
    ) -> QueryResult<BTreeSet<Oid>> {
        let mut out = BTreeSet::new();
        for oid in candidates {
            if out.len() >= limit {
                break;
            }
            if let Some(value) = self.backend.get_value(oid, key)? {
                if matcher.matches(&value) {
                    out.insert(*oid);
                }
            }
        }
        debug!(key, probed = candidates.len(), matched = out.len(), "pruned predicate");
        Ok(out)
    }

    fn scan_inverted(
        &self,
        key: &str,
        matcher: &Matcher<'_>,
        limit: usize,
    ) -> QueryResult<BTreeSet<Oid>> {
        let mut out = BTreeSet::new();
        if limit == 0 {
            return Ok(out);
        }
        let span = matcher.span(key);
        let mut scanned = 0usize;
        self.backend.scan_inverted(&span, &mut |oid, entry_key, value| {
            scanned += 1;
            if entry_key == key.as_bytes() && matcher.matches(value) {
                out.insert(oid);
                if out.len() >= limit {
                    return ControlFlow::Break(());
                }
            }
            ControlFlow::Continue(())
        })?;
        debug!(key, ?span, scanned, matched = out.len(), "inverse scan");
        Ok(out)
    }
}

/// Value test for one comparison predicate.
enum Matcher<'q> {
    Eq(&'q [u8]),
    Lt(&'q [u8]),
    Gt(&'q [u8]),
    Contains(&'q [u8]),
    Regexp(&'q Regex),
    In(&'q [Vec<u8>]),
}

impl Matcher<'_> {
    fn matches(&self, value: &[u8]) -> bool {
        match self {
            Self::Eq(target) => value == *target,
            Self::Lt(target) => value < *target,
            Self::Gt(target) => value > *target,
            Self::Contains(needle) => {
                needle.is_empty() || value.windows(needle.len()).any(|w| w == *needle)
            }
            Self::Regexp(regex) => regex.is_match(value),
            Self::In(values) => values.iter().any(|v| v.as_slice() == value),
        }
    }

    /// Inverse-namespace span that can hold matches. Inverse keys sort by
    /// value within a tag key, so `=`, `<` and `>` narrow the scan.
    fn span(&self, key: &str) -> Span {
        let mut base = key.as_bytes().to_vec();
        base.push(0x00);
        match self {
            Self::Eq(target) => {
                let mut exact = base;
                exact.extend_from_slice(target);
                exact.push(0x00);
                Span::prefix(&exact)
            }
            Self::Lt(target) => {
                // Stored values hold no separator, so past a 0x00 in the
                // target only values equal to the part before it still sort
                // lower.
                let end = match target.iter().position(|&b| b == 0x00) {
                    Some(at) => [base.as_slice(), &target[..at], &[0x01u8][..]].concat(),
                    None => [base.as_slice(), target].concat(),
                };
                Span::new(base, Some(end))
            }
            Self::Gt(target) => {
                let end = prefix_end(&base);
                Span::new([base.as_slice(), target].concat(), end)
            }
            Self::Contains(_) | Self::Regexp(_) | Self::In(_) => Span::prefix(&base),
        }
    }
}
