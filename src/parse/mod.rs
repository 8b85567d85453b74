//! Graph section parsing: normalization, expansion and pair processing.
//!
//! [`GraphParser`] processes one cycling section's graph text and records,
//! per right-side task:
//!
//! * `triggers[task][expr]` = the leaf references of `expr` plus the suicide
//!   flag;
//! * `original[task][expr]` = the pre-family-expansion form of `expr`, kept
//!   so equivalent family and member expressions can be compared;
//! * output optionality maps for plain tasks and for family members
//!   (kept apart: member-derived records are weaker and coerce on conflict).

pub mod node;
pub mod normalize;
mod pairs;

use std::collections::BTreeMap;

use crate::config::CompilerConfig;
use crate::error::GraphError;
use crate::expand::ParameterExpander;

pub use normalize::{Normalized, PollingInfo, normalize_section};

/// A dependency expression leaf before trigger resolution.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum TriggerKey {
    Task {
        name: String,
        offset: Option<String>,
        output: String,
    },
    Xtrigger(String),
}

impl TriggerKey {
    /// The expression leaf token this key was scanned from.
    pub fn token(&self) -> String {
        match self {
            TriggerKey::Task {
                name,
                offset: Some(offset),
                output,
            } => format!("{name}[{offset}]:{output}"),
            TriggerKey::Task {
                name,
                offset: None,
                output,
            } => format!("{name}:{output}"),
            TriggerKey::Xtrigger(label) => format!("@{label}"),
        }
    }

    /// Parse an expression leaf token back into a key.
    pub fn parse(token: &str) -> Result<TriggerKey, GraphError> {
        if let Some(label) = token.strip_prefix('@') {
            return Ok(TriggerKey::Xtrigger(label.to_string()));
        }
        let tokens = node::scan_nodes(token);
        match tokens.as_slice() {
            [t] if t.qualifier.is_some() && !t.optional && t.raw() == token => {
                Ok(TriggerKey::Task {
                    name: t.name.clone(),
                    offset: t.offset.clone(),
                    output: t.qualifier.clone().unwrap_or_default(),
                })
            }
            _ => Err(GraphError::expression(
                "E002",
                format!("malformed trigger token: {token}"),
            )),
        }
    }
}

/// One recorded dependency expression for a right-side task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerExpr {
    pub refs: Vec<TriggerKey>,
    pub suicide: bool,
}

/// Accumulated results of parsing one graph section.
#[derive(Debug, Default)]
pub struct SectionParse {
    /// task -> expression text -> leaf refs and suicide flag.
    pub triggers: BTreeMap<String, BTreeMap<String, TriggerExpr>>,
    /// task -> expression text -> pre-family-expansion expression.
    pub original: BTreeMap<String, BTreeMap<String, String>>,
    /// Inter-workflow polling targets by local task name.
    pub polling: BTreeMap<String, PollingInfo>,
    /// (task, output) -> optional, from plain task references.
    pub task_output_opt: BTreeMap<(String, String), bool>,
    /// (task, output) -> optional, inferred from family triggers.
    pub memb_output_opt: BTreeMap<(String, String), bool>,
}

/// Parser for a single graph section's text.
pub struct GraphParser<'a> {
    pub(crate) config: &'a CompilerConfig,
    pub(crate) family_map: &'a BTreeMap<String, Vec<String>>,
    expander: &'a dyn ParameterExpander,
    pub(crate) results: SectionParse,
}

impl<'a> GraphParser<'a> {
    pub fn new(
        config: &'a CompilerConfig,
        family_map: &'a BTreeMap<String, Vec<String>>,
        expander: &'a dyn ParameterExpander,
    ) -> Self {
        GraphParser {
            config,
            family_map,
            expander,
            results: SectionParse::default(),
        }
    }

    /// Parse one graph section's raw text into the result tables.
    pub fn parse_graph(&mut self, text: &str) -> Result<(), GraphError> {
        let normalized = normalize_section(text)?;
        self.results.polling.extend(normalized.polling);
        self.process_lines(&normalized.lines)
    }

    pub fn finish(self) -> SectionParse {
        self.results
    }

    fn process_lines(&mut self, lines: &[String]) -> Result<(), GraphError> {
        use std::collections::BTreeSet;

        // Parameter expansion can replicate lines and, later, dependencies;
        // sets keep both unique and the iteration order deterministic.
        let mut line_set = BTreeSet::new();
        for line in lines {
            if crate::expand::contains_parameters(line) {
                line_set.extend(self.expander.expand(line)?);
            } else {
                line_set.insert(line.clone());
            }
        }

        let mut dep_pairs: BTreeSet<(Option<String>, String)> = BTreeSet::new();
        for line in &line_set {
            let mut chain: Vec<String> = Vec::new();
            for segment in line.split(normalize::ARROW) {
                if segment.is_empty() {
                    // "foo => => bar": kept so the pair stage reports it.
                    chain.push(String::new());
                    continue;
                }
                let cleaned = pairs::strip_out_of_range(segment);
                if cleaned.is_empty() {
                    // Out-of-range parameter offset truncates the chain.
                    break;
                }
                chain.push(cleaned);
            }
            let Some(first) = chain.first() else { continue };

            // Lone nodes and chain heads auto-trigger: they become
            // right-side nodes of prerequisite-free pairs.
            for token in node::scan_nodes(first) {
                if !token.is_action {
                    dep_pairs.insert((None, token.raw()));
                }
            }
            for window in chain.windows(2) {
                dep_pairs.insert((Some(window[0].clone()), window[1].clone()));
            }
        }

        for (left, right) in &dep_pairs {
            self.proc_dep_pair(left.as_deref(), right)?;
        }
        Ok(())
    }
}
