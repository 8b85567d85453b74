//! Graph line parameter expansion.
//!
//! Expansion is a collaborator of the parser: given a parameter table it maps
//! one line to the set of lines with every `<...>` group substituted. Offsets
//! that run off the end of a value list substitute a removal sentinel into
//! the node name; the pair processor truncates chains at such nodes.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::GraphError;

/// Sentinel substituted for an out-of-range parameter offset.
pub const REMOVE_MARKER: &str = "-32768";

/// True if the line contains a parameter group to expand.
pub fn contains_parameters(line: &str) -> bool {
    find_groups(line).next().is_some()
}

pub trait ParameterExpander {
    /// Expand one whitespace-free graph line over the parameter table.
    /// Undefined parameters and out-of-range specific values are fatal.
    fn expand(&self, line: &str) -> Result<Vec<String>, GraphError>;
}

/// Expander for workflows with no parameters: any `<...>` group is an error.
#[derive(Debug, Default)]
pub struct NullExpander;

impl ParameterExpander for NullExpander {
    fn expand(&self, line: &str) -> Result<Vec<String>, GraphError> {
        if let Some(group) = find_groups(line).next() {
            return Err(undefined(first_name(group), group, line));
        }
        Ok(vec![line.to_string()])
    }
}

/// Table-driven expander. Each parameter has an ordered value list; a group
/// item is `name`, `name=value` or `name<sign><digits>` (index offset).
/// Substitution renders `_namevalue` per item, e.g. `sim<m,n>` with m=1, n=2
/// becomes `sim_m1_n2`.
#[derive(Debug, Default, Clone)]
pub struct TableExpander {
    params: BTreeMap<String, Vec<String>>,
}

impl TableExpander {
    pub fn new(params: BTreeMap<String, Vec<String>>) -> Self {
        TableExpander { params }
    }

    pub fn with_param(mut self, name: &str, values: &[&str]) -> Self {
        self.params
            .insert(name.to_string(), values.iter().map(|v| v.to_string()).collect());
        self
    }
}

impl ParameterExpander for TableExpander {
    fn expand(&self, line: &str) -> Result<Vec<String>, GraphError> {
        // Validate all groups and collect iterated parameters in order found.
        let mut used = Vec::new();
        for group in find_groups(line) {
            for item in group.split(',') {
                let (name, suffix) = split_item(item);
                let Some(values) = self.params.get(name) else {
                    return Err(undefined(name, group, line));
                };
                if let Some(value) = suffix.strip_prefix('=') {
                    if !values.iter().any(|v| v == value) {
                        return Err(GraphError::semantic(
                            "S101",
                            format!("parameter {name} out of range: <{group}>"),
                        ));
                    }
                }
                if !used.iter().any(|(n, _)| n == name) {
                    used.push((name.to_string(), values.clone()));
                }
            }
        }
        if used.is_empty() {
            return Ok(vec![line.to_string()]);
        }

        let mut lines = BTreeSet::new();
        let mut current = BTreeMap::new();
        self.expand_rec(line, &used, 0, &mut current, &mut lines)?;
        Ok(lines.into_iter().collect())
    }
}

impl TableExpander {
    fn expand_rec(
        &self,
        line: &str,
        used: &[(String, Vec<String>)],
        depth: usize,
        current: &mut BTreeMap<String, String>,
        lines: &mut BTreeSet<String>,
    ) -> Result<(), GraphError> {
        if depth == used.len() {
            lines.insert(self.substitute(line, current)?);
            return Ok(());
        }
        let (name, values) = &used[depth];
        for value in values {
            current.insert(name.clone(), value.clone());
            self.expand_rec(line, used, depth + 1, current, lines)?;
        }
        Ok(())
    }

    fn substitute(
        &self,
        line: &str,
        values: &BTreeMap<String, String>,
    ) -> Result<String, GraphError> {
        let mut out = line.to_string();
        for group in find_groups(line) {
            let mut repl = String::new();
            for item in group.split(',') {
                let (name, suffix) = split_item(item);
                let value = if let Some(pinned) = suffix.strip_prefix('=') {
                    pinned.to_string()
                } else if suffix.is_empty() {
                    values[name].clone()
                } else {
                    // Index offset relative to the current value.
                    let list = &self.params[name];
                    let offset: i64 = suffix.parse().map_err(|_| {
                        GraphError::semantic(
                            "S102",
                            format!("bad parameter offset '{item}' in <{group}>"),
                        )
                    })?;
                    let cur = list.iter().position(|v| v == &values[name]).unwrap_or(0) as i64;
                    match usize::try_from(cur + offset).ok().and_then(|i| list.get(i)) {
                        Some(v) => v.clone(),
                        None => REMOVE_MARKER.to_string(),
                    }
                };
                repl.push('_');
                repl.push_str(name);
                repl.push_str(&value);
            }
            out = out.replace(&format!("<{group}>"), &repl);
        }
        Ok(out)
    }
}

/// Iterate over the inner text of each `<...>` group.
fn find_groups(line: &str) -> impl Iterator<Item = &str> {
    line.split('<').skip(1).filter_map(|rest| {
        rest.split_once('>').map(|(inner, _)| inner)
    })
}

/// Split a group item into (name, suffix) where suffix is "", "=value" or a
/// signed offset.
fn split_item(item: &str) -> (&str, &str) {
    let end = item
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '_'))
        .map(|(i, _)| i)
        .unwrap_or(item.len());
    (&item[..end], &item[end..])
}

fn first_name(group: &str) -> &str {
    split_item(group.split(',').next().unwrap_or(group)).0
}

fn undefined(name: &str, group: &str, line: &str) -> GraphError {
    GraphError::semantic(
        "S100",
        format!("parameter {name} is not defined in <{group}>: {line}"),
    )
}
