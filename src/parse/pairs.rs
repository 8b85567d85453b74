//! Pair processing: per-pair validation, family substitution and trigger
//! recording.

use crate::error::GraphError;
use crate::expand::{REMOVE_MARKER, family};
use crate::outputs;
use crate::parse::node::{self, NodeToken};
use crate::parse::{GraphParser, TriggerExpr, TriggerKey};

/// Drop AND/OR members containing the out-of-range sentinel from one chain
/// segment. Returns "" when nothing survives.
pub(crate) fn strip_out_of_range(segment: &str) -> String {
    if !segment.contains(REMOVE_MARKER) {
        return segment.to_string();
    }
    let mut members: Vec<(Option<char>, &str)> = Vec::new();
    let mut start = 0;
    let mut op = None;
    for (i, c) in segment.char_indices() {
        if c == '&' || c == '|' {
            members.push((op, &segment[start..i]));
            op = Some(c);
            start = i + c.len_utf8();
        }
    }
    members.push((op, &segment[start..]));

    let mut out = String::new();
    for (op, member) in members {
        if member.contains(REMOVE_MARKER) {
            continue;
        }
        if !out.is_empty() {
            out.push(op.unwrap_or('&'));
        }
        out.push_str(member);
    }
    out
}

impl GraphParser<'_> {
    /// Process one dependency pair `left => right`.
    ///
    /// `left` is a logical expression of qualified nodes (or absent for
    /// auto-trigger pairs); `right` is one or more nodes joined by `&`.
    pub(crate) fn proc_dep_pair(
        &mut self,
        left: Option<&str>,
        right: &str,
    ) -> Result<(), GraphError> {
        if right.contains('|') {
            return Err(GraphError::semantic(
                "S001",
                format!("Illegal OR on right side: {right}"),
            ));
        }
        if let Some(left) = left {
            if left.contains(node::SUICIDE) {
                return Err(GraphError::semantic(
                    "S002",
                    format!("Suicide markers must be on the right of a trigger: {left}"),
                ));
            }
        }

        // Cycle point offsets are ignored on the right: every chain node is
        // processed as a left node of the next pair anyway.
        if right.contains('[') {
            return Ok(());
        }

        if let Some(left) = left {
            if left.matches('(').count() != left.matches(')').count() {
                return Err(GraphError::syntax(
                    "G008",
                    format!("Mismatched parentheses in: \"{left}\""),
                ));
            }
        }

        let rights: Vec<&str> = right.split('&').collect();
        if rights.iter().any(|r| r.is_empty()) {
            return Err(null_task(left, right));
        }

        // OR or parenthesized expressions stay whole; plain conjunctions
        // split into independent sub-expressions.
        let lefts: Vec<Option<&str>> = match left {
            None => vec![None],
            Some(l) if l.contains('|') || l.contains('(') => vec![Some(l)],
            Some(l) => l.split('&').map(Some).collect(),
        };
        if lefts.iter().any(|l| l.is_some_and(str::is_empty)) {
            return Err(null_task(left, right));
        }

        for l in lefts {
            self.compute_triggers(l, &rights)?;
        }
        Ok(())
    }

    /// Normalize one left sub-expression, substitute families, expand the
    /// `finished` pseudo-output and record the result for each right node.
    fn compute_triggers(&mut self, left: Option<&str>, rights: &[&str]) -> Result<(), GraphError> {
        let family_map = self.family_map;

        // Default and standardise qualifiers; the '?' marker is dropped (it
        // plays no part in trigger evaluation).
        let orig_expr = match left {
            Some(l) => node::rewrite_nodes(l, |t| t.qualified()),
            None => String::new(),
        };

        for token in node::scan_nodes(&orig_expr) {
            if token.is_action {
                continue;
            }
            let qualifier = token.qualifier.as_deref().unwrap_or_default();
            if family_map.contains_key(&token.name) {
                if family::member_trigger(qualifier).is_none() {
                    return Err(GraphError::semantic(
                        "S003",
                        format!("Bad family trigger in {orig_expr}"),
                    ));
                }
            } else if family::member_trigger(qualifier).is_some() {
                return Err(GraphError::semantic(
                    "S004",
                    format!("family trigger on non-family namespace {orig_expr}"),
                ));
            }
        }

        let expanded = node::rewrite_nodes(&orig_expr, |t| {
            if !t.is_action {
                if let Some(members) = family_map.get(&t.name) {
                    let qualifier = t.qualifier.as_deref().unwrap_or_default();
                    // Checked against the trigger table above.
                    if let Some((output, all)) = family::member_trigger(qualifier) {
                        return family::member_expression(members, t.offset.as_deref(), output, all);
                    }
                }
            }
            t.raw()
        });

        // `finished` is derived: expand to an explicit succeeded/failed OR.
        let mut refs = Vec::new();
        let expr = node::rewrite_nodes(&expanded, |t| {
            if t.is_action {
                refs.push(TriggerKey::Xtrigger(t.name.clone()));
                t.raw()
            } else if t.qualifier.as_deref() == Some(outputs::OUTPUT_FINISHED) {
                for output in [outputs::OUTPUT_SUCCEEDED, outputs::OUTPUT_FAILED] {
                    refs.push(TriggerKey::Task {
                        name: t.name.clone(),
                        offset: t.offset.clone(),
                        output: output.to_string(),
                    });
                }
                finished_expansion(t)
            } else {
                refs.push(TriggerKey::Task {
                    name: t.name.clone(),
                    offset: t.offset.clone(),
                    output: t.qualifier.clone().unwrap_or_default(),
                });
                t.raw()
            }
        });

        for right in rights {
            self.record_right(right, &orig_expr, &expr, &refs)?;
        }
        Ok(())
    }

    fn record_right(
        &mut self,
        right: &str,
        orig_expr: &str,
        expr: &str,
        refs: &[TriggerKey],
    ) -> Result<(), GraphError> {
        let rhs = node::parse_rhs_node(right)?;

        if let Some(members) = self.family_map.get(&rhs.name).cloned() {
            if rhs.optional {
                return Err(GraphError::semantic(
                    "S006",
                    format!(
                        "Family triggers can't be optional: {}:{}?",
                        rhs.name,
                        rhs.qualifier.as_deref().unwrap_or_default()
                    ),
                ));
            }
            // An unqualified family on the right fans out without implying
            // anything about member outputs.
            let record = match rhs.qualifier.as_deref() {
                None => None,
                Some(qualifier) => match family::member_optionality(qualifier) {
                    Some((output, optional)) => Some((output.to_string(), optional)),
                    None => {
                        return Err(GraphError::semantic(
                            "S007",
                            format!("Illegal family trigger: {}:{qualifier}", rhs.name),
                        ));
                    }
                },
            };
            for member in &members {
                self.set_triggers(
                    true,
                    member,
                    record.clone(),
                    rhs.suicide,
                    refs,
                    expr,
                    orig_expr,
                )?;
            }
            return Ok(());
        }

        let output = outputs::standardise_qualifier(
            rhs.qualifier.as_deref().unwrap_or(outputs::OUTPUT_SUCCEEDED),
        );
        if output == outputs::OUTPUT_FINISHED {
            if rhs.optional {
                return Err(GraphError::semantic(
                    "S005",
                    format!("Pseudo-output {}:{} can't be optional", rhs.name, output),
                ));
            }
            // "task:finish" means either branch is acceptable.
            for out in [outputs::OUTPUT_SUCCEEDED, outputs::OUTPUT_FAILED] {
                self.set_triggers(
                    false,
                    &rhs.name,
                    Some((out.to_string(), true)),
                    rhs.suicide,
                    refs,
                    expr,
                    orig_expr,
                )?;
            }
            return Ok(());
        }

        self.set_triggers(
            false,
            &rhs.name,
            Some((output.to_string(), rhs.optional)),
            rhs.suicide,
            refs,
            expr,
            orig_expr,
        )
    }

    /// Record a dependency expression and (maybe) output optionality for one
    /// right-side task or family member.
    #[allow(clippy::too_many_arguments)]
    fn set_triggers(
        &mut self,
        family: bool,
        name: &str,
        record: Option<(String, bool)>,
        suicide: bool,
        refs: &[TriggerKey],
        expr: &str,
        orig_expr: &str,
    ) -> Result<(), GraphError> {
        if !expr.is_empty() {
            if let Some(existing) = self.results.triggers.get(name).and_then(|m| m.get(expr)) {
                if existing.suicide != suicide {
                    return Err(GraphError::semantic(
                        "S009",
                        format!(
                            "{} can't trigger both {name} and !{name}",
                            display_expr(orig_expr)
                        ),
                    ));
                }
            }
        }

        self.results
            .triggers
            .entry(name.to_string())
            .or_default()
            .insert(
                expr.to_string(),
                TriggerExpr {
                    refs: refs.to_vec(),
                    suicide,
                },
            );
        self.results
            .original
            .entry(name.to_string())
            .or_default()
            .insert(expr.to_string(), orig_expr.to_string());

        // Suicide rules imply nothing about outputs.
        let Some((output, optional)) = record else {
            return Ok(());
        };
        if suicide {
            return Ok(());
        }

        let map = if family {
            &mut self.results.memb_output_opt
        } else {
            &mut self.results.task_output_opt
        };
        let key = (name.to_string(), output);
        match map.get(&key).copied() {
            None => {
                map.insert(key, optional);
            }
            Some(already) if already != optional => {
                if family {
                    // Family-derived records are weak: disagreement relaxes
                    // the output to optional.
                    map.insert(key, true);
                } else if self.config.back_compat {
                    tracing::warn!(
                        task = name,
                        output = %key.1,
                        "output used as both optional and required; treating as optional"
                    );
                    map.insert(key, true);
                } else {
                    return Err(GraphError::semantic(
                        "S008",
                        format!("{name}:{} can't be both optional and required", key.1),
                    ));
                }
            }
            Some(_) => {}
        }
        Ok(())
    }
}

fn finished_expansion(t: &NodeToken) -> String {
    let offset = match &t.offset {
        Some(offset) => format!("[{offset}]"),
        None => String::new(),
    };
    format!(
        "({name}{offset}:{s}|{name}{offset}:{f})",
        name = t.name,
        s = outputs::OUTPUT_SUCCEEDED,
        f = outputs::OUTPUT_FAILED,
    )
}

fn null_task(left: Option<&str>, right: &str) -> GraphError {
    GraphError::syntax(
        "G009",
        format!(
            "Null task name in graph: {} => {right}",
            left.unwrap_or_default()
        ),
    )
}

/// Spaced display form of an expression for error messages.
fn display_expr(expr: &str) -> String {
    expr.replace(":succeeded", "")
        .replace('&', " & ")
        .replace('|', " | ")
}
