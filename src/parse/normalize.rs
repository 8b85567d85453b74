//! Graph text normalization: comment stripping, spacing checks, continuation
//! joining, polling-annotation extraction and the node-format audit.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::GraphError;
use crate::outputs;
use crate::parse::node;

pub const ARROW: &str = "=>";

/// Inter-workflow polling reference extracted from `NAME<WORKFLOW::TASK:STATUS>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollingInfo {
    pub workflow: String,
    pub task: String,
    pub status: String,
    /// The raw annotation as written, brackets included.
    pub annotation: String,
}

#[derive(Debug, Default)]
pub struct Normalized {
    /// Whitespace-free, continuation-joined graph lines.
    pub lines: Vec<String>,
    /// Local task name -> polling target.
    pub polling: BTreeMap<String, PollingInfo>,
}

/// Normalize one cycling section's raw graph text.
pub fn normalize_section(text: &str) -> Result<Normalized, GraphError> {
    let mut stripped = Vec::new();
    let mut bad_lines = Vec::new();
    for line in text.lines() {
        let line = match line.find('#') {
            Some(i) => &line[..i],
            None => line,
        };
        if line.trim().is_empty() {
            continue;
        }
        // 'task task' with no operator between survives whitespace removal,
        // so it must be caught while the spacing is still visible.
        if has_bad_spacing(line) {
            bad_lines.push(line.trim().to_string());
            continue;
        }
        stripped.push(line.split_whitespace().collect::<String>());
    }
    if !bad_lines.is_empty() {
        return Err(bad_node_format("G001", &bad_lines));
    }

    let mut normalized = Normalized::default();
    let mut partial = String::new();
    for (i, line) in stripped.iter().enumerate() {
        if i == 0 && line.starts_with(ARROW) {
            return Err(GraphError::syntax("G002", format!("Leading arrow: {line}")));
        }
        let next = stripped.get(i + 1);
        if next.is_none() && line.ends_with(ARROW) {
            return Err(GraphError::syntax(
                "G003",
                format!("Trailing arrow: {line}"),
            ));
        }
        if let Some(next) = next {
            if line.ends_with(ARROW) && next.starts_with(ARROW) {
                return Err(GraphError::syntax(
                    "G004",
                    format!("Consecutive lines end and start with an operator: {line} / {next}"),
                ));
            }
        }
        partial.push_str(line);
        if line.ends_with(ARROW) || next.is_some_and(|n| n.starts_with(ARROW)) {
            continue;
        }
        let full = extract_polling(&std::mem::take(&mut partial), &mut normalized.polling);
        normalized.lines.push(full);
    }

    let mut bad_nodes = Vec::new();
    for line in &normalized.lines {
        if line.contains("&&") {
            return Err(GraphError::syntax(
                "G005",
                format!("The graph AND operator is '&': {line}"),
            ));
        }
        if line.contains("||") {
            return Err(GraphError::syntax(
                "G005",
                format!("The graph OR operator is '|': {line}"),
            ));
        }
        audit_node_formats(line, &mut bad_nodes);
    }
    if !bad_nodes.is_empty() {
        return Err(bad_node_format("G006", &bad_nodes));
    }

    Ok(normalized)
}

/// Detect a name character separated from a following name character by
/// whitespace only. Signed numeric offsets ("- 2") have a non-name character
/// adjacent to the gap and pass.
fn has_bad_spacing(line: &str) -> bool {
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i].is_whitespace() && i > 0 {
            let mut j = i;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            if j < chars.len()
                && node::is_name_char(chars[i - 1])
                && node::is_name_char(chars[j])
            {
                return true;
            }
            i = j;
        } else {
            i += 1;
        }
    }
    false
}

/// Extract `NAME<WORKFLOW::TASK:STATUS>` annotations from a joined line,
/// replacing each with its bare local name.
fn extract_polling(line: &str, polling: &mut BTreeMap<String, PollingInfo>) -> String {
    let mut out = String::new();
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '<' {
            let close = chars[i + 1..].iter().position(|&c| c == '>');
            let inner: String = match close {
                Some(n) => chars[i + 1..i + 1 + n].iter().collect(),
                None => String::new(),
            };
            if let Some((workflow, rest)) = inner.split_once("::") {
                // Walk back over the preceding local name in the output.
                let name_start = out
                    .char_indices()
                    .rev()
                    .take_while(|(_, c)| node::is_name_char(*c))
                    .last()
                    .map(|(idx, _)| idx);
                if let Some(name_start) = name_start {
                    let local = out[name_start..].to_string();
                    let (task, status) = match rest.split_once(':') {
                        Some((task, status)) => {
                            (task.to_string(), outputs::standardise_qualifier(status).to_string())
                        }
                        None => (rest.to_string(), outputs::OUTPUT_SUCCEEDED.to_string()),
                    };
                    polling.insert(
                        local,
                        PollingInfo {
                            workflow: workflow.to_string(),
                            task,
                            status,
                            annotation: format!("<{inner}>"),
                        },
                    );
                    i += inner.chars().count() + 2;
                    continue;
                }
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

/// Collect tokens that fail the node grammar after structural characters and
/// `@action` tokens are set aside.
fn audit_node_formats(line: &str, bad: &mut Vec<String>) {
    let mut spaced = line.replace(ARROW, " ");
    for c in ['|', '&', '(', ')'] {
        spaced = spaced.replace(c, " ");
    }
    for token in spaced.split_whitespace() {
        if let Some(action) = token.strip_prefix(node::ACTION) {
            if action.is_empty() || !action.chars().all(|c| node::is_name_char(c) || c == '%') {
                bad.push(token.to_string());
            }
        } else if !node::is_valid_node(token) {
            bad.push(token.to_string());
        }
    }
}

fn bad_node_format(code: &str, lines: &[String]) -> GraphError {
    GraphError::syntax(
        code,
        format!(
            "bad graph node format:\n  {}\n\
             Correct format is:\n \
             @ACTION or NAME(<PARAMS>)([CYCLE-POINT-OFFSET])(:TRIGGER)(?)\n \
             {{NAME(<PARAMS>) can also be: <PARAMS>NAME or NAME<PARAMS>NAME_CONTINUED}}\n \
             or\n \
             NAME(<REMOTE-WORKFLOW-TRIGGER>)(:TRIGGER)",
            lines.join("\n  ")
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_comments_and_joins_continuations() {
        let n = normalize_section("foo => # comment\n  bar\n\nbaz =>\n qux").unwrap();
        assert_eq!(n.lines, vec!["foo=>bar", "baz=>qux"]);
    }

    #[test]
    fn bad_spacing_is_aggregated() {
        let err = normalize_section("foo bar => baz\nqux quux => c").unwrap_err();
        assert!(err.message.contains("foo bar => baz"));
        assert!(err.message.contains("qux quux => c"));
        assert!(err.message.contains("Correct format"));
    }

    #[test]
    fn leading_and_trailing_arrows_are_fatal() {
        assert_eq!(normalize_section("=> foo").unwrap_err().code, "G002");
        assert_eq!(normalize_section("foo =>").unwrap_err().code, "G003");
        assert_eq!(
            normalize_section("foo =>\n=> bar").unwrap_err().code,
            "G004"
        );
    }

    #[test]
    fn double_char_operators_rejected() {
        let err = normalize_section("foo && bar => baz").unwrap_err();
        assert_eq!(err.code, "G005");
        assert!(err.message.contains("'&'"));
    }

    #[test]
    fn polling_annotation_extracted_with_default_status() {
        let n = normalize_section("foo<other.flow::remote> => bar").unwrap();
        assert_eq!(n.lines, vec!["foo=>bar"]);
        let info = &n.polling["foo"];
        assert_eq!(info.workflow, "other.flow");
        assert_eq!(info.task, "remote");
        assert_eq!(info.status, "succeeded");
        assert_eq!(info.annotation, "<other.flow::remote>");
    }

    #[test]
    fn polling_status_is_standardised() {
        let n = normalize_section("foo<wf::t:fail> => bar").unwrap();
        assert_eq!(n.polling["foo"].status, "failed");
    }

    #[test]
    fn bad_node_format_reported() {
        let err = normalize_section("foo:succeeded[-P1D] => bar").unwrap_err();
        assert_eq!(err.code, "G006");
        assert!(err.message.contains("foo:succeeded[-P1D]"));
    }

    #[test]
    fn parameterized_nodes_pass_the_audit() {
        let n = normalize_section("model<run> => post<run>:finish?").unwrap();
        assert_eq!(n.lines, vec!["model<run>=>post<run>:finish?"]);
    }
}
