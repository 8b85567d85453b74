//! Node token scanning and the graph node grammar.
//!
//! All scanning operates on whitespace-free text (the normalizer strips
//! whitespace up front). The canonical node form is:
//!
//! ```text
//! NAME(<PARAMS>)([CYCLE-POINT-OFFSET])(:QUALIFIER)(?)
//! ```
//!
//! plus `@ACTION` xtrigger tokens and a `!` suicide prefix on right-side
//! nodes.

use crate::error::GraphError;
use crate::outputs;

pub const SUICIDE: char = '!';
pub const OPTIONAL: char = '?';
pub const ACTION: char = '@';

/// True for characters that may start a task or family name.
pub fn is_name_start(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// True for characters legal anywhere in a task or family name.
pub fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '+' | '%' | '@')
}

fn is_offset_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '+' | '^' | ':')
}

fn is_qualifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn is_param_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | ',' | '=' | '-' | '+')
}

/// One scanned node reference from an expression or chain segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeToken {
    pub name: String,
    /// Cycle point offset text without the enclosing brackets.
    pub offset: Option<String>,
    /// Qualifier text without the leading `:`.
    pub qualifier: Option<String>,
    pub optional: bool,
    /// True for `@xtrigger` tokens; `name` excludes the `@`.
    pub is_action: bool,
}

impl NodeToken {
    /// Render as `name[offset]:qualifier`, defaulting and standardising the
    /// qualifier. The `?` marker is never rendered.
    pub fn qualified(&self) -> String {
        if self.is_action {
            return format!("{ACTION}{}", self.name);
        }
        let qualifier = outputs::standardise_qualifier(
            self.qualifier.as_deref().unwrap_or(outputs::OUTPUT_SUCCEEDED),
        );
        match &self.offset {
            Some(offset) => format!("{}[{}]:{}", self.name, offset, qualifier),
            None => format!("{}:{}", self.name, qualifier),
        }
    }

    /// Standardised qualifier, defaulting to `succeeded`.
    pub fn std_qualifier(&self) -> &str {
        outputs::standardise_qualifier(
            self.qualifier.as_deref().unwrap_or(outputs::OUTPUT_SUCCEEDED),
        )
    }

    /// Original token text, as written.
    pub fn raw(&self) -> String {
        let mut out = String::new();
        if self.is_action {
            out.push(ACTION);
        }
        out.push_str(&self.name);
        if let Some(offset) = &self.offset {
            out.push('[');
            out.push_str(offset);
            out.push(']');
        }
        if let Some(qualifier) = &self.qualifier {
            out.push(':');
            out.push_str(qualifier);
        }
        if self.optional {
            out.push(OPTIONAL);
        }
        out
    }
}

/// Scan all node tokens out of a whitespace-free expression, ignoring the
/// structural characters `(`, `)`, `&`, `|` and `!`.
pub fn scan_nodes(expr: &str) -> Vec<NodeToken> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = expr.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == ACTION || is_name_start(c) {
            let (token, next) = scan_one(&chars, i);
            tokens.push(token);
            i = next;
        } else {
            i += 1;
        }
    }
    tokens
}

/// Rewrite each node token of a whitespace-free expression via `f`, keeping
/// structural characters in place.
pub fn rewrite_nodes(expr: &str, mut f: impl FnMut(&NodeToken) -> String) -> String {
    let mut out = String::new();
    let chars: Vec<char> = expr.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == ACTION || is_name_start(c) {
            let (token, next) = scan_one(&chars, i);
            out.push_str(&f(&token));
            i = next;
        } else {
            out.push(c);
            i += 1;
        }
    }
    out
}

fn scan_one(chars: &[char], start: usize) -> (NodeToken, usize) {
    let mut i = start;
    let is_action = chars[i] == ACTION;
    if is_action {
        i += 1;
    }
    let name_start = i;
    while i < chars.len() && is_name_char(chars[i]) {
        i += 1;
    }
    let name: String = chars[name_start..i].iter().collect();

    let mut offset = None;
    if i < chars.len() && chars[i] == '[' {
        let inner_start = i + 1;
        let mut j = inner_start;
        while j < chars.len() && chars[j] != ']' {
            j += 1;
        }
        if j < chars.len() {
            offset = Some(chars[inner_start..j].iter().collect());
            i = j + 1;
        }
    }

    let mut qualifier = None;
    if i < chars.len() && chars[i] == ':' {
        let qual_start = i + 1;
        let mut j = qual_start;
        while j < chars.len() && is_qualifier_char(chars[j]) {
            j += 1;
        }
        if j > qual_start {
            qualifier = Some(chars[qual_start..j].iter().collect());
            i = j;
        }
    }

    let mut optional = false;
    if i < chars.len() && chars[i] == OPTIONAL {
        optional = true;
        i += 1;
    }

    (
        NodeToken {
            name,
            offset,
            qualifier,
            optional,
            is_action,
        },
        i,
    )
}

/// A parsed right-side node: `(!)NAME(:QUALIFIER)(?)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RhsNode {
    pub suicide: bool,
    pub name: String,
    pub qualifier: Option<String>,
    pub optional: bool,
}

/// Parse a right-side node, requiring the whole token to be consumed.
pub fn parse_rhs_node(token: &str) -> Result<RhsNode, GraphError> {
    let chars: Vec<char> = token.chars().collect();
    let mut i = 0;
    let suicide = matches!(chars.first(), Some(&SUICIDE));
    if suicide {
        i = 1;
    }
    if i >= chars.len() || !is_name_start(chars[i]) {
        return Err(illegal_node(token));
    }
    let (node, next) = scan_one(&chars, i);
    if next != chars.len() || node.offset.is_some() || node.is_action {
        return Err(illegal_node(token));
    }
    Ok(RhsNode {
        suicide,
        name: node.name,
        qualifier: node.qualifier,
        optional: node.optional,
    })
}

fn illegal_node(token: &str) -> GraphError {
    GraphError::syntax("G007", format!("Illegal graph node: {token}"))
}

/// Validate one token against the full node grammar, parameters included:
/// `(!)(NAME|<PARAMS>)+([OFFSET])(:QUALIFIER)(?)`.
pub fn is_valid_node(token: &str) -> bool {
    let chars: Vec<char> = token.chars().collect();
    let mut i = 0;
    if matches!(chars.first(), Some(&SUICIDE)) {
        i = 1;
    }

    // Name segments and <param> groups may interleave: a<x>, <x>a, a<x>b.
    let mut segments = 0;
    loop {
        if i < chars.len() && chars[i] == '<' {
            let mut j = i + 1;
            while j < chars.len() && is_param_char(chars[j]) {
                j += 1;
            }
            if j == i + 1 || j >= chars.len() || chars[j] != '>' {
                return false;
            }
            i = j + 1;
            segments += 1;
        } else if i < chars.len()
            && ((segments == 0 && is_name_start(chars[i]))
                || (segments > 0 && is_name_char(chars[i])))
        {
            while i < chars.len() && is_name_char(chars[i]) {
                i += 1;
            }
            segments += 1;
        } else {
            break;
        }
    }
    if segments == 0 {
        return false;
    }

    if i < chars.len() && chars[i] == '[' {
        let mut j = i + 1;
        while j < chars.len() && is_offset_char(chars[j]) {
            j += 1;
        }
        if j == i + 1 || j >= chars.len() || chars[j] != ']' {
            return false;
        }
        i = j + 1;
    }

    if i < chars.len() && chars[i] == ':' {
        let mut j = i + 1;
        while j < chars.len() && is_qualifier_char(chars[j]) {
            j += 1;
        }
        if j == i + 1 {
            return false;
        }
        i = j;
    }

    if i < chars.len() && chars[i] == OPTIONAL {
        i += 1;
    }

    i == chars.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_extracts_full_form() {
        let tokens = scan_nodes("foo[-P1D]:fail?&(bar|@wall_clock)");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].name, "foo");
        assert_eq!(tokens[0].offset.as_deref(), Some("-P1D"));
        assert_eq!(tokens[0].qualifier.as_deref(), Some("fail"));
        assert!(tokens[0].optional);
        assert_eq!(tokens[1].name, "bar");
        assert!(tokens[2].is_action);
        assert_eq!(tokens[2].name, "wall_clock");
    }

    #[test]
    fn qualified_defaults_and_standardises() {
        let tokens = scan_nodes("foo&bar:fail");
        assert_eq!(tokens[0].qualified(), "foo:succeeded");
        assert_eq!(tokens[1].qualified(), "bar:failed");
    }

    #[test]
    fn rewrite_preserves_structure() {
        let out = rewrite_nodes("(a|b)&c", |t| format!("{}:succeeded", t.name));
        assert_eq!(out, "(a:succeeded|b:succeeded)&c:succeeded");
    }

    #[test]
    fn rhs_node_rejects_offset() {
        assert!(parse_rhs_node("foo[-P1D]").is_err());
        let node = parse_rhs_node("!foo:fail?").unwrap();
        assert!(node.suicide);
        assert_eq!(node.name, "foo");
        assert_eq!(node.qualifier.as_deref(), Some("fail"));
        assert!(node.optional);
    }

    #[test]
    fn node_grammar_accepts_canonical_forms() {
        for ok in [
            "foo",
            "foo<i,j>",
            "<i>foo",
            "foo<i=0>bar",
            "foo[-P1D]:succeeded?",
            "foo[^]:started",
            "!foo",
            "foo:my-custom_output",
        ] {
            assert!(is_valid_node(ok), "{ok} should be valid");
        }
    }

    #[test]
    fn node_grammar_rejects_malformed_forms() {
        for bad in [
            "foo:succeeded[-P1D]",
            "foo?[-P1D]",
            "foo[",
            "foo<>",
            ":succeeded",
            "foo:",
        ] {
            assert!(!is_valid_node(bad), "{bad} should be invalid");
        }
    }
}
