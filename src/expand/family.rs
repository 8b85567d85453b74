//! Family trigger semantics: the fixed qualifier tables and member expansion.

use crate::outputs::{
    OUTPUT_FAILED, OUTPUT_FINISHED, OUTPUT_STARTED, OUTPUT_SUBMIT_FAILED, OUTPUT_SUBMITTED,
    OUTPUT_SUCCEEDED,
};

/// Map a family trigger qualifier to the member output it tests and whether
/// all members (AND) or any member (OR) must yield it.
pub fn member_trigger(qualifier: &str) -> Option<(&'static str, bool)> {
    Some(match qualifier {
        "start-all" => (OUTPUT_STARTED, true),
        "start-any" => (OUTPUT_STARTED, false),
        "succeed-all" => (OUTPUT_SUCCEEDED, true),
        "succeed-any" => (OUTPUT_SUCCEEDED, false),
        "fail-all" => (OUTPUT_FAILED, true),
        "fail-any" => (OUTPUT_FAILED, false),
        "submit-all" => (OUTPUT_SUBMITTED, true),
        "submit-any" => (OUTPUT_SUBMITTED, false),
        "submit-fail-all" => (OUTPUT_SUBMIT_FAILED, true),
        "submit-fail-any" => (OUTPUT_SUBMIT_FAILED, false),
        "finish-all" => (OUTPUT_FINISHED, true),
        "finish-any" => (OUTPUT_FINISHED, false),
        _ => return None,
    })
}

/// Map a right-side family trigger qualifier to the member output optionality
/// it implies: `(member output, optional)`.
///
/// `started` is never optional; it is only checked if the task finishes.
pub fn member_optionality(qualifier: &str) -> Option<(&'static str, bool)> {
    Some(match qualifier {
        "start-all" => (OUTPUT_STARTED, false),
        "start-any" => (OUTPUT_STARTED, false),
        "succeed-all" => (OUTPUT_SUCCEEDED, false),
        "fail-all" => (OUTPUT_FAILED, false),
        "submit-all" => (OUTPUT_SUBMITTED, false),
        "submit-fail-all" => (OUTPUT_SUBMIT_FAILED, false),
        "submit-fail-any" => (OUTPUT_SUBMITTED, true),
        "succeed-any" => (OUTPUT_SUCCEEDED, true),
        "fail-any" => (OUTPUT_SUCCEEDED, true),
        "finish-all" => (OUTPUT_SUCCEEDED, true),
        "finish-any" => (OUTPUT_SUCCEEDED, true),
        "submit-any" => (OUTPUT_SUBMITTED, true),
        _ => return None,
    })
}

/// Render the member substitution for one family reference:
/// `(m1[off]:out & m2[off]:out & ...)` for all-semantics, `|`-joined for any.
pub fn member_expression(members: &[String], offset: Option<&str>, output: &str, all: bool) -> String {
    let op = if all { '&' } else { '|' };
    let mut out = String::from("(");
    for (i, member) in members.iter().enumerate() {
        if i > 0 {
            out.push(op);
        }
        out.push_str(member);
        if let Some(offset) = offset {
            out.push('[');
            out.push_str(offset);
            out.push(']');
        }
        out.push(':');
        out.push_str(output);
    }
    out.push(')');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_twelve_qualifiers_are_triggers() {
        for q in [
            "start-all", "start-any", "succeed-all", "succeed-any", "fail-all", "fail-any",
            "submit-all", "submit-any", "submit-fail-all", "submit-fail-any", "finish-all",
            "finish-any",
        ] {
            assert!(member_trigger(q).is_some(), "{q}");
            assert!(member_optionality(q).is_some(), "{q}");
        }
        assert!(member_trigger("succeeded").is_none());
        assert!(member_trigger("all").is_none());
    }

    #[test]
    fn submit_fail_qualifiers_test_the_submit_failed_output() {
        assert_eq!(
            member_trigger("submit-fail-all"),
            Some((OUTPUT_SUBMIT_FAILED, true))
        );
        assert_eq!(
            member_trigger("submit-fail-any"),
            Some((OUTPUT_SUBMIT_FAILED, false))
        );
    }

    #[test]
    fn member_expression_renders_both_semantics() {
        let members = vec!["m1".to_string(), "m2".to_string()];
        assert_eq!(
            member_expression(&members, None, "succeeded", true),
            "(m1:succeeded&m2:succeeded)"
        );
        assert_eq!(
            member_expression(&members, Some("-P1D"), "failed", false),
            "(m1[-P1D]:failed|m2[-P1D]:failed)"
        );
    }
}
