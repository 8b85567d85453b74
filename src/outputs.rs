//! Standard task output names and qualifier vocabulary.
//!
//! `finished` is a derived pseudo-output: it never appears in an output
//! registry and always expands to `succeeded | failed`.

pub const OUTPUT_EXPIRED: &str = "expired";
pub const OUTPUT_SUBMITTED: &str = "submitted";
pub const OUTPUT_SUBMIT_FAILED: &str = "submit-failed";
pub const OUTPUT_STARTED: &str = "started";
pub const OUTPUT_SUCCEEDED: &str = "succeeded";
pub const OUTPUT_FAILED: &str = "failed";
pub const OUTPUT_FINISHED: &str = "finished";

/// Standard outputs in canonical lifecycle order. Used for sorting and for
/// registry initialization; excludes the derived `finished` pseudo-output.
pub const STANDARD_OUTPUTS: [&str; 6] = [
    OUTPUT_EXPIRED,
    OUTPUT_SUBMITTED,
    OUTPUT_SUBMIT_FAILED,
    OUTPUT_STARTED,
    OUTPUT_SUCCEEDED,
    OUTPUT_FAILED,
];

/// Replace a qualifier alias with its standard name; custom trigger names
/// pass through unchanged.
pub fn standardise_qualifier(name: &str) -> &str {
    match name {
        "submit" => OUTPUT_SUBMITTED,
        "submit-fail" => OUTPUT_SUBMIT_FAILED,
        "start" => OUTPUT_STARTED,
        "succeed" => OUTPUT_SUCCEEDED,
        "fail" => OUTPUT_FAILED,
        "finish" => OUTPUT_FINISHED,
        "expire" => OUTPUT_EXPIRED,
        other => other,
    }
}

pub fn is_standard(output: &str) -> bool {
    STANDARD_OUTPUTS.contains(&output)
}

/// Sort key putting standard outputs first in lifecycle order, then custom
/// outputs alphabetically.
pub fn sort_key(output: &str) -> (usize, &str) {
    match STANDARD_OUTPUTS.iter().position(|o| *o == output) {
        Some(i) => (i, ""),
        None => (STANDARD_OUTPUTS.len(), output),
    }
}

/// Opposite member of a mutually exclusive output pair, if any.
pub fn opposite(output: &str) -> Option<&'static str> {
    match output {
        OUTPUT_SUCCEEDED => Some(OUTPUT_FAILED),
        OUTPUT_FAILED => Some(OUTPUT_SUCCEEDED),
        OUTPUT_SUBMITTED => Some(OUTPUT_SUBMIT_FAILED),
        OUTPUT_SUBMIT_FAILED => Some(OUTPUT_SUBMITTED),
        _ => None,
    }
}

/// A completion variable is the output name with `-` mapped to `_` so it is
/// a legal identifier in completion expressions.
pub fn completion_variable(output: &str) -> String {
    output.replace('-', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_standardise() {
        assert_eq!(standardise_qualifier("succeed"), "succeeded");
        assert_eq!(standardise_qualifier("submit-fail"), "submit-failed");
        assert_eq!(standardise_qualifier("my_custom_output"), "my_custom_output");
    }

    #[test]
    fn sort_orders_standard_before_custom() {
        let mut outputs = vec!["banana", "succeeded", "apple", "expired"];
        outputs.sort_by_key(|o| sort_key(o));
        assert_eq!(outputs, vec!["expired", "succeeded", "apple", "banana"]);
    }
}
