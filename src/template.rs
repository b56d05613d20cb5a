//! Path template interpolation
//!
//! Resource paths name their parent identifiers in braces, e.g.
//! `/marketers/{marketerId}/campaigns`. Placeholders are filled from the
//! [`StreamContext`] of the partition being synced. Each value is
//! percent-encoded as a single path segment.

use crate::error::{Error, Result};
use crate::types::StreamContext;
use regex::Regex;
use std::sync::LazyLock;

/// Regex for matching path placeholders: {variable}
static PLACEHOLDER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([a-zA-Z_][a-zA-Z0-9_]*)\}").expect("placeholder pattern is a valid regex")
});

/// Render a path template with values from `ctx`
///
/// Every placeholder must be present in the context; the error lists all of
/// the missing names at once.
pub fn render(template: &str, ctx: &StreamContext) -> Result<String> {
    let mut missing = Vec::new();

    let rendered = PLACEHOLDER_REGEX.replace_all(template, |caps: &regex::Captures<'_>| {
        let name = &caps[1];
        match ctx.get(name) {
            Some(value) => urlencoding::encode(value).into_owned(),
            None => {
                missing.push(name.to_string());
                String::new()
            }
        }
    });

    if missing.is_empty() {
        Ok(rendered.into_owned())
    } else {
        Err(Error::undefined_var(missing.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_substitution() {
        let ctx = StreamContext::with("marketerId", "m-001");
        let result = render("/marketers/{marketerId}/campaigns", &ctx).unwrap();
        assert_eq!(result, "/marketers/m-001/campaigns");
    }

    #[test]
    fn test_multiple_substitutions() {
        let ctx = StreamContext::with("marketerId", "m1").merge("campaignId", "c9");
        let result = render(
            "/reports/marketers/{marketerId}/campaigns/{campaignId}/periodicContent",
            &ctx,
        )
        .unwrap();
        assert_eq!(result, "/reports/marketers/m1/campaigns/c9/periodicContent");
    }

    #[test]
    fn test_undefined_variable() {
        let ctx = StreamContext::with("marketerId", "m1");
        let err = render("/campaigns/{campaignId}/promotedLinks", &ctx).unwrap_err();
        assert!(matches!(err, Error::UndefinedVariable { .. }));
        assert!(err.to_string().contains("campaignId"));
    }

    #[test]
    fn test_all_missing_reported() {
        let err = render("/{a}/{b}", &StreamContext::new()).unwrap_err();
        assert_eq!(err.to_string(), "Undefined path variable: a, b");
    }

    #[test]
    fn test_no_placeholders() {
        let result = render("/marketers", &StreamContext::new()).unwrap();
        assert_eq!(result, "/marketers");
    }

    #[test]
    fn test_values_are_encoded_as_one_segment() {
        let ctx = StreamContext::with("marketerId", "a/b?c=d e");
        let result = render("/marketers/{marketerId}/budgets", &ctx).unwrap();
        assert_eq!(result, "/marketers/a%2Fb%3Fc%3Dd%20e/budgets");
    }
}
