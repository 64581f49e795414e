// src/validation/fraction.rs

use std::sync::LazyLock;

use regex::Regex;

use super::{RuleCheck, RuleContext, RuleScope};
use crate::models::question::GeneratedQuestion;

/// "3/4", "-1/2", mixed "2 1/3" or "-2 1/3". The sign only leads the whole value.
static FRACTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?(?:\d+\s+)?\d+\s*/\s*(\d+)$").expect("valid fraction pattern")
});

pub const UNIT: &str = "fractions";

pub const KEYWORDS: &[&str] = &["fraction"];

pub fn rules() -> Vec<Box<dyn RuleCheck>> {
    vec![Box::new(FractionFormat)]
}

/// Every option of a fractions question is written as a fraction.
pub struct FractionFormat;

impl RuleCheck for FractionFormat {
    fn name(&self) -> &'static str {
        "fraction_format"
    }

    fn scope(&self) -> RuleScope {
        RuleScope::Unit(UNIT)
    }

    fn check(&self, question: &GeneratedQuestion, _: &RuleContext<'_>) -> Result<(), String> {
        for option in &question.options {
            let option = option.trim();
            let Some(caps) = FRACTION.captures(option) else {
                return Err(format!("option '{}' is not written as a/b", option));
            };
            if caps[1].parse::<u64>().map_or(true, |d| d == 0) {
                return Err(format!("option '{}' has a zero denominator", option));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::tests::question;

    fn run(q: &GeneratedQuestion) -> Result<(), String> {
        FractionFormat.check(q, &RuleContext::new(Some("fractions"), Some(UNIT)))
    }

    #[test]
    fn test_fraction_options() {
        assert!(run(&question("Half of 1?", &["1/2", "2 1/3", "3 / 4"], "1/2")).is_ok());
        assert!(run(&question("Half of 1?", &["0.5", "1/3"], "0.5")).is_err());
    }

    #[test]
    fn test_sign_only_leads_the_whole_value() {
        assert!(run(&question("Pick", &["-1/2", "-2 1/3"], "-1/2")).is_ok());
        let err = run(&question("Pick", &["2 -1/3", "1/2"], "1/2")).unwrap_err();
        assert_eq!(err, "option '2 -1/3' is not written as a/b");
    }

    #[test]
    fn test_zero_denominator() {
        let err = run(&question("Pick", &["1/0", "1/2"], "1/2")).unwrap_err();
        assert_eq!(err, "option '1/0' has a zero denominator");
    }
}
