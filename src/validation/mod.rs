// src/validation/mod.rs

//! Rule-based validation of generated questions.
//!
//! Every rule is an independent `RuleCheck` value tagged with a scope:
//! - Structural: always evaluated (stem, options, answer, markup, ...)
//! - Unit: evaluated only when the caller names a unit of that kind
//!
//! The engine evaluates structural rules first, then the rules of the active
//! unit, and stops at the first failure. Rules never panic; malformed input is
//! reported as an invalid result naming the rule.

pub mod arithmetic;
pub mod fraction;
pub mod geometry;
pub mod structural;

use std::sync::LazyLock;

use regex::Regex;

use crate::models::question::{
    GeneratedQuestion, QuestionBatchReport, QuestionVerdict, ValidationResult,
};

/// Which rules a `RuleCheck` belongs to.
///
/// `Unit` carries the unit tag, e.g. `"arithmetic"`. A unit name that
/// contains the tag itself or one of the keywords registered for it with
/// `QuestionValidator::with_unit` activates the rules carrying that tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleScope {
    Structural,
    Unit(&'static str),
}

/// Unit information available to a rule while it runs.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub unit_name: Option<&'a str>,
    /// Tag of the unit `unit_name` resolved to, if any.
    pub unit: Option<&'static str>,
}

impl<'a> RuleContext<'a> {
    pub fn new(unit_name: Option<&'a str>, unit: Option<&'static str>) -> Self {
        Self { unit_name, unit }
    }
}

#[derive(Debug, Clone)]
struct UnitKeywords {
    unit: &'static str,
    keywords: Vec<&'static str>,
}

impl UnitKeywords {
    fn matches(&self, normalized: &str) -> bool {
        normalized.contains(self.unit) || self.keywords.iter().any(|w| normalized.contains(w))
    }
}

/// A single named check over a question.
///
/// `check` returns the failure detail; the engine prefixes it with `name()`.
pub trait RuleCheck: Send + Sync {
    fn name(&self) -> &'static str;
    fn scope(&self) -> RuleScope;
    fn check(&self, question: &GeneratedQuestion, ctx: &RuleContext<'_>) -> Result<(), String>;
}

/// Composes rule checks and evaluates them uniformly.
pub struct QuestionValidator {
    rules: Vec<Box<dyn RuleCheck>>,
    /// Unit tags in resolution order; the first match wins.
    units: Vec<UnitKeywords>,
}

impl QuestionValidator {
    /// A validator with no rules registered.
    pub fn empty() -> Self {
        Self {
            rules: Vec::new(),
            units: Vec::new(),
        }
    }

    /// Adds unit-name keywords for `unit`. Units are tried in the order they
    /// were first registered, so register the more specific ones first.
    pub fn with_unit(mut self, unit: &'static str, keywords: &[&'static str]) -> Self {
        self.unit_entry(unit).keywords.extend_from_slice(keywords);
        self
    }

    pub fn with_rule(self, rule: impl RuleCheck + 'static) -> Self {
        let rule: Box<dyn RuleCheck> = Box::new(rule);
        self.with_rules(vec![rule])
    }

    pub fn with_rules(mut self, rules: Vec<Box<dyn RuleCheck>>) -> Self {
        for rule in rules {
            if let RuleScope::Unit(unit) = rule.scope() {
                self.unit_entry(unit);
            }
            self.rules.push(rule);
        }
        self
    }

    fn unit_entry(&mut self, unit: &'static str) -> &mut UnitKeywords {
        let index = match self.units.iter().position(|u| u.unit == unit) {
            Some(index) => index,
            None => {
                self.units.push(UnitKeywords {
                    unit,
                    keywords: Vec::new(),
                });
                self.units.len() - 1
            }
        };
        &mut self.units[index]
    }

    /// Maps a free-form unit name onto a registered unit tag. Unknown names
    /// map to `None`, which leaves only the structural rules active.
    pub fn unit_for(&self, unit_name: &str) -> Option<&'static str> {
        let normalized = unit_name.trim().to_lowercase();
        if normalized.is_empty() {
            return None;
        }
        self.units
            .iter()
            .find(|u| u.matches(&normalized))
            .map(|u| u.unit)
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Validates one question. `unit_name` activates the matching unit rules.
    pub fn validate(&self, question: &GeneratedQuestion, unit_name: Option<&str>) -> ValidationResult {
        let ctx = RuleContext::new(unit_name, unit_name.and_then(|name| self.unit_for(name)));

        let structural = self
            .rules
            .iter()
            .filter(|r| r.scope() == RuleScope::Structural);
        let unit_specific = self
            .rules
            .iter()
            .filter(|r| matches!(r.scope(), RuleScope::Unit(unit) if Some(unit) == ctx.unit));

        for rule in structural.chain(unit_specific) {
            if let Err(detail) = rule.check(question, &ctx) {
                return ValidationResult::invalid(rule.name(), detail);
            }
        }

        ValidationResult::valid()
    }

    /// Validates each question on its own; a rejection never stops the rest.
    pub fn validate_batch(
        &self,
        questions: &[GeneratedQuestion],
        unit_name: Option<&str>,
    ) -> QuestionBatchReport {
        let verdicts: Vec<QuestionVerdict> = questions
            .iter()
            .enumerate()
            .map(|(index, question)| {
                let result = self.validate(question, unit_name);
                if let Some(reason) = &result.reason {
                    tracing::warn!(
                        "Discarding generated question #{} (unit {}): {}",
                        index,
                        question.unit_id,
                        reason
                    );
                }
                QuestionVerdict {
                    index,
                    unit_id: question.unit_id.clone(),
                    is_valid: result.is_valid,
                    reason: result.reason,
                }
            })
            .collect();

        let report = QuestionBatchReport::new(verdicts);
        tracing::info!(
            "Validated {} generated questions: {} admitted, {} rejected",
            questions.len(),
            report.admitted_count(),
            report.rejected_count()
        );
        report
    }
}

impl Default for QuestionValidator {
    /// The built-in structural and unit rule set.
    fn default() -> Self {
        // Fractions first so "fractions and numbers" is not taken for arithmetic.
        Self::empty()
            .with_unit(fraction::UNIT, fraction::KEYWORDS)
            .with_unit(geometry::UNIT, geometry::KEYWORDS)
            .with_unit(arithmetic::UNIT, arithmetic::KEYWORDS)
            .with_rules(structural::rules())
            .with_rules(arithmetic::rules())
            .with_rules(geometry::rules())
            .with_rules(fraction::rules())
    }
}

/// A decimal numeral, optionally grouped in thousands ("1,000", "12.5").
pub(crate) const NUMERAL: &str = r"(?:\d{1,3}(?:,\d{3})+\b|\d+)(?:\.\d+)?";

static EMBEDDED_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"[-−]?{}", NUMERAL)).expect("valid number pattern"));

static STANDALONE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"^[-−]?{}$", NUMERAL)).expect("valid number pattern"));

/// Value of a numeral matched by `NUMERAL`, with an optional leading sign.
pub(crate) fn numeral_value(text: &str) -> Option<f64> {
    text.replace(',', "")
        .replace('−', "-")
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}

/// Whether the `-` at `sign_at` negates the number after it. A dash glued to a
/// word ("Grade-3") or following another number ("7 -3") is not a sign.
pub(crate) fn sign_is_unary(text: &str, sign_at: usize) -> bool {
    let before = &text[..sign_at];
    match before.chars().next_back() {
        Some(c) if c.is_alphanumeric() => false,
        _ => !before.trim_end().ends_with(|c: char| c.is_ascii_digit()),
    }
}

/// Parses an option or answer that should be a plain number ("12", "-3", "0.5", "1,200").
pub(crate) fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if !STANDALONE_NUMBER.is_match(trimmed) {
        return None;
    }
    numeral_value(trimmed)
}

/// Signed numbers embedded in free text.
pub(crate) fn embedded_numbers(text: &str) -> Vec<f64> {
    EMBEDDED_NUMBER
        .find_iter(text)
        .filter_map(|m| {
            let token = m.as_str();
            let signed = token.starts_with(['-', '−']);
            if signed && !sign_is_unary(text, m.start()) {
                numeral_value(token.trim_start_matches(['-', '−']))
            } else {
                numeral_value(token)
            }
        })
        .collect()
}
