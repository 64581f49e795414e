// src/validation/arithmetic.rs

//! Rules for arithmetic units (addition, subtraction, multiplication, division).
//!
//! Elementary arithmetic works on non-negative numbers; how large they may get
//! depends on the question's difficulty.

use std::sync::LazyLock;

use regex::Regex;

use super::{
    NUMERAL, RuleCheck, RuleContext, RuleScope, embedded_numbers, numeral_value, parse_number,
    sign_is_unary,
};
use crate::config::{ARITHMETIC_MAX_EASY, ARITHMETIC_MAX_HARD, ARITHMETIC_MAX_MEDIUM};
use crate::models::question::{Difficulty, GeneratedQuestion};

pub const UNIT: &str = "arithmetic";

pub const KEYWORDS: &[&str] = &["addition", "subtraction", "multiplication", "division", "number"];

/// Numbers joined by operators, e.g. "12 + 7", "-3 + 5" or "3 × 4 - 2".
static EXPRESSION_CHAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"[-−]?{n}(?:\s*[-+−×x*÷/]\s*{n})+", n = NUMERAL))
        .expect("valid chain pattern")
});

static BINARY_EXPRESSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^([-−]?{n})\s*([-+−×x*÷/])\s*({n})$", n = NUMERAL))
        .expect("valid binary pattern")
});

const EPSILON: f64 = 1e-9;

pub fn rules() -> Vec<Box<dyn RuleCheck>> {
    vec![
        Box::new(NumericOptions),
        Box::new(NumberRange),
        Box::new(AnswerMatchesExpression),
    ]
}

fn max_for(difficulty: Option<Difficulty>) -> f64 {
    match difficulty {
        Some(Difficulty::Easy) => ARITHMETIC_MAX_EASY,
        Some(Difficulty::Hard) => ARITHMETIC_MAX_HARD,
        Some(Difficulty::Medium) | None => ARITHMETIC_MAX_MEDIUM,
    }
}

pub struct NumericOptions;

impl RuleCheck for NumericOptions {
    fn name(&self) -> &'static str {
        "arithmetic_numeric_options"
    }

    fn scope(&self) -> RuleScope {
        RuleScope::Unit(UNIT)
    }

    fn check(&self, question: &GeneratedQuestion, _: &RuleContext<'_>) -> Result<(), String> {
        match question.options.iter().find(|o| parse_number(o).is_none()) {
            Some(option) => Err(format!("option '{}' is not a number", option.trim())),
            None => Ok(()),
        }
    }
}

pub struct NumberRange;

impl RuleCheck for NumberRange {
    fn name(&self) -> &'static str {
        "arithmetic_range"
    }

    fn scope(&self) -> RuleScope {
        RuleScope::Unit(UNIT)
    }

    fn check(&self, question: &GeneratedQuestion, _: &RuleContext<'_>) -> Result<(), String> {
        let max = max_for(question.difficulty);
        let numbers = embedded_numbers(&question.stem)
            .into_iter()
            .chain(question.options.iter().filter_map(|o| parse_number(o)));

        for n in numbers {
            if !(0.0..=max).contains(&n) {
                return Err(format!("number {} is outside 0..={} for this difficulty", n, max));
            }
        }
        Ok(())
    }
}

/// When the stem poses exactly one `a op b`, the keyed answer must be its value.
/// Stems with several or chained expressions are left alone.
pub struct AnswerMatchesExpression;

impl RuleCheck for AnswerMatchesExpression {
    fn name(&self) -> &'static str {
        "arithmetic_answer"
    }

    fn scope(&self) -> RuleScope {
        RuleScope::Unit(UNIT)
    }

    fn check(&self, question: &GeneratedQuestion, _: &RuleContext<'_>) -> Result<(), String> {
        let stem = question.stem.as_str();
        let chains: Vec<&str> = EXPRESSION_CHAIN
            .find_iter(stem)
            .map(|m| {
                let expression = m.as_str();
                if expression.starts_with(['-', '−']) && !sign_is_unary(stem, m.start()) {
                    expression.trim_start_matches(['-', '−'])
                } else {
                    expression
                }
            })
            .collect();
        let [expression] = chains.as_slice() else {
            return Ok(());
        };
        let Some(caps) = BINARY_EXPRESSION.captures(expression) else {
            return Ok(());
        };

        let (Some(lhs), Some(rhs)) = (numeral_value(&caps[1]), numeral_value(&caps[3])) else {
            return Ok(());
        };
        let expected = match &caps[2] {
            "+" => lhs + rhs,
            "-" | "−" => lhs - rhs,
            "×" | "x" | "*" => lhs * rhs,
            _ => {
                if rhs == 0.0 {
                    return Err(format!("'{}' divides by zero", expression));
                }
                lhs / rhs
            }
        };

        match parse_number(&question.correct_answer) {
            Some(answer) if (answer - expected).abs() < EPSILON => Ok(()),
            Some(answer) => Err(format!(
                "'{}' equals {}, but the answer is keyed as {}",
                expression, expected, answer
            )),
            None => Err(format!(
                "answer '{}' is not a number",
                question.correct_answer.trim()
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::tests::question;

    fn run(rule: &dyn RuleCheck, q: &GeneratedQuestion) -> Result<(), String> {
        rule.check(q, &RuleContext::new(Some("arithmetic"), Some(UNIT)))
    }

    #[test]
    fn test_options_must_be_numbers() {
        assert!(run(&NumericOptions, &question("2 + 2?", &["4", "5"], "4")).is_ok());
        let err = run(&NumericOptions, &question("2 + 2?", &["4", "five"], "4")).unwrap_err();
        assert_eq!(err, "option 'five' is not a number");
    }

    #[test]
    fn test_range_depends_on_difficulty() {
        let mut q = question("What is 150 + 20?", &["170", "160"], "170");
        assert!(run(&NumberRange, &q).is_ok());

        q.difficulty = Some(Difficulty::Easy);
        assert!(run(&NumberRange, &q).is_err());

        q = question("What is 4000 + 20?", &["4020", "4010"], "4020");
        assert!(run(&NumberRange, &q).is_err());
        q.difficulty = Some(Difficulty::Hard);
        assert!(run(&NumberRange, &q).is_ok());
    }

    #[test]
    fn test_negative_options_are_out_of_range() {
        let q = question("What is 3 - 5?", &["-2", "2"], "-2");
        assert!(run(&NumberRange, &q).unwrap_err().contains("-2"));
    }

    #[test]
    fn test_answer_checked_against_single_expression() {
        assert!(run(&AnswerMatchesExpression, &question("What is 6 × 7?", &["42", "48"], "42")).is_ok());
        assert!(run(&AnswerMatchesExpression, &question("Compute 10 ÷ 4", &["2.5", "2"], "2.5")).is_ok());
        assert!(run(&AnswerMatchesExpression, &question("Compute 9-4", &["5", "6"], "5")).is_ok());

        let err = run(&AnswerMatchesExpression, &question("What is 6 + 7?", &["12", "13"], "12")).unwrap_err();
        assert!(err.contains("equals 13"));
    }

    #[test]
    fn test_leading_sign_belongs_to_the_first_operand() {
        let err = run(&AnswerMatchesExpression, &question("What is -3 + 5?", &["8", "2"], "8")).unwrap_err();
        assert!(err.contains("'-3 + 5' equals 2"));
        assert!(run(&AnswerMatchesExpression, &question("What is −3 + 5?", &["8", "2"], "2")).is_ok());

        let q = question("What is -3 + 5?", &["8", "2"], "2");
        assert!(run(&NumberRange, &q).unwrap_err().contains("-3"));

        // A dash glued to a word is not a sign.
        assert!(run(&AnswerMatchesExpression, &question("Grade-3 drill: 4 + 5", &["9", "1"], "9")).is_ok());
    }

    #[test]
    fn test_grouped_thousands_are_single_operands() {
        let mut q = question("What is 1,000 + 200?", &["1200", "1100"], "1200");
        q.difficulty = Some(Difficulty::Hard);
        assert!(run(&AnswerMatchesExpression, &q).is_ok());
        assert!(run(&NumberRange, &q).is_ok());
        assert!(run(&NumericOptions, &question("2,000 + 1?", &["2,001", "2001"], "2,001")).is_ok());
    }

    #[test]
    fn test_division_by_zero_is_rejected() {
        let q = question("What is 5 / 0?", &["0", "5"], "0");
        assert!(run(&AnswerMatchesExpression, &q).unwrap_err().contains("divides by zero"));
    }

    #[test]
    fn test_chained_or_multiple_expressions_are_not_judged() {
        assert!(run(&AnswerMatchesExpression, &question("What is 2 + 3 + 4?", &["9", "5"], "5")).is_ok());
        assert!(run(&AnswerMatchesExpression, &question("Is 2 + 3 more than 1 + 1?", &["1", "0"], "1")).is_ok());
        assert!(run(&AnswerMatchesExpression, &question("Tom has 5 apples.", &["5", "4"], "4")).is_ok());
    }
}
