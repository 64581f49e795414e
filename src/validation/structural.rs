// src/validation/structural.rs

//! Unit-agnostic rules every generated question must pass.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use super::{RuleCheck, RuleContext, RuleScope};
use crate::config::{MAX_OPTION_LENGTH, MAX_OPTIONS, MAX_STEM_LENGTH, MIN_OPTIONS};
use crate::models::question::{GeneratedQuestion, QuestionType};

/// An opening or closing HTML tag such as `<b>`, `</p>` or `<img src=..>`.
static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?[a-zA-Z][^<>]*>").expect("valid tag pattern"));

/// All structural rules, in evaluation order.
pub fn rules() -> Vec<Box<dyn RuleCheck>> {
    vec![
        Box::new(StemPresent),
        Box::new(StemLength),
        Box::new(OptionCount),
        Box::new(OptionText),
        Box::new(OptionsDistinct),
        Box::new(AnswerInOptions),
        Box::new(QuestionTypeShape),
        Box::new(StemMarkup),
        Box::new(ImageUrlFormat),
    ]
}

pub struct StemPresent;

impl RuleCheck for StemPresent {
    fn name(&self) -> &'static str {
        "stem_present"
    }

    fn scope(&self) -> RuleScope {
        RuleScope::Structural
    }

    fn check(&self, question: &GeneratedQuestion, _: &RuleContext<'_>) -> Result<(), String> {
        if question.stem.trim().is_empty() {
            return Err("stem is empty".to_string());
        }
        Ok(())
    }
}

pub struct StemLength;

impl RuleCheck for StemLength {
    fn name(&self) -> &'static str {
        "stem_length"
    }

    fn scope(&self) -> RuleScope {
        RuleScope::Structural
    }

    fn check(&self, question: &GeneratedQuestion, _: &RuleContext<'_>) -> Result<(), String> {
        let len = question.stem.chars().count();
        if len > MAX_STEM_LENGTH {
            return Err(format!(
                "stem has {} characters, at most {} allowed",
                len, MAX_STEM_LENGTH
            ));
        }
        Ok(())
    }
}

pub struct OptionCount;

impl RuleCheck for OptionCount {
    fn name(&self) -> &'static str {
        "option_count"
    }

    fn scope(&self) -> RuleScope {
        RuleScope::Structural
    }

    fn check(&self, question: &GeneratedQuestion, _: &RuleContext<'_>) -> Result<(), String> {
        let count = question.options.len();
        if !(MIN_OPTIONS..=MAX_OPTIONS).contains(&count) {
            return Err(format!(
                "{} options given, expected between {} and {}",
                count, MIN_OPTIONS, MAX_OPTIONS
            ));
        }
        Ok(())
    }
}

pub struct OptionText;

impl RuleCheck for OptionText {
    fn name(&self) -> &'static str {
        "option_text"
    }

    fn scope(&self) -> RuleScope {
        RuleScope::Structural
    }

    fn check(&self, question: &GeneratedQuestion, _: &RuleContext<'_>) -> Result<(), String> {
        for (i, option) in question.options.iter().enumerate() {
            if option.trim().is_empty() {
                return Err(format!("option {} is blank", i + 1));
            }
            if option.chars().count() > MAX_OPTION_LENGTH {
                return Err(format!(
                    "option {} exceeds {} characters",
                    i + 1,
                    MAX_OPTION_LENGTH
                ));
            }
        }
        Ok(())
    }
}

pub struct OptionsDistinct;

impl RuleCheck for OptionsDistinct {
    fn name(&self) -> &'static str {
        "options_distinct"
    }

    fn scope(&self) -> RuleScope {
        RuleScope::Structural
    }

    fn check(&self, question: &GeneratedQuestion, _: &RuleContext<'_>) -> Result<(), String> {
        let mut seen = HashSet::new();
        for option in &question.options {
            if !seen.insert(option.trim().to_lowercase()) {
                return Err(format!("option '{}' appears more than once", option.trim()));
            }
        }
        Ok(())
    }
}

pub struct AnswerInOptions;

impl RuleCheck for AnswerInOptions {
    fn name(&self) -> &'static str {
        "answer_in_options"
    }

    fn scope(&self) -> RuleScope {
        RuleScope::Structural
    }

    fn check(&self, question: &GeneratedQuestion, _: &RuleContext<'_>) -> Result<(), String> {
        let answer = question.correct_answer.trim();
        if answer.is_empty() {
            return Err("correct answer is empty".to_string());
        }
        if !question.options.iter().any(|o| o.trim() == answer) {
            return Err(format!("correct answer '{}' is not among the options", answer));
        }
        Ok(())
    }
}

pub struct QuestionTypeShape;

impl RuleCheck for QuestionTypeShape {
    fn name(&self) -> &'static str {
        "question_type_shape"
    }

    fn scope(&self) -> RuleScope {
        RuleScope::Structural
    }

    fn check(&self, question: &GeneratedQuestion, _: &RuleContext<'_>) -> Result<(), String> {
        if question.question_type == Some(QuestionType::TrueFalse) && question.options.len() != 2 {
            return Err(format!(
                "true/false question has {} options, expected 2",
                question.options.len()
            ));
        }
        Ok(())
    }
}

/// Generated text is shown as plain text; tags mean the generator leaked markup.
pub struct StemMarkup;

impl RuleCheck for StemMarkup {
    fn name(&self) -> &'static str {
        "stem_markup"
    }

    fn scope(&self) -> RuleScope {
        RuleScope::Structural
    }

    fn check(&self, question: &GeneratedQuestion, _: &RuleContext<'_>) -> Result<(), String> {
        if let Some(tag) = HTML_TAG.find(&question.stem) {
            return Err(format!("stem contains markup '{}'", tag.as_str()));
        }
        for (i, option) in question.options.iter().enumerate() {
            if let Some(tag) = HTML_TAG.find(option) {
                return Err(format!("option {} contains markup '{}'", i + 1, tag.as_str()));
            }
        }
        if let Some(tag) = question.explanation.as_deref().and_then(|e| HTML_TAG.find(e)) {
            return Err(format!("explanation contains markup '{}'", tag.as_str()));
        }
        Ok(())
    }
}

pub struct ImageUrlFormat;

impl RuleCheck for ImageUrlFormat {
    fn name(&self) -> &'static str {
        "image_url_format"
    }

    fn scope(&self) -> RuleScope {
        RuleScope::Structural
    }

    fn check(&self, question: &GeneratedQuestion, _: &RuleContext<'_>) -> Result<(), String> {
        let Some(raw) = question.image_url.as_deref() else {
            return Ok(());
        };
        match Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
            Ok(url) => Err(format!("image url scheme '{}' is not http(s)", url.scheme())),
            Err(e) => Err(format!("image url '{}' is invalid: {}", raw, e)),
        }
    }
}
