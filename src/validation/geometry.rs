// src/validation/geometry.rs

//! Format rules for geometry units: measurements carry units, angles are sane.

use std::sync::LazyLock;

use regex::Regex;

use super::{RuleCheck, RuleContext, RuleScope};
use crate::models::question::GeneratedQuestion;

/// A number followed by a length, area, volume or angle unit.
static MEASUREMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(-?\d+(?:\.\d+)?)\s*(mm|cm|km|m|mm²|cm²|km²|m²|mm2|cm2|km2|m2|cm³|m³|°|degrees?)$")
        .expect("valid measurement pattern")
});

pub const UNIT: &str = "geometry";

pub const KEYWORDS: &[&str] = &["shape", "angle", "area", "perimeter"];

pub fn rules() -> Vec<Box<dyn RuleCheck>> {
    vec![Box::new(MeasurementUnits), Box::new(AngleRange)]
}

fn has_digit(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_digit())
}

/// Parses "45°" or "90 degrees" into 45.0 / 90.0. Other options yield `None`.
fn angle_value(option: &str) -> Option<f64> {
    let caps = MEASUREMENT.captures(option.trim())?;
    let unit = caps[2].to_lowercase();
    if unit == "°" || unit.starts_with("degree") {
        caps[1].parse().ok()
    } else {
        None
    }
}

/// Numeric options must state a unit; word options ("triangle") are exempt.
pub struct MeasurementUnits;

impl RuleCheck for MeasurementUnits {
    fn name(&self) -> &'static str {
        "geometry_units"
    }

    fn scope(&self) -> RuleScope {
        RuleScope::Unit(UNIT)
    }

    fn check(&self, question: &GeneratedQuestion, _: &RuleContext<'_>) -> Result<(), String> {
        for option in &question.options {
            let option = option.trim();
            if has_digit(option) && !MEASUREMENT.is_match(option) {
                return Err(format!("option '{}' has no unit of measure", option));
            }
        }
        Ok(())
    }
}

pub struct AngleRange;

impl RuleCheck for AngleRange {
    fn name(&self) -> &'static str {
        "geometry_angle_range"
    }

    fn scope(&self) -> RuleScope {
        RuleScope::Unit(UNIT)
    }

    fn check(&self, question: &GeneratedQuestion, _: &RuleContext<'_>) -> Result<(), String> {
        for option in &question.options {
            if let Some(angle) = angle_value(option) {
                if angle <= 0.0 || angle > 360.0 {
                    return Err(format!(
                        "angle '{}' is outside (0, 360] degrees",
                        option.trim()
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::tests::question;

    fn run(rule: &dyn RuleCheck, q: &GeneratedQuestion) -> Result<(), String> {
        rule.check(q, &RuleContext::new(Some("geometry"), Some(UNIT)))
    }

    #[test]
    fn test_measurements_need_units() {
        let ok = question("Perimeter of a 3 cm square?", &["12 cm", "9 cm", "12cm²"], "12 cm");
        assert!(run(&MeasurementUnits, &ok).is_ok());

        let bad = question("Perimeter of a 3 cm square?", &["12", "9 cm"], "12");
        assert_eq!(
            run(&MeasurementUnits, &bad).unwrap_err(),
            "option '12' has no unit of measure"
        );
    }

    #[test]
    fn test_word_options_are_exempt() {
        let q = question("Which shape has 3 sides?", &["Triangle", "Square"], "Triangle");
        assert!(run(&MeasurementUnits, &q).is_ok());
        assert!(run(&AngleRange, &q).is_ok());
    }

    #[test]
    fn test_angle_bounds() {
        let ok = question("Right angle?", &["90°", "180 degrees", "45 Degrees"], "90°");
        assert!(run(&AngleRange, &ok).is_ok());

        let zero = question("Angle?", &["0°", "90°"], "90°");
        assert!(run(&AngleRange, &zero).is_err());

        let too_big = question("Angle?", &["400 degrees", "90°"], "90°");
        assert!(run(&AngleRange, &too_big).unwrap_err().contains("400 degrees"));
    }

    #[test]
    fn test_lengths_are_not_angles() {
        assert_eq!(angle_value("500 cm"), None);
        assert_eq!(angle_value("30°"), Some(30.0));
    }
}
