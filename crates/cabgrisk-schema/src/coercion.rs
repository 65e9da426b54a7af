//! Value coercion from raw form input to model values.
//!
//! Rules depend only on the feature's kind:
//! - binary: negative/positive tokens → 0/1
//! - categorical: one of the declared choices, encoded or passed through
//! - numeric: non-negative finite number
//!
//! Absent input takes the widget default (negative, first choice, 0) and
//! is reported as defaulted.

use cabgrisk_common::{Locale, Result, RiskError};

use crate::feature::{Choice, FeatureKind, FeatureSpec};

pub const POSITIVE_TOKENS: &[&str] = &["positive", "yes", "有", "1", "true"];
pub const NEGATIVE_TOKENS: &[&str] = &["negative", "no", "無", "0", "false"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coerced {
    pub value: f64,
    pub defaulted: bool,
}

impl Coerced {
    fn given(value: f64) -> Self {
        Self { value, defaulted: false }
    }

    fn default_of(value: f64) -> Self {
        Self { value, defaulted: true }
    }
}

pub fn coerce(spec: &FeatureSpec, raw: Option<&str>) -> Result<Coerced> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty());

    match spec.kind {
        FeatureKind::Binary => match raw {
            None => Ok(Coerced::default_of(0.0)),
            Some(token) => coerce_binary(spec, token).map(Coerced::given),
        },
        FeatureKind::Categorical(choices) => match raw {
            None => {
                let first = choices.first().and_then(Choice::stored_value).ok_or_else(|| {
                    RiskError::InvalidChoice {
                        feature: spec.id.to_string(),
                        choice: String::new(),
                    }
                })?;
                Ok(Coerced::default_of(first))
            }
            Some(choice) => coerce_choice(spec, choices, choice).map(Coerced::given),
        },
        FeatureKind::Numeric => match raw {
            None => Ok(Coerced::default_of(0.0)),
            Some(text) => coerce_numeric(spec, text).map(Coerced::given),
        },
    }
}

fn coerce_binary(spec: &FeatureSpec, token: &str) -> Result<f64> {
    let lowered = token.to_lowercase();
    if POSITIVE_TOKENS.contains(&lowered.as_str()) {
        Ok(1.0)
    } else if NEGATIVE_TOKENS.contains(&lowered.as_str()) {
        Ok(0.0)
    } else {
        Err(RiskError::InvalidValue {
            feature: spec.id.to_string(),
            value: token.to_string(),
            reason: "expected a yes/no choice".to_string(),
        })
    }
}

fn coerce_choice(spec: &FeatureSpec, choices: &[Choice], raw: &str) -> Result<f64> {
    let numeric = raw.parse::<f64>().ok();
    let matched = choices.iter().find(|choice| {
        choice.value == raw
            || Locale::ALL.iter().any(|&l| choice.label(l) == raw)
            || matches!(
                (numeric, choice.encoded, choice.value.parse::<f64>()),
                (Some(n), None, Ok(c)) if n == c
            )
    });

    matched
        .and_then(Choice::stored_value)
        .ok_or_else(|| RiskError::InvalidChoice {
            feature: spec.id.to_string(),
            choice: raw.to_string(),
        })
}

fn coerce_numeric(spec: &FeatureSpec, text: &str) -> Result<f64> {
    let invalid = |reason: &str| RiskError::InvalidValue {
        feature: spec.id.to_string(),
        value: text.to_string(),
        reason: reason.to_string(),
    };

    let value: f64 = text.parse().map_err(|_| invalid("not a number"))?;
    if !value.is_finite() {
        return Err(invalid("not a finite number"));
    }
    if value < 0.0 {
        return Err(invalid("must not be negative"));
    }
    Ok(value)
}
