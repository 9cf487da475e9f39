// THEORY:
// Two stages deliberately never fail on bad input: MAT mask extraction falls back
// to a random mask, and report synthesis falls back to an empty object. Degrading
// gracefully keeps the pipeline moving, but it must not erase the difference
// between real and synthetic data. `Outcome` keeps that difference in the type:
// the value is always usable, and a fallback always carries the reason it was
// taken.

use std::fmt;

/// Why a stage substituted synthetic data for its input.
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackReason {
    /// The input could not be read or decoded at all.
    Unreadable(String),
    /// The MAT container loaded, but none of its variables is an image-shaped array.
    NoArrayVariable,
    /// Standard input was empty.
    EmptyInput,
    /// Standard input was not valid JSON.
    MalformedJson(String),
    /// Standard input was JSON, but not an object.
    NotAnObject,
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::Unreadable(detail) => write!(f, "input unreadable: {detail}"),
            FallbackReason::NoArrayVariable => write!(f, "no array-valued variable found"),
            FallbackReason::EmptyInput => write!(f, "input was empty"),
            FallbackReason::MalformedJson(detail) => write!(f, "malformed JSON: {detail}"),
            FallbackReason::NotAnObject => write!(f, "JSON input is not an object"),
        }
    }
}

/// A value derived from real input, or a synthetic substitute and the reason for it.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Genuine(T),
    Fallback { value: T, reason: FallbackReason },
}

impl<T> Outcome<T> {
    pub fn value(&self) -> &T {
        match self {
            Outcome::Genuine(value) | Outcome::Fallback { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Outcome::Genuine(value) | Outcome::Fallback { value, .. } => value,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Outcome::Fallback { .. })
    }

    pub fn fallback_reason(&self) -> Option<&FallbackReason> {
        match self {
            Outcome::Genuine(_) => None,
            Outcome::Fallback { reason, .. } => Some(reason),
        }
    }
}
