// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Ordered predicate → outcome rules for condition computation.
//!
//! Each condition is computed by walking a static table of [`Rule`]s in order;
//! the first rule whose predicate holds decides the outcome and later rules
//! are never consulted. Keeping the order in a table rather than in a chain
//! of early returns makes it inspectable and testable on its own.

use super::status::ConditionUpdate;

/// Outcome decided by a rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Leave the condition exactly as it is.
    Keep,
    /// Write the given condition state.
    Set(ConditionUpdate),
}

/// A named predicate → outcome pair evaluated against a state `S`.
pub struct Rule<S> {
    pub name: &'static str,
    pub when: fn(&S) -> bool,
    pub then: fn(&S) -> Verdict,
}

/// Evaluate `rules` in order and return the first match.
#[must_use]
pub fn evaluate<S>(rules: &[Rule<S>], state: &S) -> Option<(&'static str, Verdict)> {
    rules
        .iter()
        .find(|rule| (rule.when)(state))
        .map(|rule| (rule.name, (rule.then)(state)))
}

/// Predicate for a rule that always matches, used to terminate a table.
#[must_use]
pub fn always<S>(_: &S) -> bool {
    true
}

/// Outcome that keeps the condition untouched.
#[must_use]
pub fn keep<S>(_: &S) -> Verdict {
    Verdict::Keep
}
