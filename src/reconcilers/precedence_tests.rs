// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `precedence.rs`

#[cfg(test)]
mod tests {
    use crate::reconcilers::precedence::{always, evaluate, keep, Rule, Verdict};
    use crate::reconcilers::status::ConditionUpdate;

    const RULES: &[Rule<u32>] = &[
        Rule {
            name: "zero",
            when: |n| *n == 0,
            then: keep,
        },
        Rule {
            name: "even",
            when: |n| n % 2 == 0,
            then: |n| Verdict::Set(ConditionUpdate::waiting(format!("{n} is even"))),
        },
        Rule {
            name: "fallback",
            when: always,
            then: |n| Verdict::Set(ConditionUpdate::ready(n.to_string())),
        },
    ];

    #[test]
    fn test_first_matching_rule_wins() {
        // 0 is also even; the earlier rule must decide
        assert_eq!(evaluate(RULES, &0), Some(("zero", Verdict::Keep)));
    }

    #[test]
    fn test_later_rules_apply_when_earlier_do_not_match() {
        let (name, verdict) = evaluate(RULES, &4).unwrap();
        assert_eq!(name, "even");
        assert_eq!(verdict, Verdict::Set(ConditionUpdate::waiting("4 is even")));
    }

    #[test]
    fn test_fallback_rule() {
        let (name, verdict) = evaluate(RULES, &7).unwrap();
        assert_eq!(name, "fallback");
        assert_eq!(verdict, Verdict::Set(ConditionUpdate::ready("7")));
    }

    #[test]
    fn test_no_match_returns_none() {
        assert_eq!(evaluate(&RULES[..2], &3), None);
        assert_eq!(evaluate::<u32>(&[], &3), None);
    }
}
