//! Rule-based priority triage for newly reported defects.
//!
//! The cascade is an ordered table: the first rule that yields a priority wins and later
//! rules are never consulted. Keyword data lives in [`keywords`] so each table can be
//! tested on its own.

pub mod keywords;

use crate::domain::Priority;

use keywords::NormalizedText;

/// Normalized view of the two classifier inputs.
#[derive(Debug, Clone)]
pub struct TriageText {
    pub category: NormalizedText,
    pub description: NormalizedText,
}

impl TriageText {
    pub fn new(category: &str, description: &str) -> Self {
        Self {
            category: NormalizedText::new(category),
            description: NormalizedText::new(description),
        }
    }
}

/// One step of the cascade. `evaluate` returns `None` to defer to the next rule.
pub struct PriorityRule {
    pub name: &'static str,
    pub evaluate: fn(&TriageText) -> Option<Priority>,
}

fn danger_override(t: &TriageText) -> Option<Priority> {
    t.description
        .matches_any(keywords::DANGER)
        .then_some(Priority::Alta)
}

fn electrical(t: &TriageText) -> Option<Priority> {
    if !t.category.matches_any(keywords::ELECTRICAL_CATEGORY) {
        return None;
    }
    if t.description.matches_any(keywords::ELECTRICAL_HIGH) {
        Some(Priority::Alta)
    } else {
        Some(Priority::Media)
    }
}

fn water(t: &TriageText) -> Option<Priority> {
    if t.description.matches_any(keywords::WATER_CRITICAL) {
        return Some(Priority::Alta);
    }
    if t.category.matches_any(keywords::WATER_CATEGORY)
        || t.description.matches_any(keywords::WATER_MINOR)
    {
        return Some(Priority::Media);
    }
    None
}

// Entering this branch always resolves: a structural report never falls to cosmetic.
fn structural(t: &TriageText) -> Option<Priority> {
    if !t.category.matches_any(keywords::STRUCTURE_CATEGORY)
        && !t.description.matches_any(keywords::STRUCTURE_TERMS)
    {
        return None;
    }
    if t.description.matches_any(keywords::STRUCTURE_HIGH) {
        Some(Priority::Alta)
    } else {
        Some(Priority::Media)
    }
}

fn sanitary_critical(t: &TriageText) -> Option<Priority> {
    (t.description.matches_any(keywords::SANITARY)
        && t.description.matches_any(keywords::SANITARY_CRITICAL))
    .then_some(Priority::Alta)
}

fn cosmetic(t: &TriageText) -> Option<Priority> {
    t.description
        .matches_any(keywords::COSMETIC)
        .then_some(Priority::Baja)
}

fn fallback(_: &TriageText) -> Option<Priority> {
    Some(Priority::Media)
}

pub const RULES: &[PriorityRule] = &[
    PriorityRule {
        name: "danger_override",
        evaluate: danger_override,
    },
    PriorityRule {
        name: "electrical",
        evaluate: electrical,
    },
    PriorityRule {
        name: "water",
        evaluate: water,
    },
    PriorityRule {
        name: "structural",
        evaluate: structural,
    },
    PriorityRule {
        name: "sanitary_critical",
        evaluate: sanitary_critical,
    },
    PriorityRule {
        name: "cosmetic",
        evaluate: cosmetic,
    },
    PriorityRule {
        name: "default",
        evaluate: fallback,
    },
];

/// Priority plus the name of the rule that produced it.
pub fn classify_with_rule(category: &str, description: &str) -> (Priority, &'static str) {
    let text = TriageText::new(category, description);
    RULES
        .iter()
        .find_map(|rule| (rule.evaluate)(&text).map(|p| (p, rule.name)))
        .unwrap_or((Priority::Media, "default"))
}

/// Classify a defect report. Total and deterministic; case-insensitive on both inputs.
pub fn classify(category: &str, description: &str) -> Priority {
    classify_with_rule(category, description).0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cascade_ends_with_an_unconditional_default() {
        let last = RULES.last().expect("rules");
        assert_eq!(last.name, "default");
        assert_eq!((last.evaluate)(&TriageText::new("", "")), Some(Priority::Media));
    }

    #[test]
    fn rule_names_are_unique() {
        let mut names: Vec<_> = RULES.iter().map(|r| r.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), RULES.len());
    }

    #[test]
    fn first_match_short_circuits() {
        // Cosmetic terms are present but the water rule fires first.
        let (p, rule) = classify_with_rule("", "fuga bajo la ventana");
        assert_eq!(p, Priority::Media);
        assert_eq!(rule, "water");
    }
}
