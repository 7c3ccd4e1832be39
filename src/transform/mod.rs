pub mod file;
pub mod pattern;
pub mod rule;
pub mod walker;

pub use pattern::Pattern;
pub use rule::{normalize_pairs, parse_rules, Rule, RuleSet, Selector, Substitution};
pub use walker::{
    apply_rules, execute_transform, plan_transform, PlannedFile, TransformPlan, TransformReport,
};
