//! Relation ontology: the closed edge vocabulary, its four categories, the
//! allowed (source type, target type) pairs per relation, and text heuristics
//! for suggesting a relation between two items.

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::ContextType;
use crate::error::CtxgraphError;

use ContextType::{Agent, Code, Command, Config, Workflow};
use TypePattern::{Any, Only};

/// Typed edge label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    Uses,
    Implements,
    DependsOn,
    References,
    Tests,
    Documents,
    Extends,
    Contains,
    Calls,
    Imports,
    Configures,
    Authenticates,
    Validates,
    Transforms,
}

/// Semantic grouping of relation types. Every relation type belongs to exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationCategory {
    Dependency,
    Hierarchy,
    Association,
    Action,
}

impl RelationType {
    /// Total number of relation types.
    pub const COUNT: usize = 14;

    /// All variants for iteration.
    pub const ALL: [RelationType; 14] = [
        Self::Uses,
        Self::Implements,
        Self::DependsOn,
        Self::References,
        Self::Tests,
        Self::Documents,
        Self::Extends,
        Self::Contains,
        Self::Calls,
        Self::Imports,
        Self::Configures,
        Self::Authenticates,
        Self::Validates,
        Self::Transforms,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uses => "uses",
            Self::Implements => "implements",
            Self::DependsOn => "depends_on",
            Self::References => "references",
            Self::Tests => "tests",
            Self::Documents => "documents",
            Self::Extends => "extends",
            Self::Contains => "contains",
            Self::Calls => "calls",
            Self::Imports => "imports",
            Self::Configures => "configures",
            Self::Authenticates => "authenticates",
            Self::Validates => "validates",
            Self::Transforms => "transforms",
        }
    }

    /// The category this relation type belongs to.
    pub fn category(&self) -> RelationCategory {
        match self {
            Self::Uses | Self::DependsOn | Self::Imports => RelationCategory::Dependency,
            Self::Implements | Self::Extends | Self::Contains => RelationCategory::Hierarchy,
            Self::References | Self::Tests | Self::Documents | Self::Configures => {
                RelationCategory::Association
            }
            Self::Calls | Self::Authenticates | Self::Validates | Self::Transforms => {
                RelationCategory::Action
            }
        }
    }

    /// How the edge reads from the target's side (`A uses B` => `B used_by A`).
    pub fn inverse_label(&self) -> &'static str {
        match self {
            Self::Uses => "used_by",
            Self::Implements => "implemented_by",
            Self::DependsOn => "required_by",
            Self::References => "referenced_by",
            Self::Tests => "tested_by",
            Self::Documents => "documented_by",
            Self::Extends => "extended_by",
            Self::Contains => "contained_in",
            Self::Calls => "called_by",
            Self::Imports => "imported_by",
            Self::Configures => "configured_by",
            Self::Authenticates => "authenticated_by",
            Self::Validates => "validated_by",
            Self::Transforms => "transformed_by",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Uses => "Source makes use of the target",
            Self::Implements => "Source implements the interface or contract defined by the target",
            Self::DependsOn => "Source cannot work without the target",
            Self::References => "Source mentions or links to the target",
            Self::Tests => "Source is a test exercising the target",
            Self::Documents => "Source describes how to work with the target",
            Self::Extends => "Source builds on and specialises the target",
            Self::Contains => "Source structurally contains the target",
            Self::Calls => "Source invokes the target",
            Self::Imports => "Source imports the target module",
            Self::Configures => "Source holds configuration for the target",
            Self::Authenticates => "Source performs authentication for the target",
            Self::Validates => "Source validates data or behaviour of the target",
            Self::Transforms => "Source converts data produced or consumed by the target",
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationType {
    type Err = CtxgraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RelationType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CtxgraphError::UnknownRelationType(s.to_string()))
    }
}

impl RelationCategory {
    pub const ALL: [RelationCategory; 4] = [
        Self::Dependency,
        Self::Hierarchy,
        Self::Association,
        Self::Action,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dependency => "dependency",
            Self::Hierarchy => "hierarchy",
            Self::Association => "association",
            Self::Action => "action",
        }
    }
}

impl fmt::Display for RelationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationCategory {
    type Err = CtxgraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RelationCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| CtxgraphError::InvalidInput(format!("unknown relation category: {s}")))
    }
}

/// Table lookup from relation type to category.
pub fn category_of(relation_type: RelationType) -> RelationCategory {
    relation_type.category()
}

/// All relation types in `category`, in declaration order.
pub fn types_in_category(category: RelationCategory) -> Vec<RelationType> {
    RelationType::ALL
        .iter()
        .copied()
        .filter(|t| t.category() == category)
        .collect()
}

/// One side of an allowed-pair entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TypePattern {
    Any,
    Only(ContextType),
}

impl TypePattern {
    fn matches(&self, item_type: ContextType) -> bool {
        match self {
            TypePattern::Any => true,
            TypePattern::Only(t) => *t == item_type,
        }
    }
}

const ANY_PAIR: &[(TypePattern, TypePattern)] = &[(Any, Any)];

/// Allowed (source, target) pairs for a relation type.
pub fn allowed_pairs(relation_type: RelationType) -> &'static [(TypePattern, TypePattern)] {
    match relation_type {
        RelationType::Uses
        | RelationType::DependsOn
        | RelationType::References
        | RelationType::Contains => ANY_PAIR,
        RelationType::Implements => &[(Only(Code), Only(Code)), (Only(Workflow), Any)],
        RelationType::Tests => &[(Only(Code), Only(Code))],
        RelationType::Documents => &[
            (Only(Workflow), Only(Code)),
            (Only(Agent), Only(Code)),
            (Only(Command), Only(Code)),
        ],
        RelationType::Extends => &[
            (Only(Code), Only(Code)),
            (Only(Agent), Only(Agent)),
            (Only(Workflow), Only(Workflow)),
        ],
        RelationType::Calls => &[
            (Only(Code), Only(Code)),
            (Only(Command), Any),
            (Only(Agent), Any),
            (Only(Workflow), Any),
        ],
        RelationType::Imports => &[(Only(Code), Only(Code)), (Only(Code), Only(Config))],
        RelationType::Configures => &[(Only(Config), Any)],
        RelationType::Authenticates => &[(Only(Code), Any), (Only(Config), Any)],
        RelationType::Validates => &[(Only(Code), Any), (Only(Workflow), Any), (Only(Agent), Any)],
        RelationType::Transforms => &[(Only(Code), Any)],
    }
}

/// Whether an edge of `relation_type` may connect items of the given types.
///
/// Advisory only: nothing in the engine rejects edges it reads. Writers call
/// this before persisting.
pub fn is_valid_relation(
    source_type: ContextType,
    target_type: ContextType,
    relation_type: RelationType,
) -> bool {
    allowed_pairs(relation_type)
        .iter()
        .any(|(s, t)| s.matches(source_type) && t.matches(target_type))
}

/// Suggest relation types from textual evidence in `source_content`.
///
/// Best-effort: never fails, returns each suggested type at most once and an
/// empty list when nothing matches.
pub fn suggest_relations(
    source_content: &str,
    target_name: &str,
    source_type: ContextType,
    target_type: ContextType,
) -> Vec<RelationType> {
    let mut suggestions = Vec::new();
    let mut push = |t: RelationType| {
        if !suggestions.contains(&t) {
            suggestions.push(t);
        }
    };

    if source_type == ContextType::Config {
        push(RelationType::Configures);
    }

    let target_name = target_name.trim();
    if target_name.is_empty() {
        return suggestions;
    }

    let escaped = regex::escape(target_name);
    let content_lower = source_content.to_lowercase();
    let mentions_target = content_lower.contains(&target_name.to_lowercase());

    let import_pattern = format!(
        r#"(?m)(^\s*import\s[^\n;]*{n}|\brequire\(\s*['"][^'"]*{n}|\bfrom\s+['"][^'"]*{n}|^\s*from\s+[\w.]*{n}[\w.]*\s+import\b|^\s*use\s+[\w:]*{n})"#,
        n = escaped
    );
    if pattern_matches(&import_pattern, source_content) {
        push(RelationType::Imports);
    }

    if (content_lower.contains("test") || content_lower.contains("spec")) && mentions_target {
        push(RelationType::Tests);
    }

    if matches!(source_type, ContextType::Workflow | ContextType::Agent) && mentions_target {
        push(RelationType::Documents);
    }

    if source_content.contains(&format!("{target_name}(")) {
        push(RelationType::Calls);
    }

    if pattern_matches(&format!(r"\bextends\s+{escaped}\b"), source_content) {
        push(RelationType::Extends);
    }
    if pattern_matches(&format!(r"\bimplements\s+{escaped}\b"), source_content) {
        push(RelationType::Implements);
    }

    log::trace!(
        "suggested {:?} for {} -> {} ({})",
        suggestions,
        source_type,
        target_name,
        target_type
    );
    suggestions
}

fn pattern_matches(pattern: &str, haystack: &str) -> bool {
    match Regex::new(pattern) {
        Ok(re) => re.is_match(haystack),
        Err(e) => {
            log::warn!("Skipping relation heuristic, bad pattern: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_category_totality_and_partition() {
        let mut seen = HashSet::new();
        for category in RelationCategory::ALL {
            for t in types_in_category(category) {
                assert_eq!(category_of(t), category);
                assert!(seen.insert(t), "{t} listed in two categories");
            }
        }
        assert_eq!(seen.len(), RelationType::COUNT);
        assert!(RelationType::ALL.iter().all(|t| seen.contains(t)));
    }

    #[test]
    fn test_dependency_category_members() {
        let deps = types_in_category(RelationCategory::Dependency);
        assert_eq!(
            deps,
            vec![RelationType::Uses, RelationType::DependsOn, RelationType::Imports]
        );
    }

    #[test]
    fn test_every_type_has_allowed_pairs() {
        for t in RelationType::ALL {
            assert!(!allowed_pairs(t).is_empty(), "{t} has no allowed pairs");
        }
    }

    #[test]
    fn test_is_valid_relation_tests() {
        assert!(is_valid_relation(Code, Code, RelationType::Tests));
        assert!(!is_valid_relation(ContextType::Doc, ContextType::Doc, RelationType::Tests));
        assert!(!is_valid_relation(Code, ContextType::Doc, RelationType::Tests));
    }

    #[test]
    fn test_is_valid_relation_documents() {
        for source in [Workflow, Agent, Command] {
            assert!(is_valid_relation(source, Code, RelationType::Documents));
        }
        assert!(!is_valid_relation(Code, Code, RelationType::Documents));
        assert!(!is_valid_relation(Agent, ContextType::Commit, RelationType::Documents));
    }

    #[test]
    fn test_is_valid_relation_configures_wildcard_target() {
        for target in ContextType::ALL {
            assert!(is_valid_relation(Config, target, RelationType::Configures));
        }
        assert!(!is_valid_relation(Code, Code, RelationType::Configures));
    }

    #[test]
    fn test_relation_type_round_trips_through_str() {
        for t in RelationType::ALL {
            assert_eq!(t.as_str().parse::<RelationType>().unwrap(), t);
        }
        assert!(matches!(
            "routes_to".parse::<RelationType>(),
            Err(CtxgraphError::UnknownRelationType(_))
        ));
    }

    #[test]
    fn test_inverse_labels_are_distinct() {
        let labels: HashSet<_> = RelationType::ALL.iter().map(|t| t.inverse_label()).collect();
        assert_eq!(labels.len(), RelationType::COUNT);
        assert_eq!(RelationType::Contains.inverse_label(), "contained_in");
    }

    #[test]
    fn test_suggest_imports() {
        let content = "import { parseConfig } from './config';\nconst x = 1;";
        let s = suggest_relations(content, "config", Code, Code);
        assert!(s.contains(&RelationType::Imports));

        let content = "const auth = require('../auth');";
        let s = suggest_relations(content, "auth", Code, Code);
        assert!(s.contains(&RelationType::Imports));

        let content = "from app.models import user";
        let s = suggest_relations(content, "models", Code, Code);
        assert!(s.contains(&RelationType::Imports));
    }

    #[test]
    fn test_suggest_tests_case_insensitive() {
        let content = "describe('UserService', () => { it('works') }) // spec";
        let s = suggest_relations(content, "userservice", Code, Code);
        assert!(s.contains(&RelationType::Tests));
    }

    #[test]
    fn test_suggest_documents_only_for_workflow_and_agent() {
        let content = "This workflow touches the Billing module.";
        assert!(suggest_relations(content, "billing", Workflow, Code)
            .contains(&RelationType::Documents));
        assert!(suggest_relations(content, "billing", Agent, Code)
            .contains(&RelationType::Documents));
        assert!(!suggest_relations(content, "billing", Command, Code)
            .contains(&RelationType::Documents));
    }

    #[test]
    fn test_suggest_configures_always_for_config_source() {
        assert_eq!(
            suggest_relations("", "anything", Config, Code),
            vec![RelationType::Configures]
        );
        assert_eq!(suggest_relations("", "", Config, Code), vec![RelationType::Configures]);
    }

    #[test]
    fn test_suggest_calls_extends_implements() {
        let content = "class Admin extends User implements Auditable {\n  run() { validate(x); }\n}";
        assert!(suggest_relations(content, "validate", Code, Code).contains(&RelationType::Calls));
        assert!(suggest_relations(content, "User", Code, Code).contains(&RelationType::Extends));
        assert!(suggest_relations(content, "Auditable", Code, Code)
            .contains(&RelationType::Implements));
        assert!(!suggest_relations(content, "Users", Code, Code).contains(&RelationType::Extends));
    }

    #[test]
    fn test_suggest_deduplicates_and_handles_no_evidence() {
        let content = "test: helper() calls helper() twice";
        let s = suggest_relations(content, "helper", Code, Code);
        assert_eq!(s.iter().filter(|t| **t == RelationType::Calls).count(), 1);
        assert!(suggest_relations("nothing relevant", "Widget", Code, Code).is_empty());
    }

    #[test]
    fn test_suggest_tolerates_regex_metacharacters() {
        let s = suggest_relations("call a.b+c(1)", "a.b+c", Code, Code);
        assert_eq!(s, vec![RelationType::Calls]);
    }
}
