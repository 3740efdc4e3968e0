//! Query routing: classify a question into a retrieval strategy.
//!
//! Classification is a case-insensitive regex match against a rule table. Each rule
//! belongs to one of two categories:
//! - **factual** (prices, specifications, quantities, dates, definitions) favours the
//!   vector index;
//! - **relational** (causal, historical, comparative, "why/how" connectors) favours the
//!   knowledge graph.
//!
//! A question matching only one category is routed there; anything else is `Hybrid`.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::Serialize;

use crate::config::RoutingConfig;
use crate::{Error, Result};

/// Retrieval strategy for one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteDecision {
    Vector,
    Graph,
    Hybrid,
}

impl RouteDecision {
    pub fn uses_vector(self) -> bool {
        matches!(self, RouteDecision::Vector | RouteDecision::Hybrid)
    }

    pub fn uses_graph(self) -> bool {
        matches!(self, RouteDecision::Graph | RouteDecision::Hybrid)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RouteDecision::Vector => "vector",
            RouteDecision::Graph => "graph",
            RouteDecision::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for RouteDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RouteDecision {
    type Err = Error;

    /// Accepts store names used by older deployments as aliases.
    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "vector" | "qdrant" | "naive" => Ok(RouteDecision::Vector),
            "graph" | "neo4j" | "local" => Ok(RouteDecision::Graph),
            "hybrid" | "global" => Ok(RouteDecision::Hybrid),
            other => Err(Error::InvalidArgument(format!("unknown route: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryCategory {
    Factual,
    Relational,
}

/// One row of the routing table.
#[derive(Debug, Clone)]
pub struct RouteRule {
    pub category: QueryCategory,
    pub pattern: Regex,
}

impl RouteRule {
    pub fn new(category: QueryCategory, pattern: &str) -> Result<Self> {
        let pattern = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| Error::Config(format!("invalid routing pattern '{pattern}': {e}")))?;
        Ok(Self { category, pattern })
    }

    pub fn label(&self) -> &str {
        self.pattern.as_str()
    }
}

const FACTUAL_PATTERNS: &[&str] = &[
    r"\bwhat is\b",
    r"\bwhat are\b",
    r"\bdefine\b",
    r"\bprices?\b",
    r"\bprix\b",
    r"\bcosts?\b",
    r"\btarifs?\b",
    r"\bspecs?\b",
    r"\bspecifications?\b",
    r"\bfeatures?\b",
    r"\bhow (much|many)\b",
    r"\bquantity\b",
    r"\bdates?\b",
    r"\bwarranty\b",
    r"\bcombien\b",
    r"\bc'est quoi\b",
];

const RELATIONAL_PATTERNS: &[&str] = &[
    r"\bwhy\b",
    r"\bpourquoi\b",
    r"\bhow (did|does|do|has|have)\b",
    r"\brelated\b",
    r"\brelationships?\b",
    r"\bhistory\b",
    r"\bhistorique\b",
    r"\bevolution\b",
    r"\bover time\b",
    r"\bconnections?\b",
    r"\blinks?\b",
    r"\blien\b",
    r"\bimpacts?\b",
    r"\bcaused?\b",
    r"\bbecause\b",
    r"\bcompare[ds]?\b",
    r"\bcomparison\b",
    r"\bversus\b",
    r"\bdifference between\b",
];

static DEFAULT_RULES: Lazy<Vec<RouteRule>> = Lazy::new(|| {
    FACTUAL_PATTERNS
        .iter()
        .map(|p| (QueryCategory::Factual, *p))
        .chain(
            RELATIONAL_PATTERNS
                .iter()
                .map(|p| (QueryCategory::Relational, *p)),
        )
        .filter_map(|(category, pattern)| RouteRule::new(category, pattern).ok())
        .collect()
});

/// Decision plus the rules that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct RouteExplanation {
    pub decision: RouteDecision,
    pub factual_matches: Vec<String>,
    pub relational_matches: Vec<String>,
}

/// Pure, deterministic router over an inspectable rule table.
#[derive(Debug, Clone)]
pub struct QueryRouter {
    rules: Vec<RouteRule>,
}

impl Default for QueryRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryRouter {
    /// Router with the built-in rule table.
    pub fn new() -> Self {
        Self {
            rules: DEFAULT_RULES.clone(),
        }
    }

    /// Router with an explicit rule table (no built-ins).
    pub fn with_rules(rules: Vec<RouteRule>) -> Self {
        Self { rules }
    }

    /// Built-in rules extended with configured patterns.
    pub fn from_config(config: &RoutingConfig) -> Result<Self> {
        let mut router = Self::new();
        for pattern in &config.factual_patterns {
            router.push_rule(RouteRule::new(QueryCategory::Factual, pattern)?);
        }
        for pattern in &config.relational_patterns {
            router.push_rule(RouteRule::new(QueryCategory::Relational, pattern)?);
        }
        Ok(router)
    }

    pub fn push_rule(&mut self, rule: RouteRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }

    pub fn route(&self, query: &str) -> RouteDecision {
        let mut factual = false;
        let mut relational = false;

        for rule in &self.rules {
            if factual && relational {
                break;
            }
            let seen = match rule.category {
                QueryCategory::Factual => &mut factual,
                QueryCategory::Relational => &mut relational,
            };
            if !*seen && rule.pattern.is_match(query) {
                *seen = true;
            }
        }

        decide(factual, relational)
    }

    pub fn explain(&self, query: &str) -> RouteExplanation {
        let mut factual_matches = Vec::new();
        let mut relational_matches = Vec::new();

        for rule in self.rules.iter().filter(|r| r.pattern.is_match(query)) {
            match rule.category {
                QueryCategory::Factual => factual_matches.push(rule.label().to_string()),
                QueryCategory::Relational => relational_matches.push(rule.label().to_string()),
            }
        }

        RouteExplanation {
            decision: decide(!factual_matches.is_empty(), !relational_matches.is_empty()),
            factual_matches,
            relational_matches,
        }
    }
}

fn decide(factual: bool, relational: bool) -> RouteDecision {
    match (factual, relational) {
        (true, false) => RouteDecision::Vector,
        (false, true) => RouteDecision::Graph,
        _ => RouteDecision::Hybrid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_rules_all_compile() {
        let router = QueryRouter::new();
        assert_eq!(
            router.rules().len(),
            FACTUAL_PATTERNS.len() + RELATIONAL_PATTERNS.len()
        );
    }

    #[test]
    fn factual_only_routes_to_vector() {
        let router = QueryRouter::new();
        for query in [
            "What is the price of solar panel X?",
            "define inverter",
            "How much does the battery cost?",
            "Quel est le prix du panneau?",
            "C'est quoi un onduleur?",
            "SPECS of model S200",
        ] {
            assert_eq!(router.route(query), RouteDecision::Vector, "{query}");
        }
    }

    #[test]
    fn relational_only_routes_to_graph() {
        let router = QueryRouter::new();
        for query in [
            "Why did the company change its pricing policy over time?",
            "history of GreenPower",
            "How does the inverter connect to the grid operator?",
            "Which suppliers are related to Acme?",
            "Quel est le lien entre Acme et GreenPower?",
        ] {
            assert_eq!(router.route(query), RouteDecision::Graph, "{query}");
        }
    }

    #[test]
    fn both_or_neither_routes_to_hybrid() {
        let router = QueryRouter::new();
        assert_eq!(router.route(""), RouteDecision::Hybrid);
        assert_eq!(router.route("tell me about GreenPower"), RouteDecision::Hybrid);
        assert_eq!(
            router.route("Why is the price of panel X so high?"),
            RouteDecision::Hybrid
        );
    }

    #[test]
    fn matching_is_word_bounded() {
        let router = QueryRouter::new();
        // "pricing" is not "price", "linked" is not "link"
        assert_eq!(router.route("pricing linked"), RouteDecision::Hybrid);
    }

    #[test]
    fn explain_lists_matching_rules() {
        let router = QueryRouter::new();
        let explanation = router.explain("Why did the price change over time?");

        assert_eq!(explanation.decision, RouteDecision::Hybrid);
        assert_eq!(explanation.factual_matches, vec![r"\bprices?\b".to_string()]);
        assert!(explanation.relational_matches.contains(&r"\bwhy\b".to_string()));
        assert!(explanation
            .relational_matches
            .contains(&r"\bover time\b".to_string()));
    }

    #[test]
    fn configured_patterns_extend_table() {
        let config = RoutingConfig {
            factual_patterns: vec![r"\bvoltage\b".into()],
            relational_patterns: vec![r"\bsupplier of\b".into()],
        };
        let router = QueryRouter::from_config(&config).unwrap();

        assert_eq!(router.route("rated voltage of S200"), RouteDecision::Vector);
        assert_eq!(router.route("who is the supplier of cells"), RouteDecision::Graph);
    }

    #[test]
    fn invalid_configured_pattern_is_config_error() {
        let config = RoutingConfig {
            factual_patterns: vec!["(unclosed".into()],
            relational_patterns: Vec::new(),
        };
        let err = QueryRouter::from_config(&config).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn custom_rule_table_replaces_defaults() {
        let router = QueryRouter::with_rules(vec![RouteRule::new(
            QueryCategory::Relational,
            r"\bprice\b",
        )
        .unwrap()]);
        assert_eq!(router.route("price of X"), RouteDecision::Graph);
        assert_eq!(router.route("what is X"), RouteDecision::Hybrid);
    }

    #[test]
    fn parses_route_aliases() {
        assert_eq!("vector".parse::<RouteDecision>().unwrap(), RouteDecision::Vector);
        assert_eq!("QDRANT".parse::<RouteDecision>().unwrap(), RouteDecision::Vector);
        assert_eq!("neo4j".parse::<RouteDecision>().unwrap(), RouteDecision::Graph);
        assert_eq!("local".parse::<RouteDecision>().unwrap(), RouteDecision::Graph);
        assert_eq!("global".parse::<RouteDecision>().unwrap(), RouteDecision::Hybrid);
        assert!("sideways".parse::<RouteDecision>().is_err());
    }

    #[test]
    fn route_decision_branch_flags() {
        assert!(RouteDecision::Vector.uses_vector());
        assert!(!RouteDecision::Vector.uses_graph());
        assert!(RouteDecision::Graph.uses_graph());
        assert!(!RouteDecision::Graph.uses_vector());
        assert!(RouteDecision::Hybrid.uses_vector() && RouteDecision::Hybrid.uses_graph());
        assert_eq!(RouteDecision::Hybrid.to_string(), "hybrid");
    }
}
