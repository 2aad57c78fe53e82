//! Configuration module.
//!
//! Engine-wide settings and the rule book, the JSON document that bundles
//! settings with rule definitions.

use crate::engine::RuleEngine;
use crate::error::RuleError;
use crate::registry::RuleRegistry;
use crate::rule::RuleDefinition;
use crate::rule_id::RuleId;
use serde::{Deserialize, Serialize};

const STOCK_RULES: &str = include_str!("../data/stock_rules.json");

/// Engine-wide settings.
///
/// # Examples
///
/// ```rust
/// use zztp::EngineConfig;
///
/// let config = EngineConfig::default()
///     .with_default_rule("Warrior")
///     .with_diagnostics(true);
///
/// assert_eq!(config.default_rule, "Warrior");
/// assert_eq!(config.global_rules.len(), 4);
/// assert_eq!(config.baseline_max, 100.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Rule used by battlers with no assignment and no default of their own.
    pub default_rule: String,
    /// Rules every actor can pick from without unlocking them.
    pub global_rules: Vec<String>,
    /// Maximum used when a battler has no active rule.
    pub baseline_max: f64,
    /// Emit a warning for every formula failure coerced to zero.
    pub diagnostics: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_rule: "Stoic".to_string(),
            global_rules: ["Stoic", "Comrade", "Warrior", "Healer"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            baseline_max: 100.0,
            diagnostics: false,
        }
    }
}

impl EngineConfig {
    pub fn with_default_rule(mut self, name: impl Into<String>) -> Self {
        self.default_rule = name.into();
        self
    }

    pub fn with_global_rules<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.global_rules = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_baseline_max(mut self, baseline_max: f64) -> Self {
        self.baseline_max = baseline_max;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: bool) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Normalized ids of the global rules, skipping blank entries.
    pub fn global_rule_ids(&self) -> Vec<RuleId> {
        self.global_rules
            .iter()
            .map(RuleId::from)
            .filter(|id| !id.is_blank())
            .collect()
    }
}

/// Settings plus rule definitions, as loaded from JSON.
///
/// # Examples
///
/// ```rust
/// use zztp::RuleBook;
///
/// let book = RuleBook::from_json(r#"{
///     "general": { "defaultRule": "Recycler" },
///     "rules": [
///         { "name": "Recycler", "maxFormula": "20", "formulas": { "TpRegen": "20" } }
///     ]
/// }"#).unwrap();
///
/// let engine = book.into_engine();
/// assert!(engine.registry().get("recycler").is_some());
/// assert_eq!(engine.config().default_rule, "Recycler");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleBook {
    pub general: EngineConfig,
    pub rules: Vec<RuleDefinition>,
}

impl RuleBook {
    /// Parse a rule book from JSON text.
    pub fn from_json(json: &str) -> Result<Self, RuleError> {
        Ok(serde_json::from_str(json)?)
    }

    /// The thirty stock TP modes with the stock settings.
    pub fn stock() -> Self {
        // Parsing is checked by test_stock_book_parses.
        Self::from_json(STOCK_RULES).unwrap_or_default()
    }

    /// Build an engine, registering rules in book order.
    pub fn into_engine(self) -> RuleEngine {
        RuleEngine::new(RuleRegistry::from_definitions(self.rules), self.general)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trigger::TriggerKind;

    #[test]
    fn test_config_defaults_from_empty_json() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_global_rule_ids_skip_blank() {
        let config = EngineConfig::default().with_global_rules(["Stoic", "  ", "warrior"]);
        assert_eq!(
            config.global_rule_ids(),
            vec![RuleId::new("STOIC"), RuleId::new("WARRIOR")]
        );
    }

    #[test]
    fn test_stock_book_parses() {
        let book = RuleBook::from_json(STOCK_RULES).unwrap();
        assert_eq!(book.rules.len(), 30);
        assert_eq!(book.general, EngineConfig::default());
        assert_eq!(book.rules[0].name, "Stoic");
    }

    #[test]
    fn test_stock_formulas_all_parse() {
        let engine = RuleBook::stock().into_engine();
        for rule in engine.registry().rules() {
            assert!(rule.max_formula().is_valid(), "{} max", rule.name());
            for kind in TriggerKind::ALL {
                assert!(rule.formula(kind).is_valid(), "{} {}", rule.name(), kind);
            }
        }
    }

    #[test]
    fn test_invalid_json_is_error() {
        let err = RuleBook::from_json("{ \"rules\": 5 }").unwrap_err();
        assert!(matches!(err, RuleError::InvalidConfig(_)));
    }
}
