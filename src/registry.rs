//! Rule registry module.
//!
//! Stores every known rule by normalized name and remembers the order in
//! which names were first registered. That order is the display order of
//! rule lists.

use crate::rule::{Rule, RuleDefinition};
use crate::rule_id::RuleId;
use std::collections::HashMap;
use tracing::debug;

/// Registry of rules keyed by [`RuleId`].
///
/// # Examples
///
/// ```rust
/// use zztp::{RuleDefinition, RuleRegistry};
///
/// let mut registry = RuleRegistry::new();
/// registry.register(RuleDefinition::new("Stoic").into());
/// registry.register(RuleDefinition::new("Warrior").into());
///
/// assert!(registry.get("warrior").is_some());
/// assert!(registry.get("Nonexistent").is_none());
///
/// let names: Vec<&str> = registry.names().map(|id| id.as_str()).collect();
/// assert_eq!(names, vec!["STOIC", "WARRIOR"]);
/// ```
#[derive(Debug, Default)]
pub struct RuleRegistry {
    rules: HashMap<RuleId, Rule>,
    order: Vec<RuleId>,
}

impl RuleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from definitions, in order.
    pub fn from_definitions<I>(definitions: I) -> Self
    where
        I: IntoIterator<Item = RuleDefinition>,
    {
        let mut registry = Self::new();
        for def in definitions {
            registry.register(Rule::from(def));
        }
        registry
    }

    /// Insert or replace a rule.
    ///
    /// A new name is appended to the registration order. Replacing an
    /// existing rule keeps its original position.
    pub fn register(&mut self, rule: Rule) {
        let id = rule.id().clone();
        if self.rules.insert(id.clone(), rule).is_some() {
            debug!(rule = %id, "replaced rule");
        } else {
            debug!(rule = %id, "registered rule");
            self.order.push(id);
        }
    }

    /// Look up a rule by name. Unknown names return `None`.
    pub fn get(&self, name: impl Into<RuleId>) -> Option<&Rule> {
        self.rules.get(&name.into())
    }

    /// Look up a rule by an already normalized id.
    pub fn get_id(&self, id: &RuleId) -> Option<&Rule> {
        self.rules.get(id)
    }

    pub fn contains(&self, id: &RuleId) -> bool {
        self.rules.contains_key(id)
    }

    /// Registered ids in registration order.
    ///
    /// The iterator is lazy and cheap to clone; each call starts over.
    pub fn names(&self) -> std::slice::Iter<'_, RuleId> {
        self.order.iter()
    }

    /// Rules in registration order.
    pub fn rules(&self) -> impl Iterator<Item = &Rule> + '_ {
        self.order.iter().filter_map(move |id| self.rules.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Keep only registered ids from `ids` and return them in registration
    /// order, without duplicates.
    pub fn sort_by_registration<'a, I>(&self, ids: I) -> Vec<RuleId>
    where
        I: IntoIterator<Item = &'a RuleId>,
    {
        let wanted: Vec<&RuleId> = ids.into_iter().collect();
        self.order
            .iter()
            .filter(|id| wanted.contains(id))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trigger::TriggerKind;

    fn registry_of(names: &[&str]) -> RuleRegistry {
        RuleRegistry::from_definitions(names.iter().map(|n| RuleDefinition::new(*n)))
    }

    #[test]
    fn test_register_and_get_case_insensitive() {
        let registry = registry_of(&["Stoic"]);
        assert!(registry.get("STOIC").is_some());
        assert!(registry.get(" stoic ").is_some());
        assert_eq!(registry.get("stoic").unwrap().name(), "Stoic");
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut registry = registry_of(&["Stoic", "Comrade", "Warrior"]);
        registry.register(Rule::from(
            RuleDefinition::new("comrade").with_formula(TriggerKind::AllyHpDmg, "5"),
        ));

        assert_eq!(registry.len(), 3);
        let names: Vec<&str> = registry.names().map(|id| id.as_str()).collect();
        assert_eq!(names, vec!["STOIC", "COMRADE", "WARRIOR"]);
        assert!(registry
            .get("Comrade")
            .unwrap()
            .has_formula(TriggerKind::AllyHpDmg));
    }

    #[test]
    fn test_names_restarts_and_clones() {
        let registry = registry_of(&["A", "B"]);
        let iter = registry.names();
        let copy = iter.clone();
        assert_eq!(iter.count(), 2);
        assert_eq!(copy.count(), 2);
        assert_eq!(registry.names().next(), Some(&RuleId::new("A")));
    }

    #[test]
    fn test_sort_by_registration_filters_and_orders() {
        let registry = registry_of(&["Stoic", "Comrade", "Warrior"]);
        let ids = vec![
            RuleId::new("Warrior"),
            RuleId::new("Ghost"),
            RuleId::new("Stoic"),
            RuleId::new("warrior"),
        ];
        assert_eq!(
            registry.sort_by_registration(&ids),
            vec![RuleId::new("Stoic"), RuleId::new("Warrior")]
        );
    }

    #[test]
    fn test_empty_registry() {
        let registry = RuleRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.get("Stoic").is_none());
        assert_eq!(registry.rules().count(), 0);
    }
}
