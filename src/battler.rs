//! Battler module.
//!
//! A battler is one combatant: host-owned stats and trait sources, plus the
//! TP state the engine owns (stored value, assigned rule, unlocked rules).
//! The engine never writes host stats except `hp` on a knock-out.

use crate::rule_id::RuleId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which unit a battler belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Player-controlled actors.
    Party,
    /// Enemies.
    Troop,
}

impl Side {
    /// The opposing side.
    pub fn opponents(self) -> Side {
        match self {
            Side::Party => Side::Troop,
            Side::Troop => Side::Party,
        }
    }
}

/// Host stats readable from formulas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattlerStats {
    pub hp: f64,
    pub mhp: f64,
    pub mp: f64,
    pub mmp: f64,
    /// TP charge rate.
    pub tcr: f64,
    /// TP regeneration rate, as a fraction of the maximum per turn.
    pub trg: f64,
    pub turn_count: u32,
}

impl Default for BattlerStats {
    fn default() -> Self {
        Self {
            hp: 100.0,
            mhp: 100.0,
            mp: 0.0,
            mmp: 0.0,
            tcr: 1.0,
            trg: 0.0,
            turn_count: 0,
        }
    }
}

/// Kind of object a trait comes from.
///
/// The declaration order is the order trait sources are visited in when
/// resolving forced rules and preserve overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TraitSourceKind {
    Actor,
    Class,
    Weapon,
    Armor,
    Enemy,
    State,
}

/// An object attached to a battler that may force a rule or override
/// preservation.
///
/// # Examples
///
/// ```rust
/// use zztp::{TraitSource, TraitSourceKind};
///
/// let state = TraitSource::new("Berserk", TraitSourceKind::State).forcing("Berserker");
/// assert_eq!(state.forced_rule.as_deref(), Some("Berserker"));
/// assert_eq!(state.preserve_resource, None);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitSource {
    pub name: String,
    pub kind: TraitSourceKind,
    #[serde(default)]
    pub forced_rule: Option<String>,
    #[serde(default)]
    pub preserve_resource: Option<bool>,
}

impl TraitSource {
    pub fn new(name: impl Into<String>, kind: TraitSourceKind) -> Self {
        Self {
            name: name.into(),
            kind,
            forced_rule: None,
            preserve_resource: None,
        }
    }

    /// Force a rule while this source is attached.
    pub fn forcing(mut self, rule: impl Into<String>) -> Self {
        self.forced_rule = Some(rule.into());
        self
    }

    /// Override whether the battler keeps its TP between battles.
    pub fn preserving(mut self, preserve: bool) -> Self {
        self.preserve_resource = Some(preserve);
        self
    }
}

/// One combatant.
///
/// # Examples
///
/// ```rust
/// use zztp::Battler;
///
/// let hero = Battler::actor("Harold").with_hp(450.0, 500.0).with_param("atk", 30.0);
///
/// assert!(hero.is_actor());
/// assert!(hero.is_alive());
/// assert_eq!(hero.tp(), 0.0);
/// assert_eq!(hero.param("atk"), Some(30.0));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Battler {
    name: String,
    side: Side,
    pub stats: BattlerStats,
    params: HashMap<String, f64>,
    traits: Vec<TraitSource>,
    pub(crate) tp: f64,
    pub(crate) assigned: Option<RuleId>,
    default_rule: Option<String>,
    starting_rules: Vec<String>,
    pub(crate) available: Vec<RuleId>,
}

impl Battler {
    pub fn new(name: impl Into<String>, side: Side) -> Self {
        Self {
            name: name.into(),
            side,
            stats: BattlerStats::default(),
            params: HashMap::new(),
            traits: Vec::new(),
            tp: 0.0,
            assigned: None,
            default_rule: None,
            starting_rules: Vec::new(),
            available: Vec::new(),
        }
    }

    /// A party member.
    pub fn actor(name: impl Into<String>) -> Self {
        Self::new(name, Side::Party)
    }

    /// A troop member.
    pub fn enemy(name: impl Into<String>) -> Self {
        Self::new(name, Side::Troop)
    }

    pub fn with_stats(mut self, stats: BattlerStats) -> Self {
        self.stats = stats;
        self
    }

    pub fn with_hp(mut self, hp: f64, mhp: f64) -> Self {
        self.stats.hp = hp;
        self.stats.mhp = mhp;
        self
    }

    pub fn with_mp(mut self, mp: f64, mmp: f64) -> Self {
        self.stats.mp = mp;
        self.stats.mmp = mmp;
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: f64) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    pub fn with_trait(mut self, source: TraitSource) -> Self {
        self.add_trait(source);
        self
    }

    /// Rule this battler starts with instead of the configured default.
    pub fn with_default_rule(mut self, name: impl Into<String>) -> Self {
        self.default_rule = Some(name.into());
        self
    }

    /// Rules unlocked for this battler at setup.
    pub fn with_starting_rules<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.starting_rules = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn is_actor(&self) -> bool {
        self.side == Side::Party
    }

    pub fn is_alive(&self) -> bool {
        self.stats.hp > 0.0
    }

    /// Current stored TP.
    pub fn tp(&self) -> f64 {
        self.tp
    }

    /// The explicitly assigned rule, ignoring forced rules.
    pub fn assigned_rule(&self) -> Option<&RuleId> {
        self.assigned.as_ref()
    }

    pub fn default_rule(&self) -> Option<&str> {
        self.default_rule.as_deref()
    }

    pub fn starting_rules(&self) -> &[String] {
        &self.starting_rules
    }

    /// Rules unlocked for this battler, in registry order.
    pub fn unlocked_rules(&self) -> &[RuleId] {
        &self.available
    }

    pub fn param(&self, name: &str) -> Option<f64> {
        self.params.get(name).copied()
    }

    pub fn set_param(&mut self, name: impl Into<String>, value: f64) {
        self.params.insert(name.into(), value);
    }

    /// Add a trait source after every source of the same or an earlier
    /// kind, so `traits` stays in resolution order.
    pub fn add_trait(&mut self, source: TraitSource) {
        let at = self.traits.partition_point(|existing| existing.kind <= source.kind);
        self.traits.insert(at, source);
    }

    /// Remove every trait source with the given name. Returns how many were
    /// removed.
    pub fn remove_trait(&mut self, name: &str) -> usize {
        let before = self.traits.len();
        self.traits.retain(|source| source.name != name);
        before - self.traits.len()
    }

    /// Trait sources in resolution order: by kind, then insertion order.
    pub fn trait_sources(&self) -> &[TraitSource] {
        &self.traits
    }

    pub fn hp_rate(&self) -> f64 {
        rate(self.stats.hp, self.stats.mhp)
    }

    pub fn mp_rate(&self) -> f64 {
        rate(self.stats.mp, self.stats.mmp)
    }
}

fn rate(value: f64, max: f64) -> f64 {
    if max > 0.0 {
        value / max
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trait_sources_sorted_by_kind_stably() {
        let battler = Battler::actor("Harold")
            .with_trait(TraitSource::new("Poison", TraitSourceKind::State))
            .with_trait(TraitSource::new("Sword", TraitSourceKind::Weapon))
            .with_trait(TraitSource::new("Harold", TraitSourceKind::Actor))
            .with_trait(TraitSource::new("Rage", TraitSourceKind::State))
            .with_trait(TraitSource::new("Shield", TraitSourceKind::Armor));

        let names: Vec<&str> = battler
            .trait_sources()
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["Harold", "Sword", "Shield", "Poison", "Rage"]);
    }

    #[test]
    fn test_add_trait_keeps_resolution_order() {
        let mut battler = Battler::actor("Harold")
            .with_trait(TraitSource::new("Knight", TraitSourceKind::Class))
            .with_trait(TraitSource::new("Poison", TraitSourceKind::State));
        battler.add_trait(TraitSource::new("Harold", TraitSourceKind::Actor));
        battler.add_trait(TraitSource::new("Squire", TraitSourceKind::Class));
        battler.add_trait(TraitSource::new("Rage", TraitSourceKind::State));
        battler.remove_trait("Poison");
        battler.add_trait(TraitSource::new("Poison", TraitSourceKind::State));

        let names: Vec<&str> = battler
            .trait_sources()
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["Harold", "Knight", "Squire", "Rage", "Poison"]);
    }

    #[test]
    fn test_remove_trait() {
        let mut battler = Battler::enemy("Slime")
            .with_trait(TraitSource::new("Rage", TraitSourceKind::State))
            .with_trait(TraitSource::new("Rage", TraitSourceKind::State));
        assert_eq!(battler.remove_trait("Rage"), 2);
        assert!(battler.trait_sources().is_empty());
    }

    #[test]
    fn test_alive_and_rates() {
        let mut battler = Battler::enemy("Bat").with_hp(25.0, 100.0);
        assert!(battler.is_alive());
        assert_eq!(battler.hp_rate(), 0.25);
        assert_eq!(battler.mp_rate(), 0.0);
        battler.stats.hp = 0.0;
        assert!(!battler.is_alive());
        assert!(!battler.is_actor());
    }

    #[test]
    fn test_opponents() {
        assert_eq!(Side::Party.opponents(), Side::Troop);
        assert_eq!(Side::Troop.opponents(), Side::Party);
    }
}
