//! Rule selection module.
//!
//! Decides which rule is active for a battler and manages the assigned and
//! unlocked rules. Resolution order, highest priority first:
//!
//! 1. the first registered forced rule among the battler's trait sources,
//! 2. the assigned rule,
//! 3. the battler's own default rule, if registered,
//! 4. the configured default rule.
//!
//! A forced rule never changes the assignment; once the forcing trait is
//! removed the assigned rule is active again.

use crate::battler::Battler;
use crate::engine::RuleEngine;
use crate::rule::Rule;
use crate::rule_id::RuleId;
use tracing::debug;

impl RuleEngine {
    /// The forced rule in effect, if any.
    ///
    /// Trait sources are scanned in resolution order; forced names that are
    /// not registered are skipped.
    pub fn forced_rule(&self, battler: &Battler) -> Option<RuleId> {
        battler
            .trait_sources()
            .into_iter()
            .filter_map(|source| source.forced_rule.as_deref())
            .map(RuleId::new)
            .find(|id| self.registry().contains(id))
    }

    /// Id of the active rule.
    ///
    /// The configured default is returned even when it is not registered;
    /// [`active_rule`](Self::active_rule) is `None` in that case.
    pub fn active_rule_id(&self, battler: &Battler) -> RuleId {
        if let Some(forced) = self.forced_rule(battler) {
            return forced;
        }
        if let Some(assigned) = battler.assigned_rule() {
            if self.registry().contains(assigned) {
                return assigned.clone();
            }
        }
        if let Some(own) = battler.default_rule().map(RuleId::new) {
            if self.registry().contains(&own) {
                return own;
            }
        }
        RuleId::new(&self.config().default_rule)
    }

    /// The active rule, or `None` when nothing resolvable is registered.
    pub fn active_rule(&self, battler: &Battler) -> Option<&Rule> {
        self.registry().get_id(&self.active_rule_id(battler))
    }

    /// Assign a rule by name.
    ///
    /// Unregistered names are ignored and return `false`. On success the
    /// stored TP is clamped to the new maximum, and actors unlock the rule.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use zztp::{Battler, RuleEngine, RuleId};
    ///
    /// let engine = RuleEngine::stock();
    /// let mut hero = Battler::actor("Harold");
    ///
    /// assert!(!engine.assign(&mut hero, "Nonexistent"));
    /// assert_eq!(engine.active_rule_id(&hero), RuleId::new("Stoic"));
    ///
    /// assert!(engine.assign(&mut hero, "recycler"));
    /// assert_eq!(engine.active_rule_id(&hero), RuleId::new("Recycler"));
    /// assert!(hero.unlocked_rules().contains(&RuleId::new("Recycler")));
    /// ```
    pub fn assign(&self, battler: &mut Battler, name: &str) -> bool {
        let id = RuleId::new(name);
        if !self.registry().contains(&id) {
            debug!(battler = battler.name(), rule = %id, "ignored unknown rule");
            return false;
        }
        debug!(battler = battler.name(), rule = %id, "assigned rule");
        battler.assigned = Some(id.clone());
        self.clamp_resource(battler);
        if battler.is_actor() {
            self.unlock_id(battler, id);
        }
        true
    }

    /// Unlock a rule for a battler.
    ///
    /// Returns `true` if the rule was registered and not yet unlocked.
    pub fn unlock(&self, battler: &mut Battler, name: &str) -> bool {
        let id = RuleId::new(name);
        if !self.registry().contains(&id) {
            return false;
        }
        self.unlock_id(battler, id)
    }

    fn unlock_id(&self, battler: &mut Battler, id: RuleId) -> bool {
        if battler.available.contains(&id) {
            return false;
        }
        battler.available.push(id);
        battler.available = self.registry().sort_by_registration(&battler.available);
        true
    }

    /// Unlock the rules a skill teaches when an actor learns it.
    ///
    /// Enemies learn nothing. Unregistered and already unlocked names are
    /// skipped. Returns how many rules were newly unlocked.
    pub fn learn_skill(&self, battler: &mut Battler, teaches: &[String]) -> usize {
        if !battler.is_actor() {
            return 0;
        }
        let learned = teaches
            .iter()
            .filter(|name| self.unlock(battler, name))
            .count();
        if learned > 0 {
            debug!(battler = battler.name(), learned, "skill taught TP rules");
        }
        learned
    }

    /// Unlock every registered rule.
    pub fn unlock_all(&self, battler: &mut Battler) {
        battler.available = self.registry().names().cloned().collect();
    }

    /// Rules a battler can choose from: the global rules plus its unlocked
    /// rules, registered only, in registry order.
    pub fn available_rules(&self, battler: &Battler) -> Vec<RuleId> {
        let candidates: Vec<RuleId> = self
            .config()
            .global_rule_ids()
            .into_iter()
            .chain(battler.available.iter().cloned())
            .collect();
        self.registry().sort_by_registration(&candidates)
    }

    /// Prepare a battler's rule state when it joins.
    ///
    /// Assigns its own default rule (or the configured default), unlocks
    /// the global and starting rules for actors, and clamps the stored TP.
    pub fn setup(&self, battler: &mut Battler) {
        let preferred = battler
            .default_rule()
            .map(str::to_string)
            .unwrap_or_else(|| self.config().default_rule.clone());
        if !self.assign(battler, &preferred) {
            let fallback = self.config().default_rule.clone();
            self.assign(battler, &fallback);
        }
        if battler.is_actor() {
            let names: Vec<String> = self
                .config()
                .global_rules
                .iter()
                .chain(battler.starting_rules())
                .cloned()
                .collect();
            for name in names {
                self.unlock(battler, &name);
            }
        }
        self.clamp_resource(battler);
    }
}
