//! Resource module.
//!
//! Reads and writes a battler's stored TP. Every write clamps to
//! `[0, current_max]`, and amounts are floored before they are added, so
//! the stored value stays integral.

use crate::battler::Battler;
use crate::engine::RuleEngine;
use crate::trigger::{FormulaSlot, TriggerKind};
use tracing::trace;

impl RuleEngine {
    /// The battler's current maximum TP.
    ///
    /// Evaluates the active rule's max formula with the battler as both
    /// `user` and `target` and `value` 0. A failing max formula gives 0.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use zztp::{Battler, RuleEngine};
    ///
    /// let engine = RuleEngine::stock();
    /// let mut hero = Battler::actor("Harold");
    /// assert_eq!(engine.current_max(&hero), 100.0);
    ///
    /// engine.assign(&mut hero, "Maximizer");
    /// assert_eq!(engine.current_max(&hero), 300.0);
    /// ```
    pub fn current_max(&self, battler: &Battler) -> f64 {
        match self.try_max(battler) {
            Ok(max) => max,
            Err(err) => {
                self.report(battler, FormulaSlot::Max, &err);
                0.0
            }
        }
    }

    /// Add `amount` (floored) to the stored TP and clamp.
    ///
    /// Non-finite amounts are ignored.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use zztp::{Battler, RuleEngine};
    ///
    /// let engine = RuleEngine::stock();
    /// let mut hero = Battler::actor("Harold");
    ///
    /// engine.gain(&mut hero, 12.9);
    /// assert_eq!(hero.tp(), 12.0);
    /// engine.gain(&mut hero, 500.0);
    /// assert_eq!(hero.tp(), 100.0);
    /// engine.gain(&mut hero, -1000.0);
    /// assert_eq!(hero.tp(), 0.0);
    /// ```
    pub fn gain(&self, battler: &mut Battler, amount: f64) {
        if !amount.is_finite() {
            return;
        }
        let max = self.current_max(battler);
        battler.tp = (battler.tp + amount.floor()).clamp(0.0, max);
    }

    /// Set the stored TP directly, floored and clamped.
    pub fn set_tp(&self, battler: &mut Battler, value: f64) {
        if !value.is_finite() {
            return;
        }
        let max = self.current_max(battler);
        battler.tp = value.floor().clamp(0.0, max);
    }

    /// Evaluate the trigger formula for `user` and floor the result.
    pub fn trigger_gain(&self, user: &Battler, kind: TriggerKind, target: &Battler, value: f64) -> f64 {
        self.evaluate(user, kind, target, value).floor()
    }

    /// Evaluate a trigger for `user` and add the result.
    pub fn apply_trigger(&self, user: &mut Battler, kind: TriggerKind, target: &Battler, value: f64) {
        let amount = self.trigger_gain(user, kind, target, value);
        self.add_gain(user, kind, amount);
    }

    /// Apply a gain computed for `kind`, with a trace record.
    pub(crate) fn add_gain(&self, battler: &mut Battler, kind: TriggerKind, amount: f64) {
        let before = battler.tp;
        self.gain(battler, amount);
        trace!(
            battler = battler.name(),
            trigger = %kind,
            amount,
            before,
            after = battler.tp,
            "tp gain"
        );
    }

    /// Re-clamp the stored TP to the current maximum.
    pub fn clamp_resource(&self, battler: &mut Battler) {
        let max = self.current_max(battler);
        battler.tp = battler.tp.clamp(0.0, max);
    }

    /// Set the stored TP to 0.
    pub fn clear(&self, battler: &mut Battler) {
        battler.tp = 0.0;
    }

    /// Start a new battle cycle.
    ///
    /// Unless the battler is preserving, the stored TP becomes the
    /// `Initial` formula's result applied to zero, clamped.
    pub fn reset_for_cycle(&self, battler: &mut Battler) {
        if self.is_preserving(battler) {
            return;
        }
        battler.tp = 0.0;
        let initial = self.trigger_gain(battler, TriggerKind::Initial, battler, 0.0);
        self.add_gain(battler, TriggerKind::Initial, initial);
    }

    /// Whether the battler keeps its TP across battles.
    ///
    /// The first trait source with a preserve override decides; otherwise
    /// the active rule's flag. No active rule means not preserving.
    pub fn is_preserving(&self, battler: &Battler) -> bool {
        battler
            .trait_sources()
            .into_iter()
            .find_map(|source| source.preserve_resource)
            .or_else(|| self.active_rule(battler).map(|rule| rule.preserves()))
            .unwrap_or(false)
    }

    /// Stored TP as a fraction of the maximum; 0 when the maximum is 0.
    pub fn tp_rate(&self, battler: &Battler) -> f64 {
        let max = self.current_max(battler);
        if max > 0.0 {
            battler.tp / max
        } else {
            0.0
        }
    }

    /// Whether the TP gauge should flash.
    pub fn is_gauge_flashing(&self, battler: &Battler) -> bool {
        let Some(rule) = self.active_rule(battler) else {
            return false;
        };
        let gauge = &rule.metadata().gauge;
        gauge.flash && self.tp_rate(battler) >= gauge.flash_requirement
    }
}

#[cfg(test)]
mod tests {
    use crate::battler::{Battler, TraitSource, TraitSourceKind};
    use crate::config::EngineConfig;
    use crate::engine::RuleEngine;
    use crate::registry::RuleRegistry;
    use crate::rule::RuleDefinition;
    use crate::trigger::TriggerKind;

    fn engine(defs: Vec<RuleDefinition>) -> RuleEngine {
        let config = EngineConfig::default().with_default_rule(defs[0].name.clone());
        RuleEngine::new(RuleRegistry::from_definitions(defs), config)
    }

    #[test]
    fn test_current_max_is_idempotent() {
        let engine = engine(vec![RuleDefinition::new("Hp").with_max_formula("user.mhp / 3")]);
        let battler = Battler::actor("A").with_hp(100.0, 100.0);
        assert_eq!(engine.current_max(&battler), 33.0);
        assert_eq!(engine.current_max(&battler), engine.current_max(&battler));
    }

    #[test]
    fn test_failing_max_is_zero() {
        let engine = engine(vec![RuleDefinition::new("Bad").with_max_formula("user.nope")]);
        let mut battler = Battler::actor("A");
        assert_eq!(engine.current_max(&battler), 0.0);
        engine.gain(&mut battler, 50.0);
        assert_eq!(battler.tp(), 0.0);
    }

    #[test]
    fn test_gain_ignores_non_finite() {
        let engine = engine(vec![RuleDefinition::new("Plain")]);
        let mut battler = Battler::actor("A");
        engine.gain(&mut battler, 10.0);
        engine.gain(&mut battler, f64::NAN);
        engine.gain(&mut battler, f64::INFINITY);
        assert_eq!(battler.tp(), 10.0);
    }

    #[test]
    fn test_gain_floors_negative_amounts() {
        let engine = engine(vec![RuleDefinition::new("Plain")]);
        let mut battler = Battler::actor("A");
        engine.gain(&mut battler, 10.0);
        engine.gain(&mut battler, -0.5);
        assert_eq!(battler.tp(), 9.0);
    }

    #[test]
    fn test_clamp_after_max_shrinks() {
        let engine = engine(vec![
            RuleDefinition::new("Big").with_max_formula("300"),
            RuleDefinition::new("Small").with_max_formula("50"),
        ]);
        let mut battler = Battler::actor("A");
        engine.gain(&mut battler, 200.0);
        assert_eq!(battler.tp(), 200.0);
        engine.assign(&mut battler, "Small");
        assert_eq!(battler.tp(), 50.0);
    }

    #[test]
    fn test_reset_for_cycle() {
        let engine = engine(vec![
            RuleDefinition::new("Keep").with_formula(TriggerKind::Initial, "20"),
            RuleDefinition::new("Fresh")
                .with_preserve(false)
                .with_formula(TriggerKind::Initial, "20"),
        ]);
        let mut keep = Battler::actor("A");
        engine.set_tp(&mut keep, 70.0);
        engine.reset_for_cycle(&mut keep);
        assert_eq!(keep.tp(), 70.0);

        let mut fresh = Battler::actor("B");
        engine.assign(&mut fresh, "Fresh");
        engine.set_tp(&mut fresh, 70.0);
        engine.reset_for_cycle(&mut fresh);
        assert_eq!(fresh.tp(), 20.0);
    }

    #[test]
    fn test_preserve_override_from_trait() {
        let engine = engine(vec![RuleDefinition::new("Keep")]);
        let battler = Battler::actor("A")
            .with_trait(TraitSource::new("Curse", TraitSourceKind::State).preserving(false))
            .with_trait(TraitSource::new("Amulet", TraitSourceKind::Armor).preserving(true));
        // Armor sorts before State.
        assert!(engine.is_preserving(&battler));

        let cursed = Battler::actor("B")
            .with_trait(TraitSource::new("Curse", TraitSourceKind::State).preserving(false));
        assert!(!engine.is_preserving(&cursed));
    }

    #[test]
    fn test_no_rule_is_not_preserving() {
        let engine = RuleEngine::new(RuleRegistry::new(), EngineConfig::default());
        assert!(!engine.is_preserving(&Battler::actor("A")));
    }

    #[test]
    fn test_gauge_flashing() {
        let mut def = RuleDefinition::new("Gauge");
        def.gauge.flash_requirement = 0.5;
        let engine = engine(vec![def]);
        let mut battler = Battler::actor("A");
        engine.gain(&mut battler, 49.0);
        assert!(!engine.is_gauge_flashing(&battler));
        engine.gain(&mut battler, 1.0);
        assert_eq!(engine.tp_rate(&battler), 0.5);
        assert!(engine.is_gauge_flashing(&battler));
    }
}
