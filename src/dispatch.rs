//! Trigger dispatch module.
//!
//! [`Battle`] owns both units for the length of an encounter and turns host
//! combat events into trigger gains. Each hook fires its triggers in a
//! fixed order. Every gain is evaluated with shared borrows of the battlers
//! involved and then written to the gaining battler alone.
//!
//! Hooks report what happened; they do not apply damage or states
//! themselves. Call them after the host has updated its stats.

use crate::battler::{Battler, Side};
use crate::engine::RuleEngine;
use crate::trigger::TriggerKind;
use serde::{Deserialize, Serialize};

/// Address of a battler within a [`Battle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BattlerRef {
    pub side: Side,
    pub index: usize,
}

impl BattlerRef {
    pub fn party(index: usize) -> Self {
        Self {
            side: Side::Party,
            index,
        }
    }

    pub fn troop(index: usize) -> Self {
        Self {
            side: Side::Troop,
            index,
        }
    }
}

/// Result flags of an action against one target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HitOutcome {
    pub critical: bool,
    pub evaded: bool,
    pub missed: bool,
}

/// What kind of action a battler used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    Attack,
    Guard,
    Skill,
    Item,
}

/// How a battle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BattleOutcome {
    Win,
    Flee,
    Lose,
}

impl BattleOutcome {
    /// The trigger fired for the party.
    pub fn trigger(self) -> TriggerKind {
        match self {
            BattleOutcome::Win => TriggerKind::WinBattle,
            BattleOutcome::Flee => TriggerKind::FleeBattle,
            BattleOutcome::Lose => TriggerKind::LoseBattle,
        }
    }
}

/// Rule changes carried by a skill or item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuleEffects {
    /// Assign this rule to the user.
    pub change_user: Option<String>,
    /// Assign this rule to the target.
    pub change_target: Option<String>,
    /// Unlock these rules for the target, if it is an actor.
    pub unlock: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
enum Pool {
    Hp,
    Mp,
}

#[derive(Debug, Clone, Copy)]
enum Effect {
    Buff,
    Debuff,
    State,
}

/// One encounter: both units plus the engine that scores them.
///
/// # Examples
///
/// ```rust
/// use zztp::{Battle, BattlerRef, Battler, RuleEngine};
///
/// let engine = RuleEngine::stock();
/// let mut hero = Battler::actor("Harold").with_hp(500.0, 500.0);
/// engine.assign(&mut hero, "Warrior");
/// let slime = Battler::enemy("Slime").with_hp(100.0, 100.0);
///
/// let mut battle = Battle::new(&engine, vec![hero], vec![slime]);
/// battle.start();
/// battle.hp_damage(BattlerRef::party(0), BattlerRef::troop(0), 50.0);
///
/// assert_eq!(battle.party()[0].tp(), 16.0);
/// ```
#[derive(Debug)]
pub struct Battle<'e> {
    engine: &'e RuleEngine,
    party: Vec<Battler>,
    troop: Vec<Battler>,
    in_combat: bool,
}

impl<'e> Battle<'e> {
    /// Create a battle. Combat begins with [`start`](Self::start).
    pub fn new(engine: &'e RuleEngine, party: Vec<Battler>, troop: Vec<Battler>) -> Self {
        Self {
            engine,
            party,
            troop,
            in_combat: false,
        }
    }

    pub fn engine(&self) -> &'e RuleEngine {
        self.engine
    }

    pub fn in_combat(&self) -> bool {
        self.in_combat
    }

    pub fn party(&self) -> &[Battler] {
        &self.party
    }

    pub fn troop(&self) -> &[Battler] {
        &self.troop
    }

    pub fn party_mut(&mut self) -> &mut [Battler] {
        &mut self.party
    }

    pub fn troop_mut(&mut self) -> &mut [Battler] {
        &mut self.troop
    }

    /// Give the units back, e.g. to carry preserved TP to the next battle.
    pub fn into_units(self) -> (Vec<Battler>, Vec<Battler>) {
        (self.party, self.troop)
    }

    pub fn battler(&self, at: BattlerRef) -> Option<&Battler> {
        self.unit(at.side).get(at.index)
    }

    pub fn battler_mut(&mut self, at: BattlerRef) -> Option<&mut Battler> {
        match at.side {
            Side::Party => self.party.get_mut(at.index),
            Side::Troop => self.troop.get_mut(at.index),
        }
    }

    fn unit(&self, side: Side) -> &[Battler] {
        match side {
            Side::Party => &self.party,
            Side::Troop => &self.troop,
        }
    }

    fn alive_members(&self, side: Side) -> Vec<BattlerRef> {
        self.unit(side)
            .iter()
            .enumerate()
            .filter(|(_, battler)| battler.is_alive())
            .map(|(index, _)| BattlerRef { side, index })
            .collect()
    }

    fn all_members(&self) -> Vec<BattlerRef> {
        (0..self.party.len())
            .map(BattlerRef::party)
            .chain((0..self.troop.len()).map(BattlerRef::troop))
            .collect()
    }

    /// Evaluate `kind` for `who` against `target` and apply the gain.
    ///
    /// Out of combat, only battlers whose active rule is always active
    /// gain anything. Unknown references are ignored.
    pub fn fire(&mut self, who: BattlerRef, kind: TriggerKind, target: BattlerRef, value: f64) {
        let engine = self.engine;
        let amount = {
            let (Some(user), Some(target)) = (self.battler(who), self.battler(target)) else {
                return;
            };
            let active = engine
                .active_rule(user)
                .map_or(false, |rule| self.in_combat || rule.always_active());
            if !active {
                return;
            }
            engine.trigger_gain(user, kind, target, value)
        };
        if let Some(user) = self.battler_mut(who) {
            engine.add_gain(user, kind, amount);
        }
    }

    fn fire_unit(&mut self, side: Side, kind: TriggerKind, target: BattlerRef, value: f64) {
        for member in self.alive_members(side) {
            self.fire(member, kind, target, value);
        }
    }

    /// Enter combat.
    ///
    /// Non-preserving battlers restart from their `Initial` formula;
    /// preserving battlers add it to what they kept.
    pub fn start(&mut self) {
        self.in_combat = true;
        let engine = self.engine;
        for at in self.all_members() {
            let preserving = match self.battler(at) {
                Some(battler) => engine.is_preserving(battler),
                None => continue,
            };
            if preserving {
                self.fire(at, TriggerKind::Initial, at, 0.0);
            } else if let Some(battler) = self.battler_mut(at) {
                engine.reset_for_cycle(battler);
            }
        }
    }

    /// An action from `subject` resolved against `target`.
    pub fn action_hit(&mut self, subject: BattlerRef, target: BattlerRef, outcome: HitOutcome) {
        if outcome.critical {
            self.fire(subject, TriggerKind::CriticalHit, target, 0.0);
        }
        if outcome.evaded || outcome.missed {
            self.fire(target, TriggerKind::Evasion, target, 0.0);
        }
    }

    /// `user` used an action. Attacks and guards trigger nothing.
    pub fn use_action(&mut self, user: BattlerRef, action: ActionKind) {
        match action {
            ActionKind::Skill => self.fire(user, TriggerKind::UseSkill, user, 0.0),
            ActionKind::Item => self.fire(user, TriggerKind::UseItem, user, 0.0),
            ActionKind::Attack | ActionKind::Guard => {}
        }
    }

    /// `subject` changed `target`'s HP. Positive amounts are damage;
    /// zero and negative amounts are healing.
    pub fn hp_damage(&mut self, subject: BattlerRef, target: BattlerRef, amount: f64) {
        self.pool_damage(Pool::Hp, subject, target, amount);
    }

    /// `subject` changed `target`'s MP. Positive amounts are damage.
    pub fn mp_damage(&mut self, subject: BattlerRef, target: BattlerRef, amount: f64) {
        self.pool_damage(Pool::Mp, subject, target, amount);
    }

    fn pool_damage(&mut self, pool: Pool, subject: BattlerRef, target: BattlerRef, amount: f64) {
        use TriggerKind::*;
        let (take, deal, ally) = match (pool, amount > 0.0) {
            (Pool::Hp, true) => (TakeHpDmg, DealHpDmg, AllyHpDmg),
            (Pool::Hp, false) => (TakeHpHeal, DealHpHeal, AllyHpHeal),
            (Pool::Mp, true) => (TakeMpDmg, DealMpDmg, AllyMpDmg),
            (Pool::Mp, false) => (TakeMpHeal, DealMpHeal, AllyMpHeal),
        };
        let value = amount.abs();
        self.fire(target, take, target, value);
        self.fire(subject, deal, target, value);
        self.fire_unit(target.side, ally, target, value);
    }

    /// `subject` buffed `target`.
    pub fn buff_added(&mut self, subject: BattlerRef, target: BattlerRef) {
        self.effect_added(Effect::Buff, subject, target);
    }

    /// `subject` debuffed `target`.
    pub fn debuff_added(&mut self, subject: BattlerRef, target: BattlerRef) {
        self.effect_added(Effect::Debuff, subject, target);
    }

    /// `subject` inflicted a state on `target`.
    pub fn state_added(&mut self, subject: BattlerRef, target: BattlerRef) {
        self.effect_added(Effect::State, subject, target);
    }

    fn effect_added(&mut self, effect: Effect, subject: BattlerRef, target: BattlerRef) {
        use TriggerKind::*;
        let (deal, gain) = match (effect, subject.side == target.side) {
            (Effect::Buff, true) => (DealAllyBuff, GainAllyBuff),
            (Effect::Buff, false) => (DealEnemyBuff, GainEnemyBuff),
            (Effect::Debuff, true) => (DealAllyDebuff, GainAllyDebuff),
            (Effect::Debuff, false) => (DealEnemyDebuff, GainEnemyDebuff),
            (Effect::State, true) => (DealAllyState, GainAllyState),
            (Effect::State, false) => (DealEnemyState, GainEnemyState),
        };
        self.fire(subject, deal, target, 0.0);
        self.fire(target, gain, target, 0.0);
    }

    /// Knock out `victim`.
    ///
    /// Only a living battler can be knocked out: its HP drops to 0, its
    /// living allies gain `KillAlly` and the living opponents `KillEnemy`.
    /// Returns `false` if the battler was already down or does not exist.
    pub fn knock_out(&mut self, victim: BattlerRef) -> bool {
        match self.battler_mut(victim) {
            Some(battler) if battler.is_alive() => battler.stats.hp = 0.0,
            _ => return false,
        }
        self.fire_unit(victim.side, TriggerKind::KillAlly, victim, 0.0);
        self.fire_unit(victim.side.opponents(), TriggerKind::KillEnemy, victim, 0.0);
        true
    }

    /// Turn-end regeneration for one battler. Does nothing out of combat.
    pub fn regenerate(&mut self, at: BattlerRef) {
        if !self.in_combat {
            return;
        }
        let engine = self.engine;
        let Some(battler) = self.battler(at) else {
            return;
        };
        let base = (engine.current_max(battler) * battler.stats.trg).floor();
        let stats = battler.stats.clone();
        let only_member = self.alive_members(at.side).len() <= 1;

        if let Some(battler) = self.battler_mut(at) {
            engine.add_gain(battler, TriggerKind::TpRegen, base);
        }
        self.fire(at, TriggerKind::TpRegen, at, 0.0);
        if stats.hp < stats.mhp / 4.0 {
            self.fire(at, TriggerKind::CriticalHp, at, 0.0);
        }
        if stats.hp >= stats.mhp {
            self.fire(at, TriggerKind::FullHp, at, 0.0);
        }
        if stats.mp < stats.mmp / 4.0 {
            self.fire(at, TriggerKind::CriticalMp, at, 0.0);
        }
        if stats.mp >= stats.mmp {
            self.fire(at, TriggerKind::FullMp, at, 0.0);
        }
        if only_member {
            self.fire(at, TriggerKind::OnlyMember, at, 0.0);
        }
    }

    /// Regenerate every living battler, party first.
    pub fn end_turn(&mut self) {
        let living: Vec<BattlerRef> = self
            .alive_members(Side::Party)
            .into_iter()
            .chain(self.alive_members(Side::Troop))
            .collect();
        for at in living {
            self.regenerate(at);
        }
    }

    /// Leave combat.
    ///
    /// Living party members gain the outcome trigger with the party leader
    /// as target; then non-preserving party members are cleared.
    pub fn end(&mut self, outcome: BattleOutcome) {
        let leader = BattlerRef::party(0);
        self.fire_unit(Side::Party, outcome.trigger(), leader, 0.0);

        let engine = self.engine;
        for battler in &mut self.party {
            if !engine.is_preserving(battler) {
                engine.clear(battler);
            }
        }
        self.in_combat = false;
    }

    /// An actor learned a skill that teaches `teaches`. Returns how many
    /// rules were newly unlocked.
    pub fn learn_skill(&mut self, who: BattlerRef, teaches: &[String]) -> usize {
        let engine = self.engine;
        self.battler_mut(who)
            .map_or(0, |battler| engine.learn_skill(battler, teaches))
    }

    /// Apply the rule changes carried by an action.
    pub fn apply_rule_effects(&mut self, subject: BattlerRef, target: BattlerRef, effects: &RuleEffects) {
        let engine = self.engine;
        if let Some(name) = &effects.change_target {
            if let Some(battler) = self.battler_mut(target) {
                engine.assign(battler, name);
            }
        }
        if let Some(name) = &effects.change_user {
            if let Some(battler) = self.battler_mut(subject) {
                engine.assign(battler, name);
            }
        }
        if let Some(battler) = self.battler_mut(target) {
            if battler.is_actor() {
                for name in &effects.unlock {
                    engine.unlock(battler, name);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::registry::RuleRegistry;
    use crate::rule::RuleDefinition;

    fn engine() -> RuleEngine {
        RuleEngine::new(
            RuleRegistry::from_definitions(vec![
                RuleDefinition::new("Counter")
                    .with_max_formula("1000")
                    .with_formula(TriggerKind::TakeHpDmg, "1")
                    .with_formula(TriggerKind::DealHpDmg, "10")
                    .with_formula(TriggerKind::AllyHpDmg, "100"),
                RuleDefinition::new("Anywhere")
                    .with_always_active(true)
                    .with_formula(TriggerKind::UseItem, "5"),
            ]),
            EngineConfig::default().with_default_rule("Counter"),
        )
    }

    #[test]
    fn test_hp_damage_cascade() {
        let engine = engine();
        let mut battle = Battle::new(
            &engine,
            vec![Battler::actor("A"), Battler::actor("B")],
            vec![Battler::enemy("X"), Battler::enemy("Y")],
        );
        battle.start();
        battle.hp_damage(BattlerRef::party(0), BattlerRef::troop(0), 30.0);

        // Target: Take + Ally; its ally: Ally; subject: Deal.
        assert_eq!(battle.troop()[0].tp(), 101.0);
        assert_eq!(battle.troop()[1].tp(), 100.0);
        assert_eq!(battle.party()[0].tp(), 10.0);
        assert_eq!(battle.party()[1].tp(), 0.0);
    }

    #[test]
    fn test_out_of_combat_only_always_active() {
        let engine = engine();
        let mut wanderer = Battler::actor("W");
        engine.assign(&mut wanderer, "Anywhere");
        let mut battle = Battle::new(&engine, vec![Battler::actor("A"), wanderer], vec![]);

        battle.hp_damage(BattlerRef::party(0), BattlerRef::party(0), 30.0);
        assert_eq!(battle.party()[0].tp(), 0.0);

        battle.use_action(BattlerRef::party(1), ActionKind::Item);
        assert_eq!(battle.party()[1].tp(), 5.0);
    }

    #[test]
    fn test_knock_out_only_once() {
        let engine = engine();
        let mut battle = Battle::new(&engine, vec![Battler::actor("A")], vec![Battler::enemy("X")]);
        battle.start();
        assert!(battle.knock_out(BattlerRef::troop(0)));
        assert!(!battle.knock_out(BattlerRef::troop(0)));
        assert!(!battle.knock_out(BattlerRef::troop(5)));
        assert!(!battle.troop()[0].is_alive());
    }

    #[test]
    fn test_unknown_refs_ignored() {
        let engine = engine();
        let mut battle = Battle::new(&engine, vec![Battler::actor("A")], vec![]);
        battle.start();
        battle.hp_damage(BattlerRef::party(0), BattlerRef::troop(3), 10.0);
        battle.regenerate(BattlerRef::troop(3));
        assert_eq!(battle.party()[0].tp(), 0.0);
    }

    #[test]
    fn test_outcome_triggers() {
        assert_eq!(BattleOutcome::Win.trigger(), TriggerKind::WinBattle);
        assert_eq!(BattleOutcome::Flee.trigger(), TriggerKind::FleeBattle);
        assert_eq!(BattleOutcome::Lose.trigger(), TriggerKind::LoseBattle);
    }
}
