//! Trigger keys module.
//!
//! A trigger is a combat event that may change a battler's TP. Each rule
//! holds one formula per `TriggerKind`; the dispatcher picks the kind that
//! matches the event and evaluates that formula for the battler gaining TP.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! trigger_kinds {
    ($($(#[$doc:meta])* $variant:ident),+ $(,)?) => {
        /// Combat event kinds that select a formula within a rule.
        ///
        /// Serialized by variant name (`"TakeHpDmg"`), which is also the
        /// key used in authored rule tables.
        ///
        /// # Examples
        ///
        /// ```rust
        /// use zztp::TriggerKind;
        ///
        /// let kind: TriggerKind = "takehpdmg".parse().unwrap();
        /// assert_eq!(kind, TriggerKind::TakeHpDmg);
        /// assert_eq!(kind.name(), "TakeHpDmg");
        /// assert_eq!(TriggerKind::ALL.len(), TriggerKind::COUNT);
        /// ```
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum TriggerKind {
            $($(#[$doc])* $variant,)+
        }

        impl TriggerKind {
            /// Every trigger kind, in declaration order.
            pub const ALL: [TriggerKind; trigger_kinds!(@count $($variant)+)] = [
                $(TriggerKind::$variant,)+
            ];

            /// Number of trigger kinds.
            pub const COUNT: usize = trigger_kinds!(@count $($variant)+);

            /// The authoring key of this trigger kind.
            pub fn name(self) -> &'static str {
                match self {
                    $(TriggerKind::$variant => stringify!($variant),)+
                }
            }
        }
    };
    (@count $($variant:ident)+) => { <[()]>::len(&[$(trigger_kinds!(@unit $variant)),+]) };
    (@unit $variant:ident) => { () };
}

trigger_kinds! {
    /// Battle start.
    Initial,
    /// The battler landed a critical hit.
    CriticalHit,
    /// The battler evaded an action, or an action against it missed.
    Evasion,
    /// The battler used an item.
    UseItem,
    /// The battler used a skill other than attack or guard.
    UseSkill,
    /// Turn-end regeneration.
    TpRegen,
    /// Regeneration while HP is below a quarter.
    CriticalHp,
    /// Regeneration while HP is full.
    FullHp,
    /// Regeneration while MP is below a quarter.
    CriticalMp,
    /// Regeneration while MP is full.
    FullMp,
    /// Regeneration while the battler is the only living member of its unit.
    OnlyMember,
    /// The battler took HP damage.
    TakeHpDmg,
    /// The battler dealt HP damage.
    DealHpDmg,
    /// A member of the battler's unit took HP damage.
    AllyHpDmg,
    /// The battler was healed.
    TakeHpHeal,
    /// The battler healed someone.
    DealHpHeal,
    /// A member of the battler's unit was healed.
    AllyHpHeal,
    /// The battler took MP damage.
    TakeMpDmg,
    /// The battler dealt MP damage.
    DealMpDmg,
    /// A member of the battler's unit took MP damage.
    AllyMpDmg,
    /// The battler recovered MP.
    TakeMpHeal,
    /// The battler restored someone's MP.
    DealMpHeal,
    /// A member of the battler's unit recovered MP.
    AllyMpHeal,
    /// The battler buffed an ally.
    DealAllyBuff,
    /// The battler buffed an enemy.
    DealEnemyBuff,
    /// The battler received a buff from an ally.
    GainAllyBuff,
    /// The battler received a buff from an enemy.
    GainEnemyBuff,
    /// The battler debuffed an ally.
    DealAllyDebuff,
    /// The battler debuffed an enemy.
    DealEnemyDebuff,
    /// The battler received a debuff from an ally.
    GainAllyDebuff,
    /// The battler received a debuff from an enemy.
    GainEnemyDebuff,
    /// The battler inflicted a state on an ally.
    DealAllyState,
    /// The battler inflicted a state on an enemy.
    DealEnemyState,
    /// The battler received a state from an ally.
    GainAllyState,
    /// The battler received a state from an enemy.
    GainEnemyState,
    /// A member of the battler's unit died.
    KillAlly,
    /// A member of the opposing unit died.
    KillEnemy,
    /// The party won the battle.
    WinBattle,
    /// The party escaped the battle.
    FleeBattle,
    /// The party lost the battle.
    LoseBattle,
}

impl TriggerKind {
    /// Position of this kind within [`TriggerKind::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a string does not name a trigger kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown trigger kind: {0}")]
pub struct UnknownTrigger(pub String);

impl FromStr for TriggerKind {
    type Err = UnknownTrigger;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        TriggerKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownTrigger(s.to_string()))
    }
}

/// A formula slot within a rule: the maximum-value formula or one trigger.
///
/// Used to label diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormulaSlot {
    /// The rule's maximum-value formula.
    Max,
    /// The formula for one trigger kind.
    Trigger(TriggerKind),
}

impl fmt::Display for FormulaSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormulaSlot::Max => f.write_str("MaxFormula"),
            FormulaSlot::Trigger(kind) => f.write_str(kind.name()),
        }
    }
}

impl From<TriggerKind> for FormulaSlot {
    fn from(kind: TriggerKind) -> Self {
        FormulaSlot::Trigger(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_count() {
        assert_eq!(TriggerKind::COUNT, 40);
        assert_eq!(TriggerKind::ALL[0], TriggerKind::Initial);
        assert_eq!(TriggerKind::ALL[39], TriggerKind::LoseBattle);
    }

    #[test]
    fn test_trigger_index_matches_position() {
        for (i, kind) in TriggerKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }

    #[test]
    fn test_trigger_parse_is_case_insensitive() {
        assert_eq!("DealHpDmg".parse::<TriggerKind>(), Ok(TriggerKind::DealHpDmg));
        assert_eq!(" killenemy ".parse::<TriggerKind>(), Ok(TriggerKind::KillEnemy));
        assert!("Bogus".parse::<TriggerKind>().is_err());
    }

    #[test]
    fn test_trigger_serde_uses_authoring_key() {
        let json = serde_json::to_string(&TriggerKind::GainEnemyState).unwrap();
        assert_eq!(json, "\"GainEnemyState\"");
        let back: TriggerKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, TriggerKind::GainEnemyState);
    }

    #[test]
    fn test_formula_slot_display() {
        assert_eq!(FormulaSlot::Max.to_string(), "MaxFormula");
        assert_eq!(FormulaSlot::from(TriggerKind::TpRegen).to_string(), "TpRegen");
    }
}
