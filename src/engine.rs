//! Rule engine module.
//!
//! [`RuleEngine`] ties the registry and configuration together and is the
//! outer evaluation boundary: every formula failure stops here and becomes
//! a zero gain. Rule selection and resource handling are implemented on the
//! engine in the `selection` and `resource` modules.

use crate::battler::Battler;
use crate::config::{EngineConfig, RuleBook};
use crate::error::EvalError;
use crate::formula::{FormulaScope, Role};
use crate::registry::RuleRegistry;
use crate::trigger::{FormulaSlot, TriggerKind};
use tracing::warn;

/// How deeply `maxTp()` calls may nest inside formulas.
pub const MAX_FORMULA_DEPTH: usize = 8;

/// The rule engine: an immutable registry plus engine-wide settings.
///
/// # Examples
///
/// ```rust
/// use zztp::{Battler, RuleEngine, TriggerKind};
///
/// let engine = RuleEngine::stock();
/// let mut hero = Battler::actor("Harold").with_hp(500.0, 500.0);
/// engine.assign(&mut hero, "Warrior");
/// let slime = Battler::enemy("Slime").with_hp(100.0, 100.0);
///
/// // Math.min(16, 50 * 100 / 100) * 1
/// assert_eq!(engine.evaluate(&hero, TriggerKind::DealHpDmg, &slime, 50.0), 16.0);
/// // Warrior has no TakeHpDmg formula.
/// assert_eq!(engine.evaluate(&hero, TriggerKind::TakeHpDmg, &slime, 50.0), 0.0);
/// ```
#[derive(Debug, Default)]
pub struct RuleEngine {
    registry: RuleRegistry,
    config: EngineConfig,
}

impl RuleEngine {
    pub fn new(registry: RuleRegistry, config: EngineConfig) -> Self {
        Self { registry, config }
    }

    /// An engine loaded with the stock rule book.
    pub fn stock() -> Self {
        RuleBook::stock().into_engine()
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Evaluate the active rule's formula for `kind`.
    ///
    /// `user` is the battler that would gain TP. A battler with no active
    /// rule evaluates every trigger to 0. The result is not floored.
    pub fn try_evaluate(
        &self,
        user: &Battler,
        kind: TriggerKind,
        target: &Battler,
        value: f64,
    ) -> Result<f64, EvalError> {
        let Some(rule) = self.active_rule(user) else {
            return Ok(0.0);
        };
        let scope = FormulaContext {
            engine: self,
            user,
            target,
            value,
            depth: 0,
        };
        rule.formula(kind).evaluate(&scope)
    }

    /// Like [`try_evaluate`](Self::try_evaluate), but any failure yields 0.
    ///
    /// With diagnostics enabled, each failure is logged as a warning naming
    /// the rule, the battler and the trigger.
    pub fn evaluate(&self, user: &Battler, kind: TriggerKind, target: &Battler, value: f64) -> f64 {
        match self.try_evaluate(user, kind, target, value) {
            Ok(result) => result,
            Err(err) => {
                self.report(user, kind.into(), &err);
                0.0
            }
        }
    }

    /// Evaluate the maximum for `battler`, floored and never negative.
    ///
    /// With no active rule this is the configured baseline.
    pub fn try_max(&self, battler: &Battler) -> Result<f64, EvalError> {
        self.max_at_depth(battler, 0)
    }

    fn max_at_depth(&self, battler: &Battler, depth: usize) -> Result<f64, EvalError> {
        if depth > MAX_FORMULA_DEPTH {
            return Err(EvalError::RecursionLimit);
        }
        let Some(rule) = self.active_rule(battler) else {
            return Ok(self.config.baseline_max.floor().max(0.0));
        };
        let scope = FormulaContext {
            engine: self,
            user: battler,
            target: battler,
            value: 0.0,
            depth,
        };
        let max = rule.max_formula().evaluate(&scope)?;
        Ok(max.floor().max(0.0))
    }

    pub(crate) fn report(&self, battler: &Battler, slot: FormulaSlot, err: &EvalError) {
        if self.config.diagnostics {
            warn!(
                rule = %self.active_rule_id(battler),
                battler = battler.name(),
                slot = %slot,
                error = %err,
                "bad TP formula, using 0"
            );
        }
    }
}

/// Formula scope over live battlers.
struct FormulaContext<'a> {
    engine: &'a RuleEngine,
    user: &'a Battler,
    target: &'a Battler,
    value: f64,
    depth: usize,
}

impl FormulaContext<'_> {
    fn battler(&self, role: Role) -> &Battler {
        match role {
            Role::User => self.user,
            Role::Target => self.target,
        }
    }

    fn max_tp(&self, battler: &Battler) -> Result<f64, EvalError> {
        self.engine.max_at_depth(battler, self.depth + 1)
    }
}

fn flag(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

impl FormulaScope for FormulaContext<'_> {
    fn value(&self) -> f64 {
        self.value
    }

    fn property(&self, role: Role, name: &str) -> Result<f64, EvalError> {
        let battler = self.battler(role);
        let stats = &battler.stats;
        Ok(match name {
            "hp" => stats.hp,
            "mhp" => stats.mhp,
            "mp" => stats.mp,
            "mmp" => stats.mmp,
            "tp" => battler.tp(),
            "tcr" => {
                let multiplier = self
                    .engine
                    .active_rule(battler)
                    .map_or(1.0, |rule| rule.multiplier());
                stats.tcr * multiplier
            }
            "trg" => stats.trg,
            _ => battler
                .param(name)
                .ok_or_else(|| EvalError::UnknownProperty(name.to_string()))?,
        })
    }

    fn call(&self, role: Role, name: &str, args: &[f64]) -> Result<f64, EvalError> {
        if !args.is_empty() {
            return Err(EvalError::Arity {
                function: name.to_string(),
                expected: 0,
                found: args.len(),
            });
        }
        let battler = self.battler(role);
        Ok(match name {
            "maxTp" => self.max_tp(battler)?,
            "turnCount" => f64::from(battler.stats.turn_count),
            "isAlive" => flag(battler.is_alive()),
            "isDead" => flag(!battler.is_alive()),
            "isActor" => flag(battler.is_actor()),
            "isEnemy" => flag(!battler.is_actor()),
            "hpRate" => battler.hp_rate(),
            "mpRate" => battler.mp_rate(),
            "tpRate" => {
                let max = self.max_tp(battler)?;
                if max > 0.0 {
                    battler.tp() / max
                } else {
                    0.0
                }
            }
            _ => return Err(EvalError::UnknownProperty(format!("{name}()"))),
        })
    }
}
