//! # zztp - Deterministic, Data-Driven TP Mode Engine
//!
//! A formula engine for the TP resource of turn-based RPG combat:
//! - **Data-driven** rules (TP modes) authored as JSON, one formula per trigger
//! - **Sandboxed** formulas: a small expression language, no host code
//! - **Failure-tolerant**: a broken formula contributes 0 and never panics
//! - **Deterministic**: no randomness, fixed trigger firing order
//!
//! ## Core Concepts
//!
//! ### Trigger Pipeline
//!
//! ```text
//! [combat event] → [Battle hook] → [active Rule formula] → floor → clamp(0, max)
//! ```
//!
//! 1. **Rules** bundle a formula per [`TriggerKind`], a max formula and flags
//! 2. **Selection** picks the active rule: forced by a trait, assigned, or default
//! 3. **Dispatch** fires triggers for every battler an event concerns
//! 4. **Resource** floors each gain and keeps TP inside `[0, max]`
//!
//! ## Example
//!
//! ```rust
//! use zztp::*;
//!
//! let engine = RuleEngine::stock();
//!
//! let mut hero = Battler::actor("Harold").with_hp(500.0, 500.0);
//! engine.setup(&mut hero);
//! engine.assign(&mut hero, "Warrior");
//!
//! let slime = Battler::enemy("Slime").with_hp(100.0, 100.0);
//!
//! let mut battle = Battle::new(&engine, vec![hero], vec![slime]);
//! battle.start();
//! battle.hp_damage(BattlerRef::party(0), BattlerRef::troop(0), 50.0);
//! assert_eq!(battle.party()[0].tp(), 16.0); // Math.min(16, 50 * 100 / 100)
//!
//! battle.end(BattleOutcome::Win);
//! assert!(!battle.in_combat());
//! ```
//!
//! ## Modules
//!
//! - [`rule_id`] - Rule identifier type
//! - [`trigger`] - Trigger kinds
//! - [`formula`] - Formula lexer, parser and interpreter
//! - [`rule`] - Rule definitions and compiled rules
//! - [`registry`] - Rule registry
//! - [`config`] - Engine settings and rule books
//! - [`battler`] - Combatant state
//! - [`engine`] - Rule engine and evaluation boundary
//! - [`selection`] - Active rule resolution
//! - [`resource`] - TP storage and clamping
//! - [`dispatch`] - Combat event hooks
//! - [`error`] - Error types

pub mod battler;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod formula;
pub mod registry;
pub mod resource;
pub mod rule;
pub mod rule_id;
pub mod selection;
pub mod trigger;

// Re-export main types for convenience
pub use battler::{Battler, BattlerStats, Side, TraitSource, TraitSourceKind};
pub use config::{EngineConfig, RuleBook};
pub use dispatch::{ActionKind, Battle, BattleOutcome, BattlerRef, HitOutcome, RuleEffects};
pub use engine::{RuleEngine, MAX_FORMULA_DEPTH};
pub use error::{EvalError, RuleError};
pub use formula::{CompiledFormula, FormulaScope, Role, MAX_EXPR_DEPTH};
pub use registry::RuleRegistry;
pub use rule::{GaugeSettings, Rule, RuleDefinition, RuleMetadata};
pub use rule_id::RuleId;
pub use trigger::{FormulaSlot, TriggerKind, UnknownTrigger};
