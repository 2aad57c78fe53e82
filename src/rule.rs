//! Rule module.
//!
//! A rule (TP mode) is authored as a [`RuleDefinition`] and used at runtime
//! as a [`Rule`]. The runtime form compiles each formula the first time it
//! is needed and keeps the result for the rule's lifetime.

use crate::formula::CompiledFormula;
use crate::rule_id::RuleId;
use crate::trigger::TriggerKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

/// Gauge display settings carried for the UI layer.
///
/// The engine only reads `flash` and `flash_requirement` (see
/// `RuleEngine::is_gauge_flashing`); the rest is passed through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GaugeSettings {
    pub flash: bool,
    /// Gauge rate (0.0 to 1.0) at which the gauge starts flashing.
    pub flash_requirement: f64,
    pub flash_speed: i32,
    pub flash_lightness: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color2: Option<String>,
}

impl Default for GaugeSettings {
    fn default() -> Self {
        Self {
            flash: true,
            flash_requirement: 1.0,
            flash_speed: 16,
            flash_lightness: 160,
            custom_label: None,
            color1: None,
            color2: None,
        }
    }
}

impl GaugeSettings {
    /// Flash speed clamped to `[1, 255]`.
    pub fn flash_speed(&self) -> u8 {
        self.flash_speed.clamp(1, 255) as u8
    }

    /// Flash lightness clamped to `[0, 255]`.
    pub fn flash_lightness(&self) -> u8 {
        self.flash_lightness.clamp(0, 255) as u8
    }
}

/// Authoring record for one rule.
///
/// Every field has a default, so a JSON object only needs the fields that
/// differ from a plain 100-point mode that gains nothing.
///
/// # Examples
///
/// ```rust
/// use zztp::{RuleDefinition, TriggerKind};
///
/// let def = RuleDefinition::new("Warrior")
///     .with_formula(TriggerKind::DealHpDmg, "Math.min(16, value * 100 / target.mhp) * user.tcr");
///
/// assert_eq!(def.max_formula, "100");
/// assert!(def.preserve);
/// assert_eq!(def.formulas.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuleDefinition {
    pub name: String,
    pub icon: u32,
    /// Help text; `%1` is replaced with the resource label.
    pub help: String,
    pub max_formula: String,
    pub multiplier: f64,
    /// Keep the stored value across battles.
    pub preserve: bool,
    /// Fire triggers even outside combat.
    pub always_active: bool,
    pub gauge: GaugeSettings,
    pub formulas: BTreeMap<TriggerKind, String>,
}

impl Default for RuleDefinition {
    fn default() -> Self {
        Self {
            name: "Untitled".to_string(),
            icon: 160,
            help: String::new(),
            max_formula: "100".to_string(),
            multiplier: 1.0,
            preserve: true,
            always_active: false,
            gauge: GaugeSettings::default(),
            formulas: BTreeMap::new(),
        }
    }
}

impl RuleDefinition {
    /// Create a definition with default settings.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_max_formula(mut self, formula: impl Into<String>) -> Self {
        self.max_formula = formula.into();
        self
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn with_preserve(mut self, preserve: bool) -> Self {
        self.preserve = preserve;
        self
    }

    pub fn with_always_active(mut self, always_active: bool) -> Self {
        self.always_active = always_active;
        self
    }

    /// Set the formula for one trigger kind, replacing any previous one.
    pub fn with_formula(mut self, kind: TriggerKind, formula: impl Into<String>) -> Self {
        self.formulas.insert(kind, formula.into());
        self
    }
}

/// Formula text compiled on first use.
#[derive(Debug, Default)]
struct LazyFormula {
    source: Option<Arc<str>>,
    compiled: OnceLock<CompiledFormula>,
}

impl LazyFormula {
    fn new(source: Option<&str>) -> Self {
        Self {
            source: source
                .filter(|text| !text.trim().is_empty())
                .map(Arc::from),
            compiled: OnceLock::new(),
        }
    }

    fn get(&self) -> &CompiledFormula {
        self.compiled.get_or_init(|| match &self.source {
            Some(text) => CompiledFormula::compile(text),
            None => CompiledFormula::zero(),
        })
    }

    fn is_set(&self) -> bool {
        self.source.is_some()
    }
}

/// Rule metadata not involved in formula evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleMetadata {
    pub icon: u32,
    pub help: String,
    pub multiplier: f64,
    pub preserve: bool,
    pub always_active: bool,
    pub gauge: GaugeSettings,
}

/// Runtime form of a rule.
///
/// Every trigger kind resolves to a formula; kinds the author left unset
/// resolve to the zero formula. Rules are immutable once built and can be
/// shared across threads.
///
/// # Examples
///
/// ```rust
/// use zztp::{Rule, RuleDefinition, RuleId, TriggerKind};
///
/// let rule = Rule::from(
///     RuleDefinition::new("Comrade").with_formula(TriggerKind::AllyHpDmg, "20 * user.tcr"),
/// );
///
/// assert_eq!(rule.id(), &RuleId::new("COMRADE"));
/// assert!(rule.has_formula(TriggerKind::AllyHpDmg));
/// assert!(!rule.has_formula(TriggerKind::WinBattle));
/// assert_eq!(rule.formula(TriggerKind::WinBattle).source(), "0");
/// ```
#[derive(Debug)]
pub struct Rule {
    id: RuleId,
    name: String,
    metadata: RuleMetadata,
    max_formula: LazyFormula,
    formulas: Vec<LazyFormula>,
}

impl Rule {
    /// The normalized id.
    pub fn id(&self) -> &RuleId {
        &self.id
    }

    /// The name as authored.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    pub fn multiplier(&self) -> f64 {
        self.metadata.multiplier
    }

    pub fn preserves(&self) -> bool {
        self.metadata.preserve
    }

    pub fn always_active(&self) -> bool {
        self.metadata.always_active
    }

    /// The compiled formula for a trigger kind.
    pub fn formula(&self, kind: TriggerKind) -> &CompiledFormula {
        self.formulas[kind.index()].get()
    }

    /// Returns `true` if the author set a non-blank formula for `kind`.
    pub fn has_formula(&self, kind: TriggerKind) -> bool {
        self.formulas[kind.index()].is_set()
    }

    /// The compiled maximum-value formula.
    pub fn max_formula(&self) -> &CompiledFormula {
        self.max_formula.get()
    }

    /// Help text with `%1` replaced by `resource_label`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use zztp::{Rule, RuleDefinition};
    ///
    /// let mut def = RuleDefinition::new("Stoic");
    /// def.help = "Raise %1 when receiving damage.".to_string();
    ///
    /// assert_eq!(Rule::from(def).description("TP"), "Raise TP when receiving damage.");
    /// ```
    pub fn description(&self, resource_label: &str) -> String {
        self.metadata.help.replace("%1", resource_label)
    }
}

impl From<RuleDefinition> for Rule {
    fn from(def: RuleDefinition) -> Self {
        let formulas = TriggerKind::ALL
            .iter()
            .map(|kind| LazyFormula::new(def.formulas.get(kind).map(String::as_str)))
            .collect();
        Self {
            id: RuleId::new(&def.name),
            max_formula: LazyFormula::new(Some(def.max_formula.as_str())),
            formulas,
            metadata: RuleMetadata {
                icon: def.icon,
                help: def.help,
                multiplier: def.multiplier,
                preserve: def.preserve,
                always_active: def.always_active,
                gauge: def.gauge,
            },
            name: def.name,
        }
    }
}
