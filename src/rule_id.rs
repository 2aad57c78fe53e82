//! Rule identifier module.
//!
//! Provides the `RuleId` type, the normalized name of a TP mode. Rule names
//! are matched case-insensitively and ignore surrounding whitespace, so
//! `"Warrior"`, `" warrior "` and `"WARRIOR"` all name the same rule.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::Arc;

/// Normalized, interned identifier for rules.
///
/// Uses `Arc<str>` so ids are cheap to clone and pass around. The stored
/// text is the trimmed, uppercased form of whatever name it was built from.
///
/// # Examples
///
/// ```rust
/// use zztp::RuleId;
///
/// let warrior = RuleId::new("Warrior");
/// let spaced: RuleId = "  warrior ".into();
/// let owned: RuleId = String::from("WARRIOR").into();
///
/// assert_eq!(warrior, spaced);
/// assert_eq!(warrior, owned);
/// assert_eq!(warrior.as_str(), "WARRIOR");
/// ```
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct RuleId(Arc<str>);

impl Serialize for RuleId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.as_ref().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RuleId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(RuleId::new(&s))
    }
}

impl RuleId {
    /// Create a new `RuleId`, normalizing the name.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use zztp::RuleId;
    ///
    /// let id = RuleId::new(" Stoic\n");
    /// assert_eq!(id.as_str(), "STOIC");
    /// ```
    pub fn new(name: &str) -> Self {
        Self(Arc::from(normalize(name)))
    }

    /// Get the normalized string form of this id.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the normalized name is empty.
    ///
    /// Blank names come from empty lines in authored lists and never match
    /// a registered rule.
    pub fn is_blank(&self) -> bool {
        self.0.is_empty()
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_uppercase()
}

impl From<&str> for RuleId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for RuleId {
    fn from(s: String) -> Self {
        Self::new(&s)
    }
}

impl From<&String> for RuleId {
    fn from(s: &String) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
