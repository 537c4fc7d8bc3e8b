//! Roster input types.
//!
//! A roster is loaded once per run and never mutated afterwards.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ============================================================================
// Role
// ============================================================================

/// Raid role of a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Role {
    /// Tank.
    Tank,
    /// Healer.
    Healer,
    /// Damage dealer (melee or ranged).
    Damage,
}

impl Role {
    /// Returns all roles.
    pub fn all() -> &'static [Role] {
        &[Self::Tank, Self::Healer, Self::Damage]
    }

    /// Returns the lowercase name used in config files and output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tank => "tank",
            Self::Healer => "healer",
            Self::Damage => "damage",
        }
    }

    /// Returns the combat-log ranking metric for this role.
    ///
    /// Healers are ranked by healing per second, everyone else by damage.
    pub fn metric(&self) -> &'static str {
        match self {
            Self::Healer => "hps",
            Self::Tank | Self::Damage => "dps",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tank" => Ok(Self::Tank),
            "healer" | "heal" | "heals" => Ok(Self::Healer),
            "damage" | "dps" | "melee" | "ranged" => Ok(Self::Damage),
            other => Err(CoreError::UnknownRole(other.to_string())),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ============================================================================
// Roster Entry
// ============================================================================

/// One character the pipeline is asked to fetch data for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    /// Character name as shown in game.
    #[serde(alias = "character")]
    pub name: String,
    /// Realm slug (e.g. `azshara`).
    #[serde(alias = "server", alias = "realm")]
    pub server_slug: String,
    /// Raid role.
    pub role: Role,
    /// Class name (e.g. `Mage`).
    #[serde(default, alias = "class")]
    pub class_name: String,
}

impl RosterEntry {
    /// Creates a new roster entry.
    pub fn new(
        name: impl Into<String>,
        server_slug: impl Into<String>,
        role: Role,
        class_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            server_slug: server_slug.into(),
            role,
            class_name: class_name.into(),
        }
    }

    /// Checks that the entry names both a character and a realm.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.name.trim().is_empty() {
            return Err(CoreError::InvalidRosterEntry(
                "character name is empty".to_string(),
            ));
        }
        if self.server_slug.trim().is_empty() {
            return Err(CoreError::InvalidRosterEntry(format!(
                "realm is empty for {}",
                self.name
            )));
        }
        Ok(())
    }

    /// Returns `name-realm`, used as a log and failure label.
    pub fn label(&self) -> String {
        format!("{}-{}", self.name, self.server_slug)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing_is_lenient() {
        assert_eq!("Tank".parse::<Role>().unwrap(), Role::Tank);
        assert_eq!(" healer ".parse::<Role>().unwrap(), Role::Healer);
        assert_eq!("DPS".parse::<Role>().unwrap(), Role::Damage);
        assert_eq!("ranged".parse::<Role>().unwrap(), Role::Damage);
        assert!("bard".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_metric() {
        assert_eq!(Role::Healer.metric(), "hps");
        assert_eq!(Role::Tank.metric(), "dps");
        assert_eq!(Role::Damage.metric(), "dps");
    }

    #[test]
    fn test_entry_validation() {
        assert!(RosterEntry::new("Jaina", "azshara", Role::Damage, "Mage")
            .validate()
            .is_ok());
        assert!(RosterEntry::new("", "azshara", Role::Damage, "Mage")
            .validate()
            .is_err());
        assert!(RosterEntry::new("Jaina", " ", Role::Damage, "Mage")
            .validate()
            .is_err());
    }

    #[test]
    fn test_label() {
        let entry = RosterEntry::new("Jaina", "azshara", Role::Damage, "Mage");
        assert_eq!(entry.label(), "Jaina-azshara");
    }
}
