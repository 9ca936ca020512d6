//! Per-character configuration document
//!
//! One document per content id, mapping territory ids to the gearset (and
//! glamour plate) that should be equipped on arrival. Values are range-checked
//! when a binding is about to be used, never while deserializing, so a file
//! with an out-of-range entry still loads and the rest of its bindings work.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::constants;
use crate::error::BindingError;

/// Per-character plugin configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CharacterConfig {
    /// Schema version, incremented on breaking changes
    #[serde(alias = "Version")]
    pub version: i32,

    /// If false, no automatic switching happens for this character
    #[serde(alias = "IsEnabled")]
    pub is_enabled: bool,

    /// Only switch while the roleplaying online status is active
    #[serde(alias = "OnlyInRoleplayMode")]
    pub only_in_roleplay_mode: bool,

    /// Territory id -> gearset binding
    #[serde(alias = "GearsetBindings")]
    pub gearset_bindings: BTreeMap<u32, GearsetBinding>,
}

impl Default for CharacterConfig {
    fn default() -> Self {
        Self {
            version: constants::config::VERSION,
            is_enabled: true,
            only_in_roleplay_mode: false,
            gearset_bindings: BTreeMap::new(),
        }
    }
}

impl CharacterConfig {
    /// Binding for a territory, if one is configured (enabled or not)
    pub fn binding_for(&self, territory: u16) -> Option<&GearsetBinding> {
        self.gearset_bindings.get(&u32::from(territory))
    }

    /// Insert or replace the binding for a territory
    pub fn set_binding(
        &mut self,
        territory: u32,
        binding: GearsetBinding,
    ) -> Option<GearsetBinding> {
        self.gearset_bindings.insert(territory, binding)
    }

    pub fn remove_binding(&mut self, territory: u32) -> Option<GearsetBinding> {
        self.gearset_bindings.remove(&territory)
    }
}

/// Gearset number and linked glamour plate for one territory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GearsetBinding {
    #[serde(alias = "GearsetNumber")]
    pub gearset_number: i32,
    /// 0 = keep the gearset's own plate
    #[serde(alias = "GlamourPlate")]
    pub glamour_plate: u8,
    #[serde(alias = "Enabled")]
    pub enabled: bool,
}

impl GearsetBinding {
    pub fn new(gearset_number: i32, glamour_plate: u8, enabled: bool) -> Self {
        Self {
            gearset_number,
            glamour_plate,
            enabled,
        }
    }

    /// Check both values against the ranges the game accepts.
    /// The glamour plate is checked first, matching the order of the warnings users see.
    pub fn validate(&self) -> Result<(), BindingError> {
        if self.glamour_plate > constants::gearset::MAX_GLAMOUR_PLATE {
            return Err(BindingError::GlamourPlateOutOfRange(self.glamour_plate));
        }

        if !(constants::gearset::MIN_NUMBER..=constants::gearset::MAX_NUMBER)
            .contains(&self.gearset_number)
        {
            return Err(BindingError::GearsetOutOfRange(self.gearset_number));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_character_config_defaults() {
        let config = CharacterConfig::default();

        assert_eq!(config.version, constants::config::VERSION);
        assert!(config.is_enabled);
        assert!(!config.only_in_roleplay_mode);
        assert!(config.gearset_bindings.is_empty());
    }

    #[test]
    fn test_serialized_field_names() {
        let mut config = CharacterConfig::default();
        config.set_binding(100, GearsetBinding::new(3, 1, true));

        let value = serde_json::to_value(&config).unwrap();

        assert_eq!(value["isEnabled"], serde_json::json!(true));
        assert_eq!(value["onlyInRoleplayMode"], serde_json::json!(false));
        assert_eq!(
            value["gearsetBindings"]["100"],
            serde_json::json!({ "gearsetNumber": 3, "glamourPlate": 1, "enabled": true })
        );
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let config: CharacterConfig =
            serde_json::from_str(r#"{ "gearsetBindings": { "128": { "gearsetNumber": 7 } } }"#)
                .unwrap();

        assert!(config.is_enabled);
        assert!(!config.only_in_roleplay_mode);
        let binding = config.binding_for(128).unwrap();
        assert_eq!(binding.gearset_number, 7);
        assert_eq!(binding.glamour_plate, 0);
        assert!(!binding.enabled);
    }

    #[test]
    fn test_legacy_pascal_case_is_accepted() {
        let legacy = r#"{
            "Version": 0,
            "IsEnabled": false,
            "OnlyInRoleplayMode": true,
            "GearsetBindings": {
                "132": { "GearsetNumber": 12, "GlamourPlate": 4, "Enabled": true }
            }
        }"#;

        let config: CharacterConfig = serde_json::from_str(legacy).unwrap();

        assert!(!config.is_enabled);
        assert!(config.only_in_roleplay_mode);
        assert_eq!(config.binding_for(132), Some(&GearsetBinding::new(12, 4, true)));
    }

    #[test]
    fn test_out_of_range_values_still_load() {
        let config: CharacterConfig = serde_json::from_str(
            r#"{ "gearsetBindings": {
                "1": { "gearsetNumber": 150, "glamourPlate": 25, "enabled": true }
            } }"#,
        )
        .unwrap();

        let binding = config.binding_for(1).unwrap();
        assert_eq!(binding.gearset_number, 150);
        assert!(binding.validate().is_err());
    }

    #[test]
    fn test_binding_validation_bounds() {
        assert!(GearsetBinding::new(0, 0, true).validate().is_ok());
        assert!(GearsetBinding::new(100, 20, true).validate().is_ok());
        assert_eq!(
            GearsetBinding::new(150, 1, true).validate(),
            Err(BindingError::GearsetOutOfRange(150))
        );
        assert_eq!(
            GearsetBinding::new(-1, 1, true).validate(),
            Err(BindingError::GearsetOutOfRange(-1))
        );
        assert_eq!(
            GearsetBinding::new(3, 25, true).validate(),
            Err(BindingError::GlamourPlateOutOfRange(25))
        );
    }

    #[test]
    fn test_binding_lookup_by_territory() {
        let mut config = CharacterConfig::default();
        config.set_binding(u32::from(u16::MAX), GearsetBinding::new(1, 0, true));
        config.set_binding(70_000, GearsetBinding::new(2, 0, true));

        assert!(config.binding_for(u16::MAX).is_some());
        assert!(config.binding_for(4).is_none());

        assert!(config.remove_binding(70_000).is_some());
        assert_eq!(config.gearset_bindings.len(), 1);
    }
}
