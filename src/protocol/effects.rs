//! The double-keyed effect table (§4.2).
//!
//! Each effect name has an optional legacy id (standard class `0x03`) and an
//! optional extended id (class `0x0F`). At dispatch time the active profile's
//! `uses_extended_effect_class` selects the column; if that column is `None`
//! the effect fails with `Unsupported`. The ids for the universally supported
//! effects below reproduce the values observed on real Chroma hardware
//! (confirmed independently by the literal scenario 1 byte layout in spec.md
//! §8, which pins `static = 0x06` on the standard class).

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectName {
    Disable,
    Static,
    Wave,
    Reactive,
    Breathe,
    Spectrum,
    Starlight,
    CustomFrame,
}

#[derive(Debug, Clone, Copy)]
pub struct EffectIds {
    pub legacy_id: Option<u8>,
    pub extended_id: Option<u8>,
}

impl EffectName {
    pub fn ids(self) -> EffectIds {
        match self {
            EffectName::Disable => EffectIds { legacy_id: Some(0x00), extended_id: Some(0x00) },
            EffectName::Wave => EffectIds { legacy_id: Some(0x01), extended_id: Some(0x01) },
            EffectName::Reactive => EffectIds { legacy_id: Some(0x02), extended_id: Some(0x02) },
            EffectName::Breathe => EffectIds { legacy_id: Some(0x03), extended_id: Some(0x03) },
            EffectName::Spectrum => EffectIds { legacy_id: Some(0x04), extended_id: Some(0x04) },
            EffectName::CustomFrame => EffectIds { legacy_id: Some(0x05), extended_id: Some(0x05) },
            EffectName::Static => EffectIds { legacy_id: Some(0x06), extended_id: Some(0x06) },
            // Open question (spec.md §9): only confirmed on the extended class;
            // the legacy two-color byte layout was never observed on real
            // hardware in the source materials, so no legacy_id is registered.
            EffectName::Starlight => EffectIds { legacy_id: None, extended_id: Some(0x19) },
        }
    }

    /// Selects the id for `self` given whether the active profile uses the
    /// extended effect class. Returns `None` if that column has no mapping.
    pub fn id_for(self, uses_extended: bool) -> Option<u8> {
        let ids = self.ids();
        if uses_extended {
            ids.extended_id
        } else {
            ids.legacy_id
        }
    }

    pub fn from_name(name: &str) -> Option<EffectName> {
        match name {
            "disable" => Some(EffectName::Disable),
            "static" => Some(EffectName::Static),
            "wave" => Some(EffectName::Wave),
            "reactive" => Some(EffectName::Reactive),
            "breathe" => Some(EffectName::Breathe),
            "spectrum" => Some(EffectName::Spectrum),
            "starlight" => Some(EffectName::Starlight),
            "custom_frame" => Some(EffectName::CustomFrame),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_effect_legacy_id_matches_scenario_1() {
        assert_eq!(EffectName::Static.id_for(false), Some(0x06));
    }

    #[test]
    fn starlight_has_no_legacy_mapping() {
        assert_eq!(EffectName::Starlight.id_for(false), None);
        assert!(EffectName::Starlight.id_for(true).is_some());
    }

    #[test]
    fn unknown_name_is_not_resolved() {
        assert!(EffectName::from_name("rainbow-swirl-v2").is_none());
    }
}
