//! Closed command registry (§4.2).
//!
//! A [`CommandDef`] names a `(command_class, command_id)` pair, an optional
//! fixed argument length, and the set of profiles it is valid against. Any
//! command whose `allowed_profiles` excludes the active profile fails with
//! `Unsupported` before a report is ever sent (§4.2, §8).

use crate::protocol::profile::ProfileId;

#[derive(Debug, Clone, Copy)]
pub struct CommandDef {
    pub command_class: u8,
    pub command_id: u8,
    pub fixed_data_size: Option<u8>,
    pub allowed_profiles: &'static [ProfileId],
}

const ALL_PROFILES: &[ProfileId] = &[
    ProfileId::Legacy,
    ProfileId::Extended,
    ProfileId::Modern,
    ProfileId::WirelessKeyboard,
    ProfileId::Special,
];

const WIRELESS_ONLY: &[ProfileId] = &[ProfileId::WirelessKeyboard];

const SYSTEM_CONTROL_PROFILES: &[ProfileId] = &[ProfileId::Modern, ProfileId::Special];

/// Named, closed set of commands. Effect dispatch goes through
/// [`crate::protocol::effects`] instead, since effects are double-keyed on
/// profile rather than fixed per command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    GetFirmware,
    GetSerial,
    SetLedBrightness,
    GetLedBrightness,
    SetLedState,
    SetLedColor,
    SetFrameMatrixStandard,
    SetFrameMatrixExtended,
    SetEffectStandard,
    SetEffectExtended,
    GetBattery,
    GetCharging,
    SetIdleTime,
    GetIdleTime,
    GetFanRpm,
    SetFanAuto,
    SetFanRpm,
    SetPowerMode,
    SetBoost,
}

impl Command {
    pub fn def(self) -> CommandDef {
        match self {
            Command::GetFirmware => CommandDef {
                command_class: 0x00,
                command_id: 0x81,
                fixed_data_size: Some(2),
                allowed_profiles: ALL_PROFILES,
            },
            Command::GetSerial => CommandDef {
                command_class: 0x00,
                command_id: 0x82,
                fixed_data_size: Some(22),
                allowed_profiles: ALL_PROFILES,
            },
            Command::SetLedBrightness => CommandDef {
                command_class: 0x03,
                command_id: 0x03,
                fixed_data_size: Some(2),
                allowed_profiles: ALL_PROFILES,
            },
            Command::GetLedBrightness => CommandDef {
                command_class: 0x03,
                command_id: 0x83,
                fixed_data_size: Some(1),
                allowed_profiles: ALL_PROFILES,
            },
            Command::SetLedState => CommandDef {
                command_class: 0x03,
                command_id: 0x00,
                fixed_data_size: Some(3),
                allowed_profiles: ALL_PROFILES,
            },
            Command::SetLedColor => CommandDef {
                command_class: 0x03,
                command_id: 0x01,
                fixed_data_size: Some(5),
                allowed_profiles: ALL_PROFILES,
            },
            Command::SetFrameMatrixStandard => CommandDef {
                command_class: 0x03,
                command_id: 0x0B,
                fixed_data_size: None,
                allowed_profiles: ALL_PROFILES,
            },
            Command::SetFrameMatrixExtended => CommandDef {
                command_class: 0x0F,
                command_id: 0x03,
                fixed_data_size: None,
                allowed_profiles: &[ProfileId::Extended, ProfileId::Modern, ProfileId::WirelessKeyboard],
            },
            Command::SetEffectStandard => CommandDef {
                command_class: 0x03,
                command_id: 0x0A,
                fixed_data_size: None,
                allowed_profiles: ALL_PROFILES,
            },
            Command::SetEffectExtended => CommandDef {
                command_class: 0x0F,
                command_id: 0x02,
                fixed_data_size: None,
                allowed_profiles: &[ProfileId::Extended, ProfileId::Modern, ProfileId::WirelessKeyboard],
            },
            Command::GetBattery => CommandDef {
                command_class: 0x07,
                command_id: 0x80,
                fixed_data_size: Some(2),
                allowed_profiles: WIRELESS_ONLY,
            },
            Command::GetCharging => CommandDef {
                command_class: 0x07,
                command_id: 0x84,
                fixed_data_size: Some(2),
                allowed_profiles: WIRELESS_ONLY,
            },
            Command::SetIdleTime => CommandDef {
                command_class: 0x07,
                command_id: 0x03,
                fixed_data_size: Some(2),
                allowed_profiles: WIRELESS_ONLY,
            },
            Command::GetIdleTime => CommandDef {
                command_class: 0x07,
                command_id: 0x83,
                fixed_data_size: Some(2),
                allowed_profiles: WIRELESS_ONLY,
            },
            Command::GetFanRpm => CommandDef {
                command_class: 0x0D,
                command_id: 0x81,
                fixed_data_size: Some(4),
                allowed_profiles: SYSTEM_CONTROL_PROFILES,
            },
            Command::SetFanAuto => CommandDef {
                command_class: 0x0D,
                command_id: 0x02,
                fixed_data_size: Some(1),
                allowed_profiles: SYSTEM_CONTROL_PROFILES,
            },
            Command::SetFanRpm => CommandDef {
                command_class: 0x0D,
                command_id: 0x01,
                fixed_data_size: Some(4),
                allowed_profiles: SYSTEM_CONTROL_PROFILES,
            },
            Command::SetPowerMode => CommandDef {
                command_class: 0x0D,
                command_id: 0x04,
                fixed_data_size: Some(2),
                allowed_profiles: SYSTEM_CONTROL_PROFILES,
            },
            Command::SetBoost => CommandDef {
                command_class: 0x0D,
                command_id: 0x05,
                fixed_data_size: Some(2),
                allowed_profiles: SYSTEM_CONTROL_PROFILES,
            },
        }
    }

    pub fn allowed_on(self, profile: ProfileId) -> bool {
        self.def().allowed_profiles.contains(&profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_effect_standard_matches_scenario_1_layout() {
        let def = Command::SetEffectStandard.def();
        assert_eq!((def.command_class, def.command_id), (0x03, 0x0A));
    }

    #[test]
    fn set_led_brightness_matches_scenario_2_layout() {
        let def = Command::SetLedBrightness.def();
        assert_eq!((def.command_class, def.command_id), (0x03, 0x03));
        assert_eq!(def.fixed_data_size, Some(2));
    }

    #[test]
    fn fan_commands_unsupported_outside_system_control_profiles() {
        assert!(!Command::SetFanRpm.allowed_on(ProfileId::Legacy));
        assert!(Command::SetFanRpm.allowed_on(ProfileId::Modern));
    }

    #[test]
    fn wireless_only_commands_rejected_on_wired_profile() {
        assert!(!Command::GetBattery.allowed_on(ProfileId::Legacy));
        assert!(Command::GetBattery.allowed_on(ProfileId::WirelessKeyboard));
    }
}
