//! Typed view of the values exchanged with the fan controller.
//!
//! Every numeric field travels as decimal text on the wire and is narrowed to
//! the fixed-width type declared here. Enumerated settings keep unknown codes
//! in an `Unknown` variant so a configuration read from the device can be
//! written back unchanged.
//!
//! Enumerated settings compare and hash by wire code, so `Unknown(1)` equals
//! the named variant for code 1. Deserialization always yields the named
//! variant when one exists.

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Number of fan channels on the board.
pub const FAN_CHANNELS: usize = 4;

/// Temperature readings of sensors A-D, in whole degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Temperatures {
    pub sensor_a: i8,
    pub sensor_b: i8,
    pub sensor_c: i8,
    pub sensor_d: i8,
}

/// Output power of each fan channel in percent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outputs {
    pub fan1: i8,
    pub fan2: i8,
    pub fan3: i8,
    pub fan4: i8,
}

/// Tachometer readings, two per fan channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rpms {
    pub fan1_a: i16,
    pub fan1_b: i16,
    pub fan2_a: i16,
    pub fan2_b: i16,
    pub fan3_a: i16,
    pub fan3_b: i16,
    pub fan4_a: i16,
    pub fan4_b: i16,
}

/// One live snapshot reported by the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub temperatures: Temperatures,
    pub outputs: Outputs,
    pub rpms: Rpms,
}

/// Kind of probe attached to a temperature input.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "SensorTypeRepr")]
pub enum SensorType {
    #[default]
    NotConnected,
    Celsius,
    Fahrenheit,
    Unknown(i8),
}

impl SensorType {
    pub fn from_code(code: i8) -> Self {
        match code {
            0 => Self::NotConnected,
            1 => Self::Celsius,
            2 => Self::Fahrenheit,
            other => Self::Unknown(other),
        }
    }

    pub fn code(self) -> i8 {
        match self {
            Self::NotConnected => 0,
            Self::Celsius => 1,
            Self::Fahrenheit => 2,
            Self::Unknown(code) => code,
        }
    }

    pub fn is_connected(self) -> bool {
        self != Self::NotConnected
    }
}

/// Rule selecting which input drives a fan channel's power curve.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "SensorControlRepr")]
pub enum SensorControl {
    #[default]
    SensorA,
    SensorB,
    SensorC,
    SensorD,
    SensorAMinusD,
    SensorBMinusD,
    SensorCMinusD,
    Manual,
    Unknown(i8),
}

impl SensorControl {
    pub fn from_code(code: i8) -> Self {
        match code {
            0 => Self::SensorA,
            1 => Self::SensorB,
            2 => Self::SensorC,
            3 => Self::SensorD,
            4 => Self::SensorAMinusD,
            5 => Self::SensorBMinusD,
            6 => Self::SensorCMinusD,
            7 => Self::Manual,
            other => Self::Unknown(other),
        }
    }

    pub fn code(self) -> i8 {
        match self {
            Self::SensorA => 0,
            Self::SensorB => 1,
            Self::SensorC => 2,
            Self::SensorD => 3,
            Self::SensorAMinusD => 4,
            Self::SensorBMinusD => 5,
            Self::SensorCMinusD => 6,
            Self::Manual => 7,
            Self::Unknown(code) => code,
        }
    }
}

/// Wiring of one fan on a channel's A or B sub-output.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "FanTypeRepr")]
pub enum FanType {
    #[default]
    NotConnected,
    TwoWire,
    ThreeWireX1Tacho,
    ThreeWireX2Tacho,
    ThreeWireX4Tacho,
    FourWire,
    Unknown(i8),
}

impl FanType {
    pub fn from_code(code: i8) -> Self {
        match code {
            0 => Self::NotConnected,
            1 => Self::TwoWire,
            2 => Self::ThreeWireX1Tacho,
            3 => Self::ThreeWireX2Tacho,
            4 => Self::ThreeWireX4Tacho,
            5 => Self::FourWire,
            other => Self::Unknown(other),
        }
    }

    pub fn code(self) -> i8 {
        match self {
            Self::NotConnected => 0,
            Self::TwoWire => 1,
            Self::ThreeWireX1Tacho => 2,
            Self::ThreeWireX2Tacho => 3,
            Self::ThreeWireX4Tacho => 4,
            Self::FourWire => 5,
            Self::Unknown(code) => code,
        }
    }
}

/// Compares, hashes and deserializes a code enum through its wire code.
macro_rules! by_wire_code {
    ($name:ident, $repr:ident { $($variant:ident),* }) => {
        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.code() == other.code()
            }
        }

        impl Eq for $name {}

        impl Hash for $name {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.code().hash(state);
            }
        }

        #[derive(Deserialize)]
        #[serde(rename_all = "snake_case")]
        enum $repr {
            $($variant,)*
            Unknown(i8),
        }

        impl From<$repr> for $name {
            fn from(repr: $repr) -> Self {
                let code = match repr {
                    $($repr::$variant => $name::$variant.code(),)*
                    $repr::Unknown(code) => code,
                };
                Self::from_code(code)
            }
        }
    };
}

by_wire_code!(SensorType, SensorTypeRepr { NotConnected, Celsius, Fahrenheit });
by_wire_code!(SensorControl, SensorControlRepr {
    SensorA,
    SensorB,
    SensorC,
    SensorD,
    SensorAMinusD,
    SensorBMinusD,
    SensorCMinusD,
    Manual
});
by_wire_code!(FanType, FanTypeRepr {
    NotConnected,
    TwoWire,
    ThreeWireX1Tacho,
    ThreeWireX2Tacho,
    ThreeWireX4Tacho,
    FourWire
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorTypes {
    pub sensor_a: SensorType,
    pub sensor_b: SensorType,
    pub sensor_c: SensorType,
    pub sensor_d: SensorType,
}

impl SensorTypes {
    /// Sensor types in A-D wire order.
    pub fn as_array(&self) -> [SensorType; 4] {
        [self.sensor_a, self.sensor_b, self.sensor_c, self.sensor_d]
    }
}

/// Settings of one fan channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FanConfig {
    /// Minimum power in percent (0-100).
    pub minimum_power: i8,
    pub sensor_control: SensorControl,
    pub minimum_temperature: i16,
    pub maximum_temperature: i16,
    pub allow_stopped: bool,
    pub fan_type_a: FanType,
    pub fan_type_b: FanType,
}

/// Full controller configuration. Replaced as a whole, never patched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sensor_types: SensorTypes,
    /// Channels 1-4 in order.
    pub fans: [FanConfig; FAN_CHANNELS],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_codes_map_both_ways() {
        for code in -2..10 {
            assert_eq!(SensorType::from_code(code).code(), code);
            assert_eq!(SensorControl::from_code(code).code(), code);
            assert_eq!(FanType::from_code(code).code(), code);
        }
    }

    #[test]
    fn test_known_codes() {
        assert_eq!(SensorType::from_code(2), SensorType::Fahrenheit);
        assert_eq!(SensorControl::from_code(4), SensorControl::SensorAMinusD);
        assert_eq!(SensorControl::from_code(7), SensorControl::Manual);
        assert_eq!(FanType::from_code(5), FanType::FourWire);
        assert_eq!(FanType::from_code(9), FanType::Unknown(9));
    }

    #[test]
    fn test_unknown_with_known_code_equals_named_variant() {
        use std::collections::HashSet;

        assert_eq!(SensorType::Unknown(1), SensorType::Celsius);
        assert_eq!(SensorControl::Unknown(7), SensorControl::Manual);
        assert_eq!(FanType::Unknown(0), FanType::NotConnected);
        assert_ne!(FanType::Unknown(6), FanType::FourWire);

        let set: HashSet<_> = [SensorType::Unknown(2), SensorType::Fahrenheit]
            .into_iter()
            .collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_deserialized_unknown_is_canonical() {
        let config: Config = toml::from_str(
            r#"
            [sensor_types]
            sensor_a = { unknown = 1 }
            sensor_b = { unknown = 42 }

            [[fans]]
            sensor_control = { unknown = 7 }
            fan_type_a = { unknown = 0 }

            [[fans]]
            [[fans]]
            [[fans]]
            "#,
        )
        .unwrap();

        assert!(matches!(config.sensor_types.sensor_a, SensorType::Celsius));
        assert!(matches!(config.sensor_types.sensor_b, SensorType::Unknown(42)));
        assert!(matches!(config.fans[0].sensor_control, SensorControl::Manual));
        assert!(matches!(config.fans[0].fan_type_a, FanType::NotConnected));
    }

    #[test]
    fn test_partial_sensor_types_table() {
        let config: Config = toml::from_str(
            r#"
            [sensor_types]
            sensor_c = "fahrenheit"
            "#,
        )
        .unwrap();

        assert_eq!(config.sensor_types.sensor_a, SensorType::NotConnected);
        assert_eq!(config.sensor_types.sensor_c, SensorType::Fahrenheit);
        assert_eq!(config.fans, [FanConfig::default(); FAN_CHANNELS]);
    }

    #[test]
    fn test_sensor_connected() {
        assert!(!SensorType::NotConnected.is_connected());
        assert!(SensorType::Celsius.is_connected());
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let mut config = Config::default();
        config.sensor_types.sensor_b = SensorType::Celsius;
        config.fans[2] = FanConfig {
            minimum_power: 30,
            sensor_control: SensorControl::SensorBMinusD,
            minimum_temperature: 25,
            maximum_temperature: 60,
            allow_stopped: true,
            fan_type_a: FanType::FourWire,
            fan_type_b: FanType::Unknown(12),
        };

        let text = toml::to_string_pretty(&config).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }
}
