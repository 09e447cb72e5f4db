//! Channel and signal-class calibration tables
//!
//! The ECU logs raw 16-bit samples; converting them to physical units requires
//! two constant tables: the signal classes (linear coefficient/offset plus
//! unit) and the channel map (channel code to name and signal class).
//!
//! Both tables are process-wide constants in the original firmware tooling.
//! Here they are wrapped in an explicit immutable [`ChannelTable`] handed to
//! the record decoder, so tests can substitute calibration fixtures without
//! touching shared state.

use std::collections::HashMap;

/// Index of the status/bitfield signal class ("bin")
///
/// Samples in this class are the only unsigned ones; everything else is
/// two's-complement signed.
pub const STATUS_CLASS: usize = 25;

/// Linear calibration for one class of signals
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalClass {
    /// Multiplier applied to the raw sample
    pub coefficient: f64,
    /// Offset added after scaling
    pub offset: f64,
    /// Engineering unit (e.g. "rpm", "deg C", "bar")
    pub unit: &'static str,
    /// Decimal places carried by the physical value when rendered
    pub decimals: usize,
}

/// Static definition of one logger channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelDefinition {
    /// Channel code as recorded in the session lead-in configuration
    pub code: u16,
    /// Human-readable channel name
    pub name: &'static str,
    /// Index into the signal-class table
    pub class: usize,
}

/// Signal conversion classes, indexed by class number
///
/// A raw temperature sample of 0 decodes to -273.14 (class 8). That value is
/// the ECU's "sensor not yet initialized" sentinel and is preserved, not
/// filtered out.
const SIGNAL_CLASSES: [SignalClass; 26] = [
    SignalClass { coefficient: 10.0, offset: 0.0, unit: "rpm/s", decimals: 0 },
    SignalClass { coefficient: 0.01955034, offset: 0.0, unit: "V", decimals: 1 },
    SignalClass { coefficient: 9.424778, offset: 0.0, unit: "W", decimals: 0 },
    SignalClass { coefficient: 0.0001220703, offset: 0.0, unit: "-", decimals: 0 },
    SignalClass { coefficient: 0.1, offset: 0.0, unit: "Nm", decimals: 0 },
    SignalClass { coefficient: 1.0, offset: 0.0, unit: "hPa", decimals: 0 },
    SignalClass { coefficient: 1.0, offset: 0.0, unit: "hPa", decimals: 0 },
    SignalClass { coefficient: 0.0234375, offset: 0.0, unit: "deg CrS", decimals: 0 },
    SignalClass { coefficient: 0.1, offset: -273.14, unit: "deg C", decimals: 1 },
    SignalClass { coefficient: 1.0, offset: 0.0, unit: "deg C/s", decimals: 0 },
    SignalClass { coefficient: 0.01, offset: 0.0, unit: "mm3/cyc", decimals: 0 },
    SignalClass { coefficient: 0.1, offset: 0.0, unit: "bar", decimals: 1 },
    SignalClass { coefficient: 0.01, offset: 0.0, unit: "%", decimals: 1 },
    SignalClass { coefficient: 0.1, offset: 0.0, unit: "mm", decimals: 0 },
    SignalClass { coefficient: 0.1, offset: 0.0, unit: "Nm", decimals: 0 },
    SignalClass { coefficient: 0.01220703, offset: 0.0, unit: "%", decimals: 1 },
    SignalClass { coefficient: 0.01, offset: 0.0, unit: "mm3/hub", decimals: 0 },
    SignalClass { coefficient: 1.0, offset: 0.0, unit: "mA", decimals: 0 },
    SignalClass { coefficient: 0.01, offset: 0.0, unit: "l/h", decimals: 0 },
    SignalClass { coefficient: 4.887586, offset: 0.0, unit: "mV", decimals: 0 },
    SignalClass { coefficient: 1.0, offset: 0.0, unit: "-", decimals: 0 },
    SignalClass { coefficient: 1.0, offset: 0.0, unit: "us", decimals: 0 },
    SignalClass { coefficient: 1.0, offset: 0.0, unit: "s", decimals: 0 },
    SignalClass { coefficient: 1.0, offset: 0.0, unit: "rpm", decimals: 0 },
    SignalClass { coefficient: 0.0234375, offset: 0.0, unit: "deg CrS", decimals: 0 },
    SignalClass { coefficient: 1.0, offset: 0.0, unit: "bin", decimals: 0 },
];

/// Data log channels known for the AE300 (codes 800-815)
const CHANNELS: [ChannelDefinition; 16] = [
    ChannelDefinition { code: 800, name: "Boost Pressure", class: 6 },
    ChannelDefinition { code: 801, name: "Ambient Air Pressure", class: 6 },
    ChannelDefinition { code: 802, name: "Propeller Speed", class: 23 },
    ChannelDefinition { code: 803, name: "Engine Oil Pressure", class: 6 },
    ChannelDefinition { code: 804, name: "Rail Pressure", class: 11 },
    ChannelDefinition { code: 805, name: "Power Lever Position", class: 15 },
    ChannelDefinition { code: 806, name: "Coolant Temperature", class: 8 },
    ChannelDefinition { code: 807, name: "Intake Air Temperature", class: 8 },
    ChannelDefinition { code: 808, name: "Battery Voltage", class: 1 },
    ChannelDefinition { code: 809, name: "Fuel Pressure", class: 6 },
    ChannelDefinition { code: 810, name: "Gearbox Oil Temperature", class: 8 },
    ChannelDefinition { code: 811, name: "Engine Oil Temperature", class: 8 },
    ChannelDefinition { code: 812, name: "Prop Actuator Duty Cycle", class: 12 },
    ChannelDefinition { code: 813, name: "Engine Status", class: STATUS_CLASS },
    ChannelDefinition { code: 814, name: "Engine Oil Level", class: 13 },
    ChannelDefinition { code: 815, name: "Engine Load", class: 15 },
];

/// Default 24-byte channel configuration (channels 800-815)
///
/// Sessions whose lead-in carries an all-zero configuration block fall back
/// to this layout.
pub const DEFAULT_CHANNEL_CONFIG: [u8; 24] = [
    50, 3, 33, 50, 35, 35, 50, 67, 37, 50, 99, 39,
    50, 131, 41, 50, 163, 43, 50, 195, 45, 50, 227, 47,
];

/// Immutable channel/signal-class lookup table
#[derive(Debug, Clone)]
pub struct ChannelTable {
    classes: Vec<SignalClass>,
    channels: HashMap<u16, ChannelDefinition>,
}

impl ChannelTable {
    /// The calibration tables embedded in the tooling
    pub fn builtin() -> Self {
        Self {
            classes: SIGNAL_CLASSES.to_vec(),
            channels: CHANNELS.iter().map(|c| (c.code, *c)).collect(),
        }
    }

    /// Build a table from explicit calibration data (test fixtures)
    pub fn new(classes: Vec<SignalClass>, channels: Vec<ChannelDefinition>) -> Self {
        Self {
            classes,
            channels: channels.into_iter().map(|c| (c.code, c)).collect(),
        }
    }

    /// Look up a channel definition by code
    pub fn channel(&self, code: u16) -> Option<&ChannelDefinition> {
        self.channels.get(&code)
    }

    /// Look up the signal class of a channel code
    pub fn class_of(&self, code: u16) -> Option<&SignalClass> {
        self.channel(code).and_then(|c| self.classes.get(c.class))
    }

    /// True if samples for this code are unsigned (status/bitfield class)
    pub fn is_unsigned(&self, code: u16) -> bool {
        self.channel(code)
            .map(|c| c.class == STATUS_CLASS)
            .unwrap_or(false)
    }

    /// Convert a raw sample for `code` to its physical value
    ///
    /// Unknown channel codes pass through unscaled.
    pub fn scale(&self, code: u16, raw: f64) -> f64 {
        match self.class_of(code) {
            Some(class) => raw * class.coefficient + class.offset,
            None => raw,
        }
    }
}

impl Default for ChannelTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Parse a 24-byte lead-in configuration block into 16 channel codes
///
/// Each byte contributes two nibbles; consecutive nibble triplets form one
/// 12-bit channel code.
pub fn parse_channel_config(config: &[u8; 24]) -> Vec<u16> {
    let mut nibbles = Vec::with_capacity(48);
    for b in config {
        nibbles.push((b >> 4) & 0x0F);
        nibbles.push(b & 0x0F);
    }
    nibbles
        .chunks_exact(3)
        .map(|n| ((n[0] as u16) << 8) | ((n[1] as u16) << 4) | (n[2] as u16))
        .collect()
}

/// The channel layout used when a lead-in carries no configuration
pub fn default_channels() -> Vec<u16> {
    parse_channel_config(&DEFAULT_CHANNEL_CONFIG)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_decodes_to_800_815() {
        let channels = default_channels();
        let expected: Vec<u16> = (800..816).collect();
        assert_eq!(channels, expected);
    }

    #[test]
    fn test_temperature_sentinel() {
        // Raw 0 on a temperature channel is the "sensor not initialized"
        // sentinel and must decode to the class offset exactly.
        let table = ChannelTable::builtin();
        assert_eq!(table.scale(806, 0.0), -273.14);
        assert_eq!(table.scale(811, 0.0), -273.14);
    }

    #[test]
    fn test_engine_status_is_unsigned() {
        let table = ChannelTable::builtin();
        assert!(table.is_unsigned(813));
        assert!(!table.is_unsigned(802));
    }

    #[test]
    fn test_unknown_code_passes_through() {
        let table = ChannelTable::builtin();
        assert_eq!(table.scale(999, 42.0), 42.0);
        assert!(table.channel(999).is_none());
    }

    #[test]
    fn test_propeller_speed_scaling() {
        let table = ChannelTable::builtin();
        // Class 23 is plain rpm with unit coefficient.
        assert_eq!(table.scale(802, 2300.0), 2300.0);
        assert_eq!(table.class_of(802).unwrap().unit, "rpm");
    }
}
