//! Measurement catalogue for the hourly logs.
//!
//! Each catalogue entry becomes one column of the slot table, with a named
//! check constraint built from its hard bounds, and drives validation.

use super::stream::LogKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hard bounds plus an optional narrower "ideal" band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
    pub ideal: Option<(f64, f64)>,
}

impl ValueRange {
    pub const fn hard(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            ideal: None,
        }
    }

    pub const fn with_ideal(min: f64, max: f64, ideal_min: f64, ideal_max: f64) -> Self {
        Self {
            min,
            max,
            ideal: Some((ideal_min, ideal_max)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    Numeric(ValueRange),
    /// Enumerated value; the empty string is the unset default.
    Choice(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub key: &'static str,
    pub label: &'static str,
    /// Form section the field belongs to (used for issue location).
    pub section: &'static str,
    pub unit: &'static str,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub fn range(&self) -> Option<&ValueRange> {
        match &self.kind {
            FieldKind::Numeric(r) => Some(r),
            FieldKind::Choice(_) => None,
        }
    }

    pub fn default_value(&self) -> FieldValue {
        match self.kind {
            FieldKind::Numeric(_) => FieldValue::Number(0.0),
            FieldKind::Choice(_) => FieldValue::Choice(String::new()),
        }
    }

    /// Parse operator input for this field.
    pub fn parse(&self, raw: &str) -> Option<FieldValue> {
        let raw = raw.trim();
        match self.kind {
            FieldKind::Numeric(_) => {
                if raw.is_empty() {
                    return Some(FieldValue::Number(0.0));
                }
                raw.replace(',', ".")
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .map(FieldValue::Number)
            }
            FieldKind::Choice(options) => {
                let lower = raw.to_lowercase();
                if lower.is_empty() || options.contains(&lower.as_str()) {
                    Some(FieldValue::Choice(lower))
                } else {
                    None
                }
            }
        }
    }
}

/// A typed measurement value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Choice(String),
}

impl FieldValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(v) => Some(*v),
            FieldValue::Choice(_) => None,
        }
    }

    pub fn is_unset(&self) -> bool {
        match self {
            FieldValue::Number(v) => *v == 0.0,
            FieldValue::Choice(s) => s.is_empty(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(v) => write!(f, "{v}"),
            FieldValue::Choice(s) => write!(f, "{s}"),
        }
    }
}

const fn num(
    key: &'static str,
    label: &'static str,
    section: &'static str,
    unit: &'static str,
    range: ValueRange,
) -> FieldSpec {
    FieldSpec {
        key,
        label,
        section,
        unit,
        kind: FieldKind::Numeric(range),
    }
}

const fn choice(
    key: &'static str,
    label: &'static str,
    section: &'static str,
    options: &'static [&'static str],
) -> FieldSpec {
    FieldSpec {
        key,
        label,
        section,
        unit: "",
        kind: FieldKind::Choice(options),
    }
}

pub static GENERATOR_FIELDS: &[FieldSpec] = &[
    // Electrical
    num("active_power_mw", "Active power", "electrical", "MW", ValueRange::with_ideal(0.0, 12.0, 2.0, 10.0)),
    num("reactive_power_mvar", "Reactive power", "electrical", "MVAr", ValueRange::with_ideal(-6.0, 6.0, -3.0, 4.0)),
    num("stator_voltage_kv", "Stator voltage", "electrical", "kV", ValueRange::with_ideal(0.0, 7.5, 5.9, 6.7)),
    num("stator_current_a", "Stator current", "electrical", "A", ValueRange::with_ideal(0.0, 1200.0, 0.0, 1000.0)),
    num("frequency_hz", "Frequency", "electrical", "Hz", ValueRange::with_ideal(45.0, 55.0, 49.5, 50.5)),
    num("power_factor", "Power factor", "electrical", "", ValueRange::with_ideal(0.0, 1.0, 0.85, 1.0)),
    num("excitation_voltage_v", "Excitation voltage", "excitation", "V", ValueRange::with_ideal(0.0, 300.0, 80.0, 220.0)),
    num("excitation_current_a", "Excitation current", "excitation", "A", ValueRange::with_ideal(0.0, 800.0, 150.0, 600.0)),
    num("energy_counter_mwh", "Energy counter", "electrical", "MWh", ValueRange::hard(0.0, 10_000_000.0)),
    // Winding temperatures
    num("stator_temp_r_c", "Stator winding temperature R", "temperature", "°C", ValueRange::with_ideal(0.0, 200.0, 0.0, 180.0)),
    num("stator_temp_s_c", "Stator winding temperature S", "temperature", "°C", ValueRange::with_ideal(0.0, 200.0, 0.0, 180.0)),
    num("stator_temp_t_c", "Stator winding temperature T", "temperature", "°C", ValueRange::with_ideal(0.0, 200.0, 0.0, 180.0)),
    // Bearings
    num("thrust_bearing_temp_c", "Thrust bearing temperature", "bearing", "°C", ValueRange::with_ideal(0.0, 120.0, 0.0, 75.0)),
    num("upper_guide_bearing_temp_c", "Upper guide bearing temperature", "bearing", "°C", ValueRange::with_ideal(0.0, 120.0, 0.0, 70.0)),
    num("lower_guide_bearing_temp_c", "Lower guide bearing temperature", "bearing", "°C", ValueRange::with_ideal(0.0, 120.0, 0.0, 70.0)),
    num("turbine_bearing_temp_c", "Turbine bearing temperature", "bearing", "°C", ValueRange::with_ideal(0.0, 120.0, 0.0, 70.0)),
    num("vibration_mm_s", "Vibration", "bearing", "mm/s", ValueRange::with_ideal(0.0, 20.0, 0.0, 4.5)),
    // Turbine and governor
    num("turbine_speed_rpm", "Turbine speed", "turbine", "rpm", ValueRange::with_ideal(0.0, 900.0, 740.0, 760.0)),
    num("guide_vane_opening_pct", "Guide vane opening", "turbine", "%", ValueRange::hard(0.0, 100.0)),
    num("governor_oil_pressure_bar", "Governor oil pressure", "turbine", "bar", ValueRange::with_ideal(0.0, 80.0, 38.0, 45.0)),
    // Cooling and water
    num("cooling_water_pressure_bar", "Cooling water pressure", "cooling", "bar", ValueRange::with_ideal(0.0, 10.0, 1.5, 4.0)),
    num("cooling_water_temp_c", "Cooling water temperature", "cooling", "°C", ValueRange::with_ideal(0.0, 60.0, 0.0, 35.0)),
    num("headwater_level_masl", "Headwater level", "water", "m a.s.l.", ValueRange::hard(400.0, 560.0)),
    num("tailwater_level_masl", "Tailwater level", "water", "m a.s.l.", ValueRange::hard(380.0, 460.0)),
    choice("cooling_system_status", "Cooling system", "cooling", &["normal", "abnormal", "off"]),
    choice("breaker_status", "Generator breaker", "electrical", &["closed", "open", "tripped"]),
    num("negative_sequence_current_pct", "Negative sequence current", "electrical", "%", ValueRange::with_ideal(0.0, 30.0, 0.0, 8.0)),
    // Excitation
    num("avr_setpoint_kv", "AVR voltage setpoint", "excitation", "kV", ValueRange::hard(0.0, 7.5)),
    choice("excitation_mode", "Excitation mode", "excitation", &["auto", "manual"]),
    // Machine air and core
    num("air_inlet_temp_c", "Generator air inlet temperature", "temperature", "°C", ValueRange::with_ideal(0.0, 80.0, 0.0, 40.0)),
    num("air_outlet_temp_c", "Generator air outlet temperature", "temperature", "°C", ValueRange::with_ideal(0.0, 100.0, 0.0, 65.0)),
    num("stator_core_temp_c", "Stator core temperature", "temperature", "°C", ValueRange::with_ideal(0.0, 150.0, 0.0, 110.0)),
    // Bearing oil and shaft
    num("thrust_bearing_oil_temp_c", "Thrust bearing oil temperature", "bearing", "°C", ValueRange::with_ideal(0.0, 100.0, 0.0, 60.0)),
    num("shaft_vibration_um", "Shaft vibration", "bearing", "µm", ValueRange::with_ideal(0.0, 300.0, 0.0, 100.0)),
    choice("bearing_oil_level", "Bearing oil level", "bearing", &["low", "normal", "high"]),
    // Waterways
    num("spiral_case_pressure_bar", "Spiral case pressure", "turbine", "bar", ValueRange::with_ideal(0.0, 20.0, 8.0, 14.0)),
    num("runner_cover_pressure_bar", "Runner cover pressure", "turbine", "bar", ValueRange::hard(-1.0, 10.0)),
    num("draft_tube_pressure_bar", "Draft tube pressure", "turbine", "bar", ValueRange::hard(-1.0, 5.0)),
    choice("governor_oil_level", "Governor oil level", "turbine", &["low", "normal", "high"]),
    choice("governor_mode", "Governor mode", "turbine", &["auto", "manual", "remote"]),
    choice("brake_status", "Generator brake", "turbine", &["released", "applied"]),
    num("cooling_water_flow_m3h", "Cooling water flow", "cooling", "m³/h", ValueRange::with_ideal(0.0, 500.0, 150.0, 400.0)),
    num("cooler_outlet_temp_c", "Air cooler outlet temperature", "cooling", "°C", ValueRange::with_ideal(0.0, 60.0, 0.0, 40.0)),
    num("shaft_seal_water_flow_lpm", "Shaft seal water flow", "cooling", "l/min", ValueRange::with_ideal(0.0, 200.0, 30.0, 120.0)),
    num("turbine_flow_m3s", "Turbine discharge", "water", "m³/s", ValueRange::hard(0.0, 30.0)),
    num("net_head_m", "Net head", "water", "m", ValueRange::hard(0.0, 200.0)),
];

pub static TRANSFORMER_FIELDS: &[FieldSpec] = &[
    num("oil_temp_c", "Top oil temperature", "temperature", "°C", ValueRange::with_ideal(0.0, 120.0, 0.0, 85.0)),
    num("winding_temp_hv_c", "HV winding temperature", "temperature", "°C", ValueRange::with_ideal(0.0, 150.0, 0.0, 100.0)),
    num("winding_temp_lv_c", "LV winding temperature", "temperature", "°C", ValueRange::with_ideal(0.0, 150.0, 0.0, 100.0)),
    num("ambient_temp_c", "Ambient temperature", "temperature", "°C", ValueRange::hard(0.0, 50.0)),
    num("primary_voltage_kv", "Primary voltage", "electrical", "kV", ValueRange::with_ideal(0.0, 165.0, 142.5, 157.5)),
    num("secondary_voltage_kv", "Secondary voltage", "electrical", "kV", ValueRange::with_ideal(0.0, 7.5, 5.9, 6.7)),
    num("primary_current_a", "Primary current", "electrical", "A", ValueRange::with_ideal(0.0, 200.0, 0.0, 160.0)),
    num("secondary_current_a", "Secondary current", "electrical", "A", ValueRange::with_ideal(0.0, 1500.0, 0.0, 1250.0)),
    num("neutral_current_a", "Neutral current", "electrical", "A", ValueRange::with_ideal(0.0, 50.0, 0.0, 5.0)),
    num("active_power_mw", "Active power", "electrical", "MW", ValueRange::hard(0.0, 15.0)),
    num("reactive_power_mvar", "Reactive power", "electrical", "MVAr", ValueRange::hard(-8.0, 8.0)),
    num("tap_position", "Tap position", "tap changer", "", ValueRange::hard(1.0, 17.0)),
    num("oltc_counter", "OLTC operations counter", "tap changer", "", ValueRange::hard(0.0, 1_000_000.0)),
    choice("oil_level", "Oil level", "protection", &["low", "normal", "high"]),
    choice("silica_gel", "Silica gel", "protection", &["good", "saturated"]),
    choice("cooling_fans", "Cooling fans", "cooling", &["auto", "manual", "off"]),
    choice("buchholz_relay", "Buchholz relay", "protection", &["normal", "alarm", "trip"]),
    choice("pressure_relief", "Pressure relief device", "protection", &["normal", "operated"]),
    num("bottom_oil_temp_c", "Bottom oil temperature", "temperature", "°C", ValueRange::with_ideal(0.0, 100.0, 0.0, 70.0)),
    num("hot_spot_temp_c", "Winding hot spot temperature", "temperature", "°C", ValueRange::with_ideal(0.0, 160.0, 0.0, 110.0)),
    num("secondary_current_r_a", "Secondary current R", "electrical", "A", ValueRange::with_ideal(0.0, 1500.0, 0.0, 1250.0)),
    num("secondary_current_s_a", "Secondary current S", "electrical", "A", ValueRange::with_ideal(0.0, 1500.0, 0.0, 1250.0)),
    num("secondary_current_t_a", "Secondary current T", "electrical", "A", ValueRange::with_ideal(0.0, 1500.0, 0.0, 1250.0)),
    num("earth_fault_current_a", "Earth fault current", "electrical", "A", ValueRange::with_ideal(0.0, 100.0, 0.0, 2.0)),
    num("apparent_power_mva", "Apparent power", "electrical", "MVA", ValueRange::with_ideal(0.0, 18.0, 0.0, 15.0)),
    num("power_factor", "Power factor", "electrical", "", ValueRange::with_ideal(0.0, 1.0, 0.85, 1.0)),
    num("frequency_hz", "Frequency", "electrical", "Hz", ValueRange::with_ideal(45.0, 55.0, 49.5, 50.5)),
    num("load_pct", "Loading", "electrical", "%", ValueRange::with_ideal(0.0, 150.0, 0.0, 100.0)),
    // Oil condition
    num("conservator_level_pct", "Conservator oil level", "oil", "%", ValueRange::with_ideal(0.0, 100.0, 30.0, 80.0)),
    num("oil_moisture_ppm", "Oil moisture", "oil", "ppm", ValueRange::with_ideal(0.0, 60.0, 0.0, 20.0)),
    num("dissolved_hydrogen_ppm", "Dissolved hydrogen", "oil", "ppm", ValueRange::with_ideal(0.0, 2000.0, 0.0, 100.0)),
    num("oil_breakdown_kv", "Oil breakdown voltage", "oil", "kV", ValueRange::with_ideal(0.0, 100.0, 50.0, 100.0)),
    // Tap changer
    num("oltc_oil_temp_c", "OLTC oil temperature", "tap changer", "°C", ValueRange::with_ideal(0.0, 100.0, 0.0, 70.0)),
    choice("oltc_oil_level", "OLTC oil level", "tap changer", &["low", "normal", "high"]),
    choice("oltc_mode", "OLTC control mode", "tap changer", &["auto", "manual"]),
    // Cooling
    choice("cooling_stage", "Cooling stage", "cooling", &["off", "stage_1", "stage_2"]),
    choice("oil_pump", "Oil circulation pump", "cooling", &["running", "stopped"]),
    // Protection
    choice("winding_temp_relay", "Winding temperature relay", "protection", &["normal", "alarm", "trip"]),
    choice("oil_temp_relay", "Oil temperature relay", "protection", &["normal", "alarm", "trip"]),
    choice("differential_relay", "Differential relay", "protection", &["normal", "trip"]),
];

pub fn catalogue(kind: LogKind) -> &'static [FieldSpec] {
    match kind {
        LogKind::Generator => GENERATOR_FIELDS,
        LogKind::Transformer => TRANSFORMER_FIELDS,
    }
}

pub fn lookup(kind: LogKind, key: &str) -> Option<&'static FieldSpec> {
    catalogue(kind).iter().find(|f| f.key == key)
}
