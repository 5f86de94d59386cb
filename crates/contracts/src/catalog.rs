//! Variable Catalog
//!
//! Static table of recordable variables and their cardinality. It is the single
//! source of truth for both header expansion and placeholder width, so the two
//! can never disagree.

use serde::{Deserialize, Serialize};

/// Name of the device clock variable; its value is rebased onto wall-clock time.
pub const TIMESTAMP_VARIABLE: &str = "timestamp";

/// Number of scalar fields a variable contributes to a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arity {
    #[default]
    One,
    Three,
    Six,
}

impl Arity {
    /// Column count
    pub const fn width(self) -> usize {
        match self {
            Arity::One => 1,
            Arity::Three => 3,
            Arity::Six => 6,
        }
    }

    /// Map a raw width back to an arity
    pub fn from_width(width: usize) -> Option<Self> {
        match width {
            1 => Some(Arity::One),
            3 => Some(Arity::Three),
            6 => Some(Arity::Six),
            _ => None,
        }
    }
}

/// Static catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: &'static str,
    pub arity: Arity,
    pub description: &'static str,
}

const fn entry(name: &'static str, arity: Arity, description: &'static str) -> CatalogEntry {
    CatalogEntry {
        name,
        arity,
        description,
    }
}

/// Every variable the recorder knows how to lay out, in default recording order
pub const CATALOG: &[CatalogEntry] = &[
    entry(TIMESTAMP_VARIABLE, Arity::One, "controller time since start [s]"),
    entry("target_q", Arity::Six, "target joint positions [rad]"),
    entry("target_qd", Arity::Six, "target joint velocities [rad/s]"),
    entry("target_qdd", Arity::Six, "target joint accelerations [rad/s^2]"),
    entry("target_current", Arity::Six, "target joint currents [A]"),
    entry("target_moment", Arity::Six, "target joint moments [Nm]"),
    entry("actual_q", Arity::Six, "actual joint positions [rad]"),
    entry("actual_qd", Arity::Six, "actual joint velocities [rad/s]"),
    entry("actual_current", Arity::Six, "actual joint currents [A]"),
    entry("joint_control_output", Arity::Six, "joint control currents [A]"),
    entry("actual_TCP_pose", Arity::Six, "actual tool pose (x, y, z, rx, ry, rz)"),
    entry("actual_TCP_speed", Arity::Six, "actual tool speed"),
    entry("actual_TCP_force", Arity::Six, "generalized tool force [N, Nm]"),
    entry("target_TCP_pose", Arity::Six, "target tool pose"),
    entry("target_TCP_speed", Arity::Six, "target tool speed"),
    entry("actual_digital_input_bits", Arity::One, "digital input bitfield"),
    entry("joint_temperatures", Arity::Six, "joint temperatures [C]"),
    entry("actual_execution_time", Arity::One, "controller real-time thread time [ms]"),
    entry("robot_mode", Arity::One, "robot mode"),
    entry("joint_mode", Arity::Six, "joint control modes"),
    entry("safety_mode", Arity::One, "safety mode"),
    entry("actual_tool_accelerometer", Arity::Three, "tool accelerometer [m/s^2]"),
    entry("speed_scaling", Arity::One, "speed scaling of the trajectory limiter"),
    entry("target_speed_fraction", Arity::One, "target speed fraction"),
    entry("actual_momentum", Arity::One, "norm of Cartesian linear momentum"),
    entry("actual_main_voltage", Arity::One, "safety control board main voltage [V]"),
    entry("actual_robot_voltage", Arity::One, "safety control board robot voltage [V]"),
    entry("actual_robot_current", Arity::One, "safety control board robot current [A]"),
    entry("actual_joint_voltage", Arity::Six, "actual joint voltages [V]"),
    entry("actual_digital_output_bits", Arity::One, "digital output bitfield"),
    entry("runtime_state", Arity::One, "program state"),
    entry("elbow_position", Arity::Three, "elbow position in base frame [m]"),
    entry("elbow_velocity", Arity::Three, "elbow velocity in base frame [m/s]"),
    entry("robot_status_bits", Arity::One, "robot status bitfield"),
    entry("safety_status_bits", Arity::One, "safety status bitfield"),
    entry("standard_analog_input0", Arity::One, "standard analog input 0"),
    entry("standard_analog_input1", Arity::One, "standard analog input 1"),
    entry("standard_analog_output0", Arity::One, "standard analog output 0"),
    entry("standard_analog_output1", Arity::One, "standard analog output 1"),
    entry("payload", Arity::One, "payload mass [kg]"),
    entry("payload_cog", Arity::Three, "payload center of gravity [m]"),
    entry("ft_raw_wrench", Arity::Six, "raw force/torque sensor wrench"),
];

/// Look up a catalog entry by exact name
pub fn lookup(name: &str) -> Option<&'static CatalogEntry> {
    CATALOG.iter().find(|e| e.name == name)
}

/// Cardinality of a variable; unknown names are treated as scalars so that a
/// failed read still produces exactly one placeholder cell.
pub fn arity_of(name: &str) -> Arity {
    lookup(name).map(|e| e.arity).unwrap_or_default()
}

/// Whether the catalog knows this name
pub fn is_known(name: &str) -> bool {
    lookup(name).is_some()
}

/// A variable selected for recording
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariableSpec {
    pub name: String,
    pub arity: Arity,
}

impl VariableSpec {
    /// Resolve a name against the catalog
    pub fn resolve(name: impl Into<String>) -> Self {
        let name = name.into();
        let arity = arity_of(&name);
        Self { name, arity }
    }

    /// Whether this is the device clock column
    pub fn is_timestamp(&self) -> bool {
        self.name == TIMESTAMP_VARIABLE
    }

    /// Expanded column names: `v_0 .. v_{N-1}`, or the bare name for scalars
    pub fn columns(&self) -> Vec<String> {
        match self.arity {
            Arity::One => vec![self.name.clone()],
            arity => (0..arity.width())
                .map(|i| format!("{}_{}", self.name, i))
                .collect(),
        }
    }
}

/// Resolve a list of names, preserving order
pub fn resolve_all<S: AsRef<str>>(names: &[S]) -> Vec<VariableSpec> {
    names
        .iter()
        .map(|n| VariableSpec::resolve(n.as_ref()))
        .collect()
}

/// Every catalog variable, in catalog order
pub fn default_variables() -> Vec<VariableSpec> {
    CATALOG
        .iter()
        .map(|e| VariableSpec {
            name: e.name.to_string(),
            arity: e.arity,
        })
        .collect()
}

/// Ordered header columns for a variable list
pub fn ordered_columns(variables: &[VariableSpec]) -> Vec<String> {
    variables.iter().flat_map(VariableSpec::columns).collect()
}

/// Total scalar width of a variable list
pub fn row_width(variables: &[VariableSpec]) -> usize {
    variables.iter().map(|v| v.arity.width()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_arity_of_known_and_unknown() {
        assert_eq!(arity_of("timestamp"), Arity::One);
        assert_eq!(arity_of("actual_q"), Arity::Six);
        assert_eq!(arity_of("actual_tool_accelerometer"), Arity::Three);
        assert_eq!(arity_of("no_such_thing"), Arity::One);
    }

    #[test]
    fn test_catalog_names_unique() {
        let mut seen = HashSet::new();
        for e in CATALOG {
            assert!(seen.insert(e.name), "duplicate catalog entry {}", e.name);
        }
    }

    #[test]
    fn test_columns_expansion() {
        let vars = resolve_all(&["timestamp", "actual_TCP_force", "payload_cog"]);
        let cols = ordered_columns(&vars);
        assert_eq!(cols[0], "timestamp");
        assert_eq!(cols[1], "actual_TCP_force_0");
        assert_eq!(cols[6], "actual_TCP_force_5");
        assert_eq!(cols[7], "payload_cog_0");
        assert_eq!(cols.len(), 10);
        assert_eq!(row_width(&vars), cols.len());
    }

    #[test]
    fn test_header_width_matches_row_width_for_catalog() {
        let vars = default_variables();
        assert_eq!(ordered_columns(&vars).len(), row_width(&vars));
        assert_eq!(vars.len(), CATALOG.len());
    }

    #[test]
    fn test_arity_from_width() {
        assert_eq!(Arity::from_width(6), Some(Arity::Six));
        assert_eq!(Arity::from_width(2), None);
    }
}
