//! Mapping configuration.
//!
//! Supports:
//! 1. Device specification strings (`path(5)`, `grid(3, 4)`, `file(dev.txt)`)
//! 2. Router tuning parameters ([`SabreOptions`])
//! 3. YAML configuration files combining both ([`MappingConfig`])
//!
//! ```yaml
//! device: ring(8)
//! sabre:
//!   extended_layer_size: 20
//!   extended_layer_weight: 0.5
//!   decay_delta: 0.5
//!   rounds_decay_reset: 5
//!   release_valve: 100
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::device::Device;
use crate::error::{CompileError, CompileResult};

/// A device topology selection.
///
/// Dimensions left out are inferred from the program size when the device
/// is built (see [`DeviceSpec::build`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceSpec {
    /// A line of qubits.
    Path(Option<u32>),
    /// A closed line of qubits.
    Ring(Option<u32>),
    /// Qubits connected to a single center.
    Star {
        /// Number of qubits.
        qubits: Option<u32>,
        /// Center qubit, 0 when omitted.
        center: Option<u32>,
    },
    /// A row-major 2-D lattice.
    Grid {
        /// Columns.
        width: Option<u32>,
        /// Rows, equal to `width` when omitted.
        height: Option<u32>,
    },
    /// A device description file (see [`Device::parse`]).
    File(PathBuf),
}

impl DeviceSpec {
    /// Build the device for a program allocating `num_sources` qubits.
    ///
    /// `path`, `ring` and `star` without dimensions get one qubit per source;
    /// `grid` without dimensions becomes the smallest square holding every
    /// source.
    pub fn build(&self, num_sources: usize) -> CompileResult<Device> {
        let inferred = u32::try_from(num_sources).map_err(|_| {
            CompileError::InvalidConfiguration(format!("{num_sources} qubits exceed device limits"))
        })?;

        match self {
            DeviceSpec::Path(n) => Device::path(n.unwrap_or(inferred)),
            DeviceSpec::Ring(n) => Device::ring(n.unwrap_or(inferred)),
            DeviceSpec::Star { qubits, center } => {
                Device::star(qubits.unwrap_or(inferred), center.unwrap_or(0))
            }
            DeviceSpec::Grid { width, height } => match (width, height) {
                (Some(w), Some(h)) => Device::grid(*w, *h),
                (Some(w), None) => Device::grid(*w, *w),
                _ => {
                    let side = ceil_sqrt(inferred);
                    Device::grid(side, side)
                }
            },
            DeviceSpec::File(path) => Device::from_file(path),
        }
    }
}

fn ceil_sqrt(n: u32) -> u32 {
    let mut side = 0u32;
    while u64::from(side) * u64::from(side) < u64::from(n) {
        side += 1;
    }
    side
}

impl Default for DeviceSpec {
    fn default() -> Self {
        DeviceSpec::Path(None)
    }
}

impl FromStr for DeviceSpec {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let spec = s.trim();
        let invalid = |reason: &str| CompileError::InvalidDeviceSpec {
            spec: spec.to_string(),
            reason: reason.to_string(),
        };

        let (name, args) = match spec.find('(') {
            Some(open) => {
                let inner = spec[open + 1..]
                    .strip_suffix(')')
                    .ok_or_else(|| invalid("missing closing ')'"))?;
                (spec[..open].trim(), Some(inner.trim()))
            }
            None => (spec, None),
        };
        let name = name.to_ascii_lowercase();

        if name == "file" {
            return match args {
                Some(path) if !path.is_empty() => Ok(DeviceSpec::File(PathBuf::from(path))),
                _ => Err(invalid(
                    "a filename must be provided like file(/full/path/to/device_file.txt)",
                )),
            };
        }

        let dims: Vec<u32> = match args {
            None | Some("") => vec![],
            Some(args) => args
                .split(',')
                .map(|d| {
                    d.trim()
                        .parse()
                        .map_err(|_| invalid(&format!("'{}' is not a dimension", d.trim())))
                })
                .collect::<Result<_, _>>()?,
        };
        if dims.len() > 2 {
            return Err(invalid("at most two dimensions are allowed"));
        }
        let first = dims.first().copied();
        let second = dims.get(1).copied();

        match name.as_str() {
            "path" | "ring" if second.is_some() => {
                Err(invalid(&format!("'{name}' takes a single dimension")))
            }
            "path" => Ok(DeviceSpec::Path(first)),
            "ring" => Ok(DeviceSpec::Ring(first)),
            "star" => Ok(DeviceSpec::Star {
                qubits: first,
                center: second,
            }),
            "grid" => Ok(DeviceSpec::Grid {
                width: first,
                height: second,
            }),
            _ => Err(invalid(&format!(
                "unknown device '{name}' (expected path, ring, star, grid or file)"
            ))),
        }
    }
}

impl fmt::Display for DeviceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceSpec::Path(n) => write_dims(f, "path", *n, None),
            DeviceSpec::Ring(n) => write_dims(f, "ring", *n, None),
            DeviceSpec::Star { qubits, center } => write_dims(f, "star", *qubits, *center),
            DeviceSpec::Grid { width, height } => write_dims(f, "grid", *width, *height),
            DeviceSpec::File(path) => write!(f, "file({})", path.display()),
        }
    }
}

fn write_dims(f: &mut fmt::Formatter<'_>, name: &str, a: Option<u32>, b: Option<u32>) -> fmt::Result {
    match (a, b) {
        (Some(a), Some(b)) => write!(f, "{name}({a}, {b})"),
        (Some(a), None) => write!(f, "{name}({a})"),
        _ => write!(f, "{name}"),
    }
}

/// SABRE router parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SabreOptions {
    /// Maximum number of two-qubit operations in the lookahead layer.
    /// Zero disables lookahead.
    #[serde(default = "default_extended_layer_size")]
    pub extended_layer_size: usize,

    /// Weight of the lookahead cost relative to the front layer cost.
    #[serde(default = "default_extended_layer_weight")]
    pub extended_layer_weight: f64,

    /// Decay added to both qubits of a chosen swap.
    #[serde(default = "default_decay_delta")]
    pub decay_delta: f64,

    /// Decay weights reset to 1.0 every this many swap searches.
    #[serde(default = "default_rounds_decay_reset")]
    pub rounds_decay_reset: u32,

    /// Consecutive swaps without progress before the router forces the
    /// oldest blocked operation along a shortest path.
    #[serde(default = "default_release_valve")]
    pub release_valve: u32,
}

fn default_extended_layer_size() -> usize {
    20
}

fn default_extended_layer_weight() -> f64 {
    0.5
}

fn default_decay_delta() -> f64 {
    0.5
}

fn default_rounds_decay_reset() -> u32 {
    5
}

fn default_release_valve() -> u32 {
    100
}

impl Default for SabreOptions {
    fn default() -> Self {
        Self {
            extended_layer_size: default_extended_layer_size(),
            extended_layer_weight: default_extended_layer_weight(),
            decay_delta: default_decay_delta(),
            rounds_decay_reset: default_rounds_decay_reset(),
            release_valve: default_release_valve(),
        }
    }
}

impl SabreOptions {
    /// Check parameter ranges.
    pub fn validate(&self) -> CompileResult<()> {
        if self.rounds_decay_reset == 0 {
            return Err(CompileError::InvalidConfiguration(
                "rounds_decay_reset must be at least 1".into(),
            ));
        }
        if self.release_valve == 0 {
            return Err(CompileError::InvalidConfiguration(
                "release_valve must be at least 1".into(),
            ));
        }
        for (name, value) in [
            ("extended_layer_weight", self.extended_layer_weight),
            ("decay_delta", self.decay_delta),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(CompileError::InvalidConfiguration(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Complete mapping configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingConfig {
    /// Device specification string.
    #[serde(default = "default_device")]
    pub device: String,

    /// Router parameters.
    #[serde(default)]
    pub sabre: SabreOptions,
}

fn default_device() -> String {
    "path".to_string()
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            sabre: SabreOptions::default(),
        }
    }
}

impl MappingConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> CompileResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            CompileError::InvalidConfiguration(format!(
                "cannot read {}: {e}",
                path.as_ref().display()
            ))
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Parse configuration from YAML text.
    pub fn from_yaml_str(yaml: &str) -> CompileResult<Self> {
        let config: MappingConfig = serde_yaml_ng::from_str(yaml)
            .map_err(|e| CompileError::InvalidConfiguration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the device string and router parameters.
    pub fn validate(&self) -> CompileResult<()> {
        self.device_spec()?;
        self.sabre.validate()
    }

    /// Parse the device specification.
    pub fn device_spec(&self) -> CompileResult<DeviceSpec> {
        self.device.parse()
    }
}
