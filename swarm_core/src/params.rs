//! Swarm Parameters
//! ================
//!
//! Typed parameter set for the swarm model plus the textual key/value
//! protocol used by swarm files:
//!
//! - scalars are decimal floats (`cb 4.0`)
//! - perimeter matrices take 1 or 4 whitespace-separated values, row-major
//!   by (acted-upon agent on perimeter, acting neighbour on perimeter):
//!   `rb 3.0` or `rb 3.0 3.0 3.0 2.5`
//! - perimeter pairs take 1 or 2 values (interior, perimeter): `kd 0.5 1.0`
//! - booleans are `true` / `false` in any case
//!
//! Unrecognised keys are ignored; missing keys keep the defaults.

use crate::error::ParamError;
use crate::vector::Vec2;
use serde::{Deserialize, Serialize};

/// Every key understood by [`SwarmParams::from_pairs`]. Keys starting with
/// `stab` are also accepted as the stability factor.
pub const RECOGNIZED_KEYS: &[&str] = &[
    "cb",
    "rb",
    "kc",
    "kr",
    "pc",
    "pr",
    "kd",
    "ka",
    "adv_angle",
    "kg",
    "gap_reflex",
    "scaling",
    "exp_rate",
    "speed",
    "stab",
    "gain",
    "perim_coord",
    "goalX",
    "goalY",
];

// =============================================================================
// PERIMETER-INDEXED VALUES
// =============================================================================

/// A 2×2 table indexed by (acted-upon agent on perimeter, acting neighbour
/// on perimeter).
///
/// A uniform matrix behaves exactly like a single global scalar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerimeterMatrix(pub [[f64; 2]; 2]);

impl PerimeterMatrix {
    /// Same value for all four boundary combinations.
    pub const fn uniform(value: f64) -> Self {
        Self([[value, value], [value, value]])
    }

    /// Scales the boundary×boundary entry only.
    ///
    /// This is the legacy "perimeter multiplier": an effect that applies
    /// only when both agents of a pair sit on the perimeter.
    pub fn with_perimeter_multiplier(self, multiplier: f64) -> Self {
        let mut values = self.0;
        values[1][1] *= multiplier;
        Self(values)
    }

    /// Looks up the entry for a pair.
    pub fn get(&self, self_on_perimeter: bool, other_on_perimeter: bool) -> f64 {
        self.0[usize::from(self_on_perimeter)][usize::from(other_on_perimeter)]
    }

    /// True when all four entries are equal.
    pub fn is_uniform(&self) -> bool {
        let v = self.0[0][0];
        self.0.iter().flatten().all(|&x| x == v)
    }

    fn entries(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.iter().flatten().copied()
    }

    fn from_values(key: &str, values: &[f64]) -> Result<Self, ParamError> {
        match *values {
            [v] => Ok(Self::uniform(v)),
            [ii, ip, pi, pp] => Ok(Self([[ii, ip], [pi, pp]])),
            _ => Err(ParamError::Arity {
                key: key.to_string(),
                expected: "1 or 4",
                found: values.len(),
            }),
        }
    }

    fn render(&self) -> String {
        if self.is_uniform() {
            self.0[0][0].to_string()
        } else {
            join(self.entries())
        }
    }
}

/// A value chosen by an agent's own perimeter status.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerimeterPair {
    pub interior: f64,
    pub perimeter: f64,
}

impl PerimeterPair {
    /// Same value for interior and perimeter agents.
    pub const fn uniform(value: f64) -> Self {
        Self {
            interior: value,
            perimeter: value,
        }
    }

    pub fn get(&self, on_perimeter: bool) -> f64 {
        if on_perimeter {
            self.perimeter
        } else {
            self.interior
        }
    }

    fn from_values(key: &str, values: &[f64]) -> Result<Self, ParamError> {
        match *values {
            [v] => Ok(Self::uniform(v)),
            [interior, perimeter] => Ok(Self {
                interior,
                perimeter,
            }),
            _ => Err(ParamError::Arity {
                key: key.to_string(),
                expected: "1 or 2",
                found: values.len(),
            }),
        }
    }

    fn render(&self) -> String {
        if self.interior == self.perimeter {
            self.interior.to_string()
        } else {
            join([self.interior, self.perimeter])
        }
    }
}

// =============================================================================
// REPULSION MODE
// =============================================================================

/// Falloff law used for the repulsion force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RepulsionMode {
    /// `(1 - r/d)` scaling of the displacement
    #[default]
    Linear,
    /// Inverse-square push
    Quadratic,
    /// Exponentially decaying push (see `exp_rate`)
    Exponential,
}

impl RepulsionMode {
    /// Parses the `scaling` value: `expo…` and `quad…` prefixes select the
    /// non-linear laws, anything else is linear.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim().to_ascii_lowercase();
        if label.starts_with("expo") {
            RepulsionMode::Exponential
        } else if label.starts_with("quad") {
            RepulsionMode::Quadratic
        } else {
            RepulsionMode::Linear
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RepulsionMode::Linear => "linear",
            RepulsionMode::Quadratic => "quad",
            RepulsionMode::Exponential => "expo",
        }
    }
}

impl std::fmt::Display for RepulsionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

// =============================================================================
// PARAMETER SET
// =============================================================================

/// Complete parameter set of a swarm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwarmParams {
    /// Cohesion range; agents within it are cohesion neighbours
    pub cohesion_radius: f64,

    /// Repulsion range per boundary combination
    pub repulsion_radius: PerimeterMatrix,

    /// Cohesion weight per boundary combination
    pub cohesion_weight: PerimeterMatrix,

    /// Repulsion weight per boundary combination
    pub repulsion_weight: PerimeterMatrix,

    /// Weight of the pull toward the goal
    pub direction_weight: PerimeterPair,

    /// Weight of the deviation from the straight line to the goal
    pub adversarial_weight: PerimeterPair,

    /// Deviation angle in radians, counter-clockwise
    pub adversarial_angle: PerimeterPair,

    /// Weight of the gap-filling pull on perimeter agents
    pub gap_weight: f64,

    /// Also compute the gap vector when a reflex angle (not only a missing
    /// link) marks an agent as perimeter
    pub gap_fill_on_reflex: bool,

    pub repulsion_mode: RepulsionMode,

    /// Decay rate for [`RepulsionMode::Exponential`]
    pub exp_rate: f64,

    /// Maximum displacement per step
    pub step_speed: f64,

    /// Dead-zone threshold as a fraction of the step speed
    pub stability_factor: f64,

    /// When set, the raw resultant is multiplied by this instead of being
    /// normalised to the step speed
    pub fixed_gain: Option<f64>,

    /// Only perimeter agents steer toward the goal
    pub perimeter_directed: bool,

    /// Goal shared by all agents
    pub goal: Vec2,
}

impl Default for SwarmParams {
    fn default() -> Self {
        Self {
            cohesion_radius: 4.0,
            repulsion_radius: PerimeterMatrix::uniform(3.0),
            cohesion_weight: PerimeterMatrix::uniform(1.0),
            repulsion_weight: PerimeterMatrix::uniform(1.0),
            direction_weight: PerimeterPair::uniform(0.0),
            adversarial_weight: PerimeterPair::uniform(0.0),
            adversarial_angle: PerimeterPair::uniform(0.0),
            gap_weight: 0.0,
            gap_fill_on_reflex: false,
            repulsion_mode: RepulsionMode::Linear,
            exp_rate: 0.2,
            step_speed: 0.05,
            stability_factor: 0.0,
            fixed_gain: None,
            perimeter_directed: false,
            goal: Vec2::zeros(),
        }
    }
}

impl SwarmParams {
    /// Builds a parameter set from textual key/value pairs.
    ///
    /// `pc` and `pr` multiply the boundary×boundary entries of the cohesion
    /// weight and repulsion radius after every key has been read, so their
    /// position relative to `kc` / `rb` does not matter.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, ParamError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut params = Self::default();
        let mut cohesion_multiplier = 1.0;
        let mut repulsion_multiplier = 1.0;

        for (key, value) in pairs {
            let key = key.as_ref().trim();
            let value = value.as_ref().trim();
            match key {
                "cb" => params.cohesion_radius = parse_scalar(key, value)?,
                "rb" => params.repulsion_radius = parse_matrix(key, value)?,
                "kc" => params.cohesion_weight = parse_matrix(key, value)?,
                "kr" => params.repulsion_weight = parse_matrix(key, value)?,
                "pc" => cohesion_multiplier = parse_scalar(key, value)?,
                "pr" => repulsion_multiplier = parse_scalar(key, value)?,
                "kd" => params.direction_weight = parse_pair(key, value)?,
                "ka" => params.adversarial_weight = parse_pair(key, value)?,
                "adv_angle" => params.adversarial_angle = parse_pair(key, value)?,
                "kg" => params.gap_weight = parse_scalar(key, value)?,
                "gap_reflex" => params.gap_fill_on_reflex = parse_bool(key, value)?,
                "scaling" => params.repulsion_mode = RepulsionMode::from_label(value),
                "exp_rate" => params.exp_rate = parse_scalar(key, value)?,
                "speed" => params.step_speed = parse_scalar(key, value)?,
                "gain" => params.fixed_gain = parse_gain(key, value)?,
                "perim_coord" => params.perimeter_directed = parse_bool(key, value)?,
                "goalX" => params.goal.x = parse_scalar(key, value)?,
                "goalY" => params.goal.y = parse_scalar(key, value)?,
                k if k.starts_with("stab") => {
                    params.stability_factor = parse_scalar(key, value)?
                }
                _ => {}
            }
        }

        params.cohesion_weight = params
            .cohesion_weight
            .with_perimeter_multiplier(cohesion_multiplier);
        params.repulsion_radius = params
            .repulsion_radius
            .with_perimeter_multiplier(repulsion_multiplier);

        Ok(params)
    }

    /// True if `key` is consumed by [`SwarmParams::from_pairs`].
    pub fn is_recognized_key(key: &str) -> bool {
        key.starts_with("stab") || RECOGNIZED_KEYS.contains(&key)
    }

    /// Renders the parameter set in the textual protocol.
    ///
    /// Multipliers are already folded into the matrices, so `pc`/`pr` are
    /// never emitted.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let gain = match self.fixed_gain {
            Some(g) => g.to_string(),
            None => "none".to_string(),
        };
        vec![
            ("cb".into(), self.cohesion_radius.to_string()),
            ("rb".into(), self.repulsion_radius.render()),
            ("kc".into(), self.cohesion_weight.render()),
            ("kr".into(), self.repulsion_weight.render()),
            ("kd".into(), self.direction_weight.render()),
            ("ka".into(), self.adversarial_weight.render()),
            ("adv_angle".into(), self.adversarial_angle.render()),
            ("kg".into(), self.gap_weight.to_string()),
            ("gap_reflex".into(), self.gap_fill_on_reflex.to_string()),
            ("scaling".into(), self.repulsion_mode.label().to_string()),
            ("exp_rate".into(), self.exp_rate.to_string()),
            ("speed".into(), self.step_speed.to_string()),
            ("stab".into(), self.stability_factor.to_string()),
            ("gain".into(), gain),
            ("perim_coord".into(), self.perimeter_directed.to_string()),
            ("goalX".into(), self.goal.x.to_string()),
            ("goalY".into(), self.goal.y.to_string()),
        ]
    }

    /// Rejects parameter sets the model cannot step.
    ///
    /// The stability factor may be `+inf` (every resultant falls in the dead
    /// zone); radii and the step speed must be finite and non-negative.
    /// Weights, angles and the goal must be finite.
    pub fn validate(&self) -> Result<(), ParamError> {
        non_negative_finite("cohesion radius", self.cohesion_radius)?;
        for r in self.repulsion_radius.entries() {
            non_negative_finite("repulsion radius", r)?;
        }
        non_negative_finite("step speed", self.step_speed)?;
        for w in self.cohesion_weight.entries() {
            finite("cohesion weight", w)?;
        }
        for w in self.repulsion_weight.entries() {
            finite("repulsion weight", w)?;
        }
        for (name, pair) in [
            ("direction weight", &self.direction_weight),
            ("adversarial weight", &self.adversarial_weight),
            ("adversarial angle", &self.adversarial_angle),
        ] {
            finite(name, pair.interior)?;
            finite(name, pair.perimeter)?;
        }
        finite("gap weight", self.gap_weight)?;
        finite("goal x", self.goal.x)?;
        finite("goal y", self.goal.y)?;
        if self.stability_factor.is_nan() || self.stability_factor < 0.0 {
            return Err(ParamError::invalid(format!(
                "stability factor must be >= 0, got {}",
                self.stability_factor
            )));
        }
        if !self.exp_rate.is_finite() {
            return Err(ParamError::invalid("exponential rate must be finite"));
        }
        if let Some(gain) = self.fixed_gain {
            if !gain.is_finite() {
                return Err(ParamError::invalid(format!("fixed gain must be finite, got {gain}")));
            }
        }
        Ok(())
    }
}

// =============================================================================
// VALUE PARSING
// =============================================================================

fn parse_scalar(key: &str, value: &str) -> Result<f64, ParamError> {
    value
        .parse::<f64>()
        .map_err(|_| ParamError::number(key, value))
}

fn parse_values(key: &str, value: &str) -> Result<Vec<f64>, ParamError> {
    value
        .split_whitespace()
        .map(|token| parse_scalar(key, token))
        .collect()
}

fn parse_matrix(key: &str, value: &str) -> Result<PerimeterMatrix, ParamError> {
    PerimeterMatrix::from_values(key, &parse_values(key, value)?)
}

fn parse_pair(key: &str, value: &str) -> Result<PerimeterPair, ParamError> {
    PerimeterPair::from_values(key, &parse_values(key, value)?)
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ParamError> {
    match value.to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ParamError::Boolean {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_gain(key: &str, value: &str) -> Result<Option<f64>, ParamError> {
    match value.to_ascii_lowercase().as_str() {
        "" | "none" | "off" => Ok(None),
        _ => parse_scalar(key, value).map(Some),
    }
}

fn non_negative_finite(name: &str, value: f64) -> Result<(), ParamError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ParamError::invalid(format!(
            "{name} must be finite and >= 0, got {value}"
        )))
    }
}

fn finite(name: &str, value: f64) -> Result<(), ParamError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ParamError::invalid(format!("{name} must be finite, got {value}")))
    }
}

fn join(values: impl IntoIterator<Item = f64>) -> String {
    values
        .into_iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
