//! Swarm files.
//!
//! Three formats:
//! - **text**: parameter lines `key value…`, a line starting with `#`, then
//!   one `x y` pair per line
//! - **JSON**: `{"params": {...}, "agents": {"coords": [[xs], [ys]]},
//!   "destinations": {"coords": [[gx, ...], [gy, ...]]}}`; the first
//!   destination becomes the goal
//! - **state dump**: one line per agent with every per-agent field
//!
//! Text files written here re-load to the same positions and parameters.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use swarm_core::{ParamError, SwarmError, SwarmParams, SwarmState};
use thiserror::Error;
use tracing::{debug, info};

/// Header line separating parameters from coordinates.
pub const COORDS_HEADER: &str = "# POS_X, POS_Y --";

/// Errors raised while reading or writing swarm files.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parameter error: {0}")]
    Params(#[from] ParamError),

    #[error("Swarm error: {0}")]
    Swarm(#[from] SwarmError),

    /// Structural problem in a swarm file
    #[error("Format error (line {line}): {message}")]
    Format { line: usize, message: String },
}

impl PersistError {
    fn format(line: usize, message: impl Into<String>) -> Self {
        Self::Format {
            line,
            message: message.into(),
        }
    }
}

// =============================================================================
// TEXT FORMAT
// =============================================================================

/// Parses a text swarm file.
pub fn parse_swarm(text: &str) -> Result<SwarmState, PersistError> {
    let mut lines = text.lines().enumerate();
    let mut pairs: Vec<(String, String)> = Vec::new();
    let mut saw_header = false;

    for (idx, raw) in lines.by_ref() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with('#') {
            saw_header = true;
            break;
        }
        let (key, value) = line
            .split_once(char::is_whitespace)
            .ok_or_else(|| PersistError::format(idx + 1, format!("parameter `{line}` has no value")))?;
        pairs.push((key.to_string(), value.trim().to_string()));
    }

    if !saw_header {
        return Err(PersistError::format(
            text.lines().count(),
            "missing `#` line before coordinates",
        ));
    }

    let mut xs = Vec::new();
    let mut ys = Vec::new();
    for (idx, raw) in lines {
        let tokens: Vec<&str> = raw.split_whitespace().collect();
        if tokens.len() < 2 {
            continue;
        }
        xs.push(parse_coordinate(idx + 1, tokens[0])?);
        ys.push(parse_coordinate(idx + 1, tokens[1])?);
    }

    build_state(pairs, &xs, &ys)
}

fn parse_coordinate(line: usize, token: &str) -> Result<f64, PersistError> {
    token
        .parse::<f64>()
        .map_err(|_| PersistError::format(line, format!("bad coordinate `{token}`")))
}

fn build_state(pairs: Vec<(String, String)>, xs: &[f64], ys: &[f64]) -> Result<SwarmState, PersistError> {
    for (key, _) in &pairs {
        if !SwarmParams::is_recognized_key(key) {
            debug!("Ignoring unrecognised parameter `{}`", key);
        }
    }
    let params = SwarmParams::from_pairs(pairs)?;
    Ok(SwarmState::from_coordinates(xs, ys, params)?)
}

/// Renders a swarm as a text swarm file.
pub fn render_swarm(state: &SwarmState) -> String {
    let mut out = String::new();
    for (key, value) in state.params().to_pairs() {
        let _ = writeln!(out, "{key} {value}");
    }
    let _ = writeln!(out, "{COORDS_HEADER}");
    for p in state.positions() {
        let _ = writeln!(out, "{:.15}  {:.15}", p.x, p.y);
    }
    out
}

/// Loads a text swarm file.
pub fn load_swarm(path: impl AsRef<Path>) -> Result<SwarmState, PersistError> {
    let path = path.as_ref();
    let state = parse_swarm(&fs::read_to_string(path)?)?;
    info!("Loaded {} agents from {}", state.len(), path.display());
    Ok(state)
}

/// Saves a swarm as a text swarm file.
pub fn save_swarm(state: &SwarmState, path: impl AsRef<Path>) -> Result<(), PersistError> {
    let path = path.as_ref();
    fs::write(path, render_swarm(state))?;
    info!("Saved {} agents to {}", state.len(), path.display());
    Ok(())
}

// =============================================================================
// JSON FORMAT
// =============================================================================

/// Coordinates as two rows: `[[x0, x1, ...], [y0, y1, ...]]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsonCoords {
    pub coords: Vec<Vec<f64>>,
}

/// JSON swarm document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonSwarm {
    #[serde(default)]
    pub params: serde_json::Map<String, Value>,
    pub agents: JsonCoords,
    #[serde(default)]
    pub destinations: Option<JsonCoords>,
}

/// Textual form of one JSON parameter value; `None` for `null`.
fn json_param_text(key: &str, value: &Value) -> Result<Option<String>, PersistError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Array(items) => {
            let mut parts = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::Number(n) => parts.push(n.to_string()),
                    _ => {
                        return Err(PersistError::format(
                            0,
                            format!("parameter `{key}`: arrays must contain numbers only"),
                        ))
                    }
                }
            }
            Ok(Some(parts.join(" ")))
        }
        Value::Object(_) => Err(PersistError::format(
            0,
            format!("parameter `{key}`: nested objects are not supported"),
        )),
    }
}

/// Parameter lines and coordinate rows of a JSON swarm document, with
/// every parameter kept whether or not the model recognises it.
fn json_parts(text: &str) -> Result<(Vec<(String, String)>, Vec<f64>, Vec<f64>), PersistError> {
    let doc: JsonSwarm = serde_json::from_str(text)?;

    let mut pairs = Vec::with_capacity(doc.params.len() + 2);
    for (key, value) in &doc.params {
        if let Some(text) = json_param_text(key, value)? {
            pairs.push((key.clone(), text));
        }
    }

    match doc.destinations.as_ref().map(|d| d.coords.as_slice()) {
        Some([gx, gy, ..]) if !gx.is_empty() && !gy.is_empty() => {
            pairs.push(("goalX".to_string(), gx[0].to_string()));
            pairs.push(("goalY".to_string(), gy[0].to_string()));
        }
        _ => debug!("No destination in JSON swarm; keeping goal from params"),
    }

    let found = doc.agents.coords.len();
    let Ok([xs, ys]) = <[Vec<f64>; 2]>::try_from(doc.agents.coords) else {
        return Err(PersistError::format(
            0,
            format!("agents.coords must have 2 rows (x, y), found {found}"),
        ));
    };

    Ok((pairs, xs, ys))
}

/// Parses a JSON swarm document.
pub fn parse_swarm_json(text: &str) -> Result<SwarmState, PersistError> {
    let (pairs, xs, ys) = json_parts(text)?;
    build_state(pairs, &xs, &ys)
}

/// Renders a JSON swarm document as a text swarm file.
///
/// Every parameter is copied through, including keys the model ignores,
/// after checking that the document loads.
pub fn flatten_json_text(text: &str) -> Result<String, PersistError> {
    let (pairs, xs, ys) = json_parts(text)?;
    let state = build_state(pairs.clone(), &xs, &ys)?;

    let mut out = String::new();
    for (key, value) in &pairs {
        let _ = writeln!(out, "{key} {value}");
    }
    let _ = writeln!(out, "{COORDS_HEADER}");
    for p in state.positions() {
        let _ = writeln!(out, "{:.15}  {:.15}", p.x, p.y);
    }
    Ok(out)
}

/// Loads a JSON swarm document.
pub fn load_swarm_json(path: impl AsRef<Path>) -> Result<SwarmState, PersistError> {
    let path = path.as_ref();
    let state = parse_swarm_json(&fs::read_to_string(path)?)?;
    info!("Loaded {} agents from {}", state.len(), path.display());
    Ok(state)
}

/// Loads either format, choosing JSON for a `.json` extension.
pub fn load_any(path: impl AsRef<Path>) -> Result<SwarmState, PersistError> {
    let path = path.as_ref();
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        load_swarm_json(path)
    } else {
        load_swarm(path)
    }
}

/// Converts a JSON swarm file into a text swarm file.
pub fn flatten_json(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> Result<(), PersistError> {
    let (src, dst) = (src.as_ref(), dst.as_ref());
    fs::write(dst, flatten_json_text(&fs::read_to_string(src)?)?)?;
    info!("Flattened {} into {}", src.display(), dst.display());
    Ok(())
}

// =============================================================================
// STATE DUMP
// =============================================================================

/// Column order of [`render_state`].
pub const STATE_COLUMNS: &[&str] = &[
    "pos_x", "pos_y", "coh_x", "coh_y", "rep_x", "rep_y", "dir_x", "dir_y", "adv_x", "adv_y",
    "gap_x", "gap_y", "res_x", "res_y", "goal_x", "goal_y", "cb", "prm", "coh_n", "rep_n",
];

/// Renders every per-agent field of the last computed step, one agent per
/// line.
pub fn render_state(state: &SwarmState) -> String {
    let goal = state.goal();
    let mut out = String::new();
    for i in 0..state.len() {
        let p = state.position(i);
        let f = state.forces(i);
        let row = [
            p.x,
            p.y,
            f.cohesion.x,
            f.cohesion.y,
            f.repulsion.x,
            f.repulsion.y,
            f.direction.x,
            f.direction.y,
            f.adversarial.x,
            f.adversarial.y,
            f.gap.x,
            f.gap.y,
            f.resultant.x,
            f.resultant.y,
            goal.x,
            goal.y,
            state.cohesion_radius(i),
            if state.on_perimeter(i) { 1.0 } else { 0.0 },
            state.cohesion_neighbor_count(i) as f64,
            state.repulsion_neighbor_count(i) as f64,
        ];
        let line = row
            .iter()
            .map(|v| format!("{v:.15}"))
            .collect::<Vec<_>>()
            .join("  ");
        let _ = writeln!(out, "{line}");
    }
    out
}

/// Writes [`render_state`] to `path`.
pub fn dump_state(state: &SwarmState, path: impl AsRef<Path>) -> Result<(), PersistError> {
    let path = path.as_ref();
    fs::write(path, render_state(state))?;
    info!("Dumped state of {} agents to {}", state.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use swarm_core::{PerimeterMatrix, RepulsionMode, Vec2};

    const SQUARE: &str = "\
cb 2.0
rb 1.0
scaling quadratic
speed 0.1
ob 3.0
# POS_X, POS_Y --
0.0 0.0
1.0 0.0

1.0 1.0
0.0 1.0
";

    #[test]
    fn test_parse_text_swarm() {
        let state = parse_swarm(SQUARE).unwrap();
        assert_eq!(state.len(), 4);
        assert_eq!(state.params().cohesion_radius, 2.0);
        assert_eq!(state.params().repulsion_radius, PerimeterMatrix::uniform(1.0));
        assert_eq!(state.params().repulsion_mode, RepulsionMode::Quadratic);
        assert_eq!(state.position(2), Vec2::new(1.0, 1.0));
    }

    #[test]
    fn test_matrix_value_on_one_line() {
        let state = parse_swarm("rb 3 3 3 2\n#\n0 0\n").unwrap();
        assert_eq!(state.params().repulsion_radius.get(true, true), 2.0);
    }

    #[test]
    fn test_missing_header_is_error() {
        let err = parse_swarm("cb 2.0\nkc 1.0\n").unwrap_err();
        assert!(matches!(err, PersistError::Format { .. }));
    }

    #[test]
    fn test_key_without_value_is_error() {
        let err = parse_swarm("cb\n#\n0 0\n").unwrap_err();
        assert!(matches!(err, PersistError::Format { line: 1, .. }));
    }

    #[test]
    fn test_bad_coordinate_reports_line() {
        let err = parse_swarm("cb 1\n#\n0 0\n1 x\n").unwrap_err();
        match err {
            PersistError::Format { line, message } => {
                assert_eq!(line, 4);
                assert!(message.contains('x'));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_bad_parameter_propagates() {
        let err = parse_swarm("cb two\n#\n").unwrap_err();
        assert!(matches!(err, PersistError::Params(ParamError::Number { .. })));
    }

    #[test]
    fn test_render_then_parse() {
        let mut state = parse_swarm(SQUARE).unwrap();
        state.step();
        let reparsed = parse_swarm(&render_swarm(&state)).unwrap();

        assert_eq!(reparsed.params(), state.params());
        assert_eq!(reparsed.positions(), state.positions());
        assert!(render_swarm(&state).contains(COORDS_HEADER));
    }

    #[test]
    fn test_parse_json_swarm() {
        let json = r#"{
            "params": {"cb": 2.0, "scaling": "expo", "perim_coord": true, "kd": [0.1, 0.4], "note": null},
            "agents": {"coords": [[0.0, 1.0, 1.0], [0.0, 0.0, 1.0]]},
            "destinations": {"coords": [[5.0, 9.0], [-2.0, 9.0]]}
        }"#;
        let state = parse_swarm_json(json).unwrap();

        assert_eq!(state.len(), 3);
        assert_eq!(state.params().repulsion_mode, RepulsionMode::Exponential);
        assert!(state.params().perimeter_directed);
        assert_eq!(state.params().direction_weight.perimeter, 0.4);
        assert_eq!(state.goal(), Vec2::new(5.0, -2.0));
    }

    #[test]
    fn test_json_without_destination_keeps_goal() {
        let json = r#"{"params": {"goalX": "3"}, "agents": {"coords": [[0.0], [0.0]]}}"#;
        let state = parse_swarm_json(json).unwrap();
        assert_eq!(state.goal(), Vec2::new(3.0, 0.0));
    }

    #[test]
    fn test_json_coordinate_errors() {
        let one_row = r#"{"agents": {"coords": [[0.0, 1.0]]}}"#;
        assert!(matches!(
            parse_swarm_json(one_row),
            Err(PersistError::Format { .. })
        ));

        let uneven = r#"{"agents": {"coords": [[0.0, 1.0], [0.0]]}}"#;
        assert!(matches!(
            parse_swarm_json(uneven),
            Err(PersistError::Swarm(SwarmError::LengthMismatch { xs: 2, ys: 1 }))
        ));

        assert!(matches!(parse_swarm_json("{"), Err(PersistError::Json(_))));
    }

    #[test]
    fn test_flatten_keeps_unrecognised_keys() {
        let json = r#"{
            "params": {"ob": 3.0, "ko": "junk", "cb": 2.5, "kd": [0.1, 0.4]},
            "agents": {"coords": [[0.0, 1.0], [0.0, 0.5]]},
            "destinations": {"coords": [[7.0], [8.0]]}
        }"#;
        let text = flatten_json_text(json).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines.contains(&"ob 3.0"));
        assert!(lines.contains(&"ko junk"));
        assert!(lines.contains(&"kd 0.1 0.4"));
        assert!(lines.contains(&"goalX 7"));

        let state = parse_swarm(&text).unwrap();
        assert_eq!(state.params().cohesion_radius, 2.5);
        assert_eq!(state.goal(), Vec2::new(7.0, 8.0));
        assert_eq!(state.position(1), Vec2::new(1.0, 0.5));
    }

    #[test]
    fn test_flatten_rejects_unloadable_document() {
        let json = r#"{"params": {"cb": "x"}, "agents": {"coords": [[0.0], [0.0]]}}"#;
        assert!(matches!(flatten_json_text(json), Err(PersistError::Params(_))));
    }

    #[test]
    fn test_render_state_columns() {
        let mut state = parse_swarm(SQUARE).unwrap();
        state.compute_step(0.1);
        let dump = render_state(&state);

        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 4);
        for line in lines {
            assert_eq!(line.split_whitespace().count(), STATE_COLUMNS.len());
        }
    }
}
