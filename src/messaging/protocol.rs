//! Simulator wire protocol
//!
//! Frames are socket.io style text messages: the `42` prefix followed by a
//! JSON array `[event, payload]`. Telemetry arrives as event `telemetry`; the
//! reply is a `control` event carrying the next path. A `null` payload means
//! the simulator is driven manually.

use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::common::{
    EgoState, NeighborVehicle, Path2D, PlannerError, PlannerResult, Telemetry,
};
use crate::planner::HighwayPlanner;

/// Prefix of a socket.io event frame
pub const EVENT_PREFIX: &str = "42";

/// Reply sent when the simulator has no telemetry for us
pub const MANUAL_MESSAGE: &str = "42[\"manual\",{}]";

/// Decoded inbound event
#[derive(Debug, Clone, PartialEq)]
pub enum SimulatorMessage {
    Telemetry(Telemetry),
    Manual,
}

/// JSON body of a `telemetry` event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryPayload {
    pub x: f64,
    pub y: f64,
    pub s: f64,
    pub d: f64,
    /// Heading [deg]
    pub yaw: f64,
    /// [mph]
    pub speed: f64,
    #[serde(default)]
    pub previous_path_x: Vec<f64>,
    #[serde(default)]
    pub previous_path_y: Vec<f64>,
    #[serde(default)]
    pub end_path_s: f64,
    #[serde(default)]
    pub end_path_d: f64,
    /// `[id, x, y, vx, vy, s, d]` per vehicle
    #[serde(default)]
    pub sensor_fusion: Vec<[f64; 7]>,
}

impl TryFrom<TelemetryPayload> for Telemetry {
    type Error = PlannerError;

    fn try_from(payload: TelemetryPayload) -> PlannerResult<Telemetry> {
        if payload.previous_path_x.len() != payload.previous_path_y.len() {
            return Err(PlannerError::ProtocolError(format!(
                "previous path has {} x and {} y values",
                payload.previous_path_x.len(),
                payload.previous_path_y.len()
            )));
        }

        let ego = EgoState::new(
            payload.x,
            payload.y,
            payload.yaw.to_radians(),
            payload.speed,
            payload.s,
            payload.d,
        );
        let neighbors = payload
            .sensor_fusion
            .iter()
            .map(|&[id, x, y, vx, vy, s, d]| NeighborVehicle::new(id as i64, x, y, vx, vy, s, d))
            .collect();

        Ok(Telemetry {
            ego,
            previous_path: Path2D::from_xy(&payload.previous_path_x, &payload.previous_path_y),
            end_path_s: payload.end_path_s,
            end_path_d: payload.end_path_d,
            neighbors,
        })
    }
}

#[derive(Debug, Serialize)]
struct ControlPayload<'a> {
    next_x: &'a [f64],
    next_y: &'a [f64],
}

/// Decode one inbound text frame.
///
/// Returns `Ok(None)` for frames that carry no event for the planner.
pub fn decode_message(raw: &str) -> PlannerResult<Option<SimulatorMessage>> {
    let body = match raw.strip_prefix(EVENT_PREFIX) {
        Some(body) if !body.is_empty() => body,
        _ => return Ok(None),
    };

    let value: serde_json::Value = serde_json::from_str(body)?;
    let event = value
        .as_array()
        .ok_or_else(|| PlannerError::ProtocolError("event frame is not an array".to_string()))?;
    let name = event
        .first()
        .and_then(|name| name.as_str())
        .ok_or_else(|| PlannerError::ProtocolError("event frame has no name".to_string()))?;

    let payload = match event.get(1) {
        None | Some(serde_json::Value::Null) => return Ok(Some(SimulatorMessage::Manual)),
        Some(payload) => payload,
    };

    match name {
        "telemetry" => {
            let payload = TelemetryPayload::deserialize(payload)?;
            Ok(Some(SimulatorMessage::Telemetry(payload.try_into()?)))
        }
        _ => Ok(None),
    }
}

/// Encode a path as a `control` event
pub fn encode_control(path: &Path2D) -> PlannerResult<String> {
    let next_x = path.x_coords();
    let next_y = path.y_coords();
    let payload = ControlPayload {
        next_x: &next_x,
        next_y: &next_y,
    };
    let event = serde_json::to_string(&("control", payload))?;
    Ok(format!("{}{}", EVENT_PREFIX, event))
}

/// Process one inbound frame and build the reply, if any.
///
/// A frame that fails to plan is answered with the unconsumed previous
/// path so the vehicle keeps following what it already has.
pub fn handle_message(planner: &mut HighwayPlanner, raw: &str) -> Option<String> {
    let telemetry = match decode_message(raw) {
        Ok(Some(SimulatorMessage::Telemetry(telemetry))) => telemetry,
        Ok(Some(SimulatorMessage::Manual)) => return Some(MANUAL_MESSAGE.to_string()),
        Ok(None) => return None,
        Err(e) => {
            warn!("dropping malformed frame: {}", e);
            return None;
        }
    };

    let path = match planner.plan(&telemetry) {
        Ok(plan) => plan.path,
        Err(e) => {
            error!("planning failed, replaying previous path: {}", e);
            telemetry.previous_path
        }
    };

    match encode_control(&path) {
        Ok(reply) => Some(reply),
        Err(e) => {
            error!("could not encode control message: {}", e);
            None
        }
    }
}
