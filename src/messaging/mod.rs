// Simulator messaging module

pub mod protocol;
pub mod server;

pub use protocol::{decode_message, encode_control, handle_message, SimulatorMessage, TelemetryPayload, MANUAL_MESSAGE};
pub use server::{serve, SharedPlanner};
