/// Sub-second capture times for burst shots.
pub mod capture;
/// Clock-offset estimation between camera and GPS.
pub mod offset;
/// Synchronized telemetry store.
pub mod store;
