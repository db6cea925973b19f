//! In-memory device usage registry for the Sense edge bridge.
//!
//! The registry is the single snapshot of truth the bridge serves to the hub:
//! one record per device the monitor reports, plus a synthetic aggregate
//! record that carries whole-home usage. Records are created by the metadata
//! refresh, updated in place by the realtime stream, and never deleted — a
//! device that disappears upstream keeps its last state until the next usage
//! frame zeroes it.
//!
//! The registry itself does no locking; the bridge wraps it in a mutex and
//! guarantees that usage/state fields are only ever written by the streaming
//! event processor while the metadata refresh touches only names.

mod device;
mod registry;

pub use device::{DeviceRecord, DeviceState, AGGREGATE_DEVICE_ID};
pub use registry::DeviceRegistry;
