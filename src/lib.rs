//! `skyforge-core`: spatial reasoning and six-degree-of-freedom vehicle
//! dynamics for a flight/combat simulation framework.
//!
//! This crate owns geodesy, zone containment/attenuation, path finding, and
//! per-vehicle dynamics. It never schedules, renders, performs network I/O,
//! or decides AI behavior; those are left to the surrounding framework
//! through the [`collaborators`] traits (spec §1, §6).
pub mod collaborators;
pub mod config;
pub mod dynamics;
pub mod error;
pub mod geo;
pub mod pathfinding;
pub mod time;
pub mod zones;

pub use error::{Error, Result};
