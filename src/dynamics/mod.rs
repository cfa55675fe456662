//! Six-degree-of-freedom vehicle dynamics: mass properties, atmosphere,
//! kinematic state, aerodynamics, propulsion, landing gear, flight
//! controls, sequencers, and the vehicle that ties them together (spec
//! §4.8-4.14).
pub mod aero;
pub mod atmosphere;
pub mod flight_controls;
pub mod integrator;
pub mod kinematics;
pub mod landing_gear;
pub mod mass;
pub mod propulsion;
pub mod sequencer;
pub mod vehicle;

pub use aero::{AeroCore, AeroMovable};
pub use kinematics::KinematicState;
pub use mass::MassProperties;
pub use propulsion::PropulsionSystem;
pub use vehicle::Vehicle;
