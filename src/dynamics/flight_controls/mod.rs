//! Pilot-input resolution, cascaded modifiers, actuators, and the three
//! polymorphic output kinds that make up a vehicle's `FlightControlSystem`
//! (spec §4.12).
mod actuator;
mod modifiers;
mod outputs;
mod system;

pub use actuator::Actuator;
pub use modifiers::{ControlObservables, Curve, CurveKey, Modifier};
pub use outputs::{BooleanOutput, InputStream, SurfaceOutput, ValueOutput};
pub use system::{BooleanHandle, FlightControlSystem, SurfaceHandle, ValueHandle};
