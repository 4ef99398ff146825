//! Linearized quadrotor simulation with a cascaded PD position controller.
//!
//! The vehicle model is a small-angle linearization about hover: pitch and roll tilt
//! the thrust vector to produce horizontal acceleration, and yaw is not modeled. A
//! PD controller converts position error into commanded attitude and then into
//! pitch/roll moments and collective thrust. The [`Simulator`] steps the two
//! together on a fixed time grid, clipping moments to the actuator limits and
//! keeping the vehicle above the ground plane.
//!
//! ```no_run
//! use quadpd::{simulate, SimConfig};
//!
//! let trajectory = simulate(SimConfig::default()).unwrap();
//! let last = trajectory.last().unwrap();
//! println!("final position: {:?}", last.state.position());
//! ```

pub mod config;
pub mod control;
pub mod dynamics;
pub mod error;
pub mod integrator;
pub mod simulation;
pub mod trajectory;

pub use config::{ActuatorLimits, Gains, Horizon, IntegratorKind, PhysicalParameters, SimConfig};
pub use control::{compute_control, ControlInput, Controller, DesiredState, PdController};
pub use dynamics::{derivative, QuadOde, State};
pub use error::{Result, SimError};
pub use integrator::{AdaptiveIntegrator, Integrator, Rk4Integrator};
pub use simulation::{simulate, Simulator};
pub use trajectory::{MomentAxis, SaturationEvent, Trajectory, TrajectoryRecord};
