use fast_ode;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::config::PhysicalParameters;

/// Number of scalars in a [`State`].
pub const STATE_LEN: usize = 10;

/// State of the linearized quadrotor.
///
/// Yaw is not modeled. Pitch (`theta`) and roll (`phi`) are assumed small, so they
/// only couple into horizontal acceleration through gravity.
///
/// # Fields
///
/// * `x`, `y`, `z` - Position in the inertial frame (meters, `z` up)
/// * `theta`, `phi` - Pitch and roll angles (radians)
/// * `x_vel`, `y_vel`, `z_vel` - Linear velocities (m/s)
/// * `theta_vel`, `phi_vel` - Pitch and roll rates (rad/s)
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub theta: f64,
    pub phi: f64,
    pub x_vel: f64,
    pub y_vel: f64,
    pub z_vel: f64,
    pub theta_vel: f64,
    pub phi_vel: f64,
}

impl State {
    /// Converts the state to the solver's array layout:
    /// `[x, y, z, theta, phi, x_vel, y_vel, z_vel, theta_vel, phi_vel]`.
    pub fn to_array(&self) -> [f64; STATE_LEN] {
        [
            self.x,
            self.y,
            self.z,
            self.theta,
            self.phi,
            self.x_vel,
            self.y_vel,
            self.z_vel,
            self.theta_vel,
            self.phi_vel,
        ]
    }

    /// Rebuilds a state from the layout produced by [`State::to_array`].
    pub fn from_array(arr: &[f64; STATE_LEN]) -> Self {
        State {
            x: arr[0],
            y: arr[1],
            z: arr[2],
            theta: arr[3],
            phi: arr[4],
            x_vel: arr[5],
            y_vel: arr[6],
            z_vel: arr[7],
            theta_vel: arr[8],
            phi_vel: arr[9],
        }
    }

    pub fn position(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    pub fn velocity(&self) -> Vector3<f64> {
        Vector3::new(self.x_vel, self.y_vel, self.z_vel)
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }

    /// Applies the ground plane at `z = 0`.
    ///
    /// Contact is fully inelastic: if the vehicle is below ground both altitude and
    /// vertical velocity are zeroed. Returns `true` if the state was corrected.
    pub fn constrain_to_ground(&mut self) -> bool {
        if self.z < 0.0 {
            self.z = 0.0;
            self.z_vel = 0.0;
            true
        } else {
            false
        }
    }
}

/// Time derivative of the linearized quadrotor state.
///
/// Translational acceleration comes from tilting the thrust vector under the
/// small-angle approximation (`-g * theta` along x, `-g * phi` along y); vertical
/// acceleration is thrust over mass minus gravity; angular accelerations are
/// moment over inertia. The system is time-invariant.
///
/// # Arguments
///
/// * `state` - Current state
/// * `params` - Physical parameters; `mass`, `ixx` and `iyy` must be non-zero
/// * `force` - Net vertical thrust (N)
/// * `moment1` - Pitch moment (N⋅m)
/// * `moment2` - Roll moment (N⋅m)
pub fn derivative(
    state: &State,
    params: &PhysicalParameters,
    force: f64,
    moment1: f64,
    moment2: f64,
) -> [f64; STATE_LEN] {
    let g = params.gravity;

    [
        state.x_vel,
        state.y_vel,
        state.z_vel,
        state.theta_vel,
        state.phi_vel,
        -g * state.theta,
        -g * state.phi,
        -g + force / params.mass,
        moment1 / params.iyy,
        moment2 / params.ixx,
    ]
}

/// ODE system for one control step.
///
/// The inputs are held constant over the integration span (zero-order hold).
pub struct QuadOde {
    pub params: PhysicalParameters,
    pub force: f64,
    pub moment1: f64,
    pub moment2: f64,
}

impl fast_ode::DifferentialEquation<STATE_LEN> for QuadOde {
    fn ode_dot_y(
        &self,
        _t: f64,
        y: &fast_ode::Coord<STATE_LEN>,
    ) -> (fast_ode::Coord<STATE_LEN>, bool) {
        let state = State::from_array(&y.0);
        let dot_y = derivative(&state, &self.params, self.force, self.moment1, self.moment2);

        // Tell the solver to stop rather than chase a diverging solution.
        let ok = dot_y.iter().all(|v| v.is_finite());
        (fast_ode::Coord(dot_y), ok)
    }
}
