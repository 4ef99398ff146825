use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::config::{Gains, PhysicalParameters};
use crate::dynamics::State;

/// Target the controller drives toward.
///
/// Held constant for a whole run; there is no trajectory re-planning.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DesiredState {
    pub x_pos: f64,
    pub y_pos: f64,
    pub z_pos: f64,
    pub x_vel: f64,
    pub y_vel: f64,
    pub z_vel: f64,
    pub x_acc: f64,
    pub y_acc: f64,
    pub z_acc: f64,
}

impl DesiredState {
    /// Hold still at a point.
    pub fn hold(position: Vector3<f64>) -> Self {
        Self {
            x_pos: position.x,
            y_pos: position.y,
            z_pos: position.z,
            ..Self::default()
        }
    }

    /// Array layout `[x_pos, y_pos, z_pos, x_vel, y_vel, z_vel, x_acc, y_acc, z_acc]`.
    pub fn to_array(&self) -> [f64; 9] {
        [
            self.x_pos, self.y_pos, self.z_pos, self.x_vel, self.y_vel, self.z_vel, self.x_acc,
            self.y_acc, self.z_acc,
        ]
    }

    pub fn from_array(arr: &[f64; 9]) -> Self {
        Self {
            x_pos: arr[0],
            y_pos: arr[1],
            z_pos: arr[2],
            x_vel: arr[3],
            y_vel: arr[4],
            z_vel: arr[5],
            x_acc: arr[6],
            y_acc: arr[7],
            z_acc: arr[8],
        }
    }

    pub fn position(&self) -> Vector3<f64> {
        Vector3::new(self.x_pos, self.y_pos, self.z_pos)
    }
}

/// Output of one controller evaluation.
///
/// `theta_command` and `phi_command` are the attitude set points computed on the way
/// to the moments. They are kept for diagnostics and are not fed to the model.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlInput {
    /// Net vertical thrust (N)
    pub force: f64,
    /// Pitch moment (N⋅m)
    pub moment1: f64,
    /// Roll moment (N⋅m)
    pub moment2: f64,
    /// Commanded pitch angle (rad)
    pub theta_command: f64,
    /// Commanded roll angle (rad)
    pub phi_command: f64,
}

impl ControlInput {
    /// Array layout `[force, moment1, moment2, theta_command, phi_command]`.
    pub fn to_array(&self) -> [f64; 5] {
        [
            self.force,
            self.moment1,
            self.moment2,
            self.theta_command,
            self.phi_command,
        ]
    }

    /// Rounds the force to 2 decimals and everything else to 3.
    ///
    /// Ties go to the even digit, so `0.125` becomes `0.12`.
    pub fn quantized(&self) -> Self {
        Self {
            force: round_to(self.force, 2),
            moment1: round_to(self.moment1, 3),
            moment2: round_to(self.moment2, 3),
            theta_command: round_to(self.theta_command, 3),
            phi_command: round_to(self.phi_command, 3),
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round_ties_even() / scale
}

/// A control law mapping the current and desired state to actuator commands.
///
/// Implementations must be pure: the simulator may call `compute` any number of
/// times with the same arguments and expects identical results.
pub trait Controller {
    fn compute(&self, state: &State, desired: &DesiredState) -> ControlInput;
}

/// Cascaded PD controller for the linearized quadrotor.
///
/// The outer loop converts horizontal position/velocity error plus the desired
/// acceleration into a commanded tilt (feedback linearization through `-g * angle`).
/// The inner loop tracks that tilt with a PD law scaled by inertia. Altitude is a
/// direct PD loop with gravity and acceleration feed-forward.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PdController {
    pub params: PhysicalParameters,
    pub gains: Gains,
}

impl PdController {
    pub fn new(params: PhysicalParameters, gains: Gains) -> Self {
        Self { params, gains }
    }
}

impl Controller for PdController {
    fn compute(&self, state: &State, desired: &DesiredState) -> ControlInput {
        compute_control(state, desired, &self.params, &self.gains)
    }
}

/// Evaluates the PD control law.
///
/// # Control Law
///
/// theta_c  = -(ax_d + kp_x (x_d - x) + kd_x (vx_d - vx)) / g
/// theta_c' = -(kp_x (vx_d - vx) + kd_x (ax_d + g theta)) / g
/// M1       = Iyy (kp_theta (theta_c - theta) + kd_theta (theta_c' - theta'))
/// F        = m (g + az_d + kp_z (z_d - z) + kd_z (vz_d - vz))
///
/// and symmetrically for `phi`/`y`/`M2` with `Ixx`.
///
/// `theta_c'` is not the analytic derivative of `theta_c`. It is the rate estimate the
/// tuned gains were designed against and must stay as written.
pub fn compute_control(
    state: &State,
    desired: &DesiredState,
    params: &PhysicalParameters,
    gains: &Gains,
) -> ControlInput {
    let g = params.gravity;

    let theta_command = -(desired.x_acc
        + gains.kp_x * (desired.x_pos - state.x)
        + gains.kd_x * (desired.x_vel - state.x_vel))
        / g;
    let theta_command_rate =
        -(gains.kp_x * (desired.x_vel - state.x_vel) + gains.kd_x * (desired.x_acc + g * state.theta))
            / g;

    let phi_command = -(desired.y_acc
        + gains.kp_y * (desired.y_pos - state.y)
        + gains.kd_y * (desired.y_vel - state.y_vel))
        / g;
    let phi_command_rate =
        -(gains.kp_y * (desired.y_vel - state.y_vel) + gains.kd_y * (desired.y_acc + g * state.phi))
            / g;

    let moment1 = params.iyy
        * (gains.kp_theta * (theta_command - state.theta)
            + gains.kd_theta * (theta_command_rate - state.theta_vel));
    let moment2 = params.ixx
        * (gains.kp_phi * (phi_command - state.phi)
            + gains.kd_phi * (phi_command_rate - state.phi_vel));

    let force = params.mass
        * (g + desired.z_acc
            + gains.kp_z * (desired.z_pos - state.z)
            + gains.kd_z * (desired.z_vel - state.z_vel));

    ControlInput {
        force,
        moment1,
        moment2,
        theta_command,
        phi_command,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn controller() -> PdController {
        PdController::new(PhysicalParameters::default(), Gains::default())
    }

    #[test]
    fn test_hover_equilibrium() {
        let c = controller();
        let state = State {
            x: 1.0,
            y: -2.0,
            z: 3.0,
            ..State::default()
        };
        let desired = DesiredState::hold(state.position());

        let u = c.compute(&state, &desired);

        assert_relative_eq!(u.force, c.params.mass * c.params.gravity, epsilon = 1e-12);
        assert_relative_eq!(u.moment1, 0.0, epsilon = 1e-12);
        assert_relative_eq!(u.moment2, 0.0, epsilon = 1e-12);
        assert_relative_eq!(u.theta_command, 0.0, epsilon = 1e-12);
        assert_relative_eq!(u.phi_command, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_forward_error_pitches_nose_down() {
        let c = controller();
        let desired = DesiredState::hold(Vector3::new(1.0, 0.0, 0.0));
        let u = c.compute(&State::default(), &desired);

        // x'' = -g * theta, so moving toward +x needs negative pitch.
        assert_relative_eq!(u.theta_command, -40.0 / 9.81, epsilon = 1e-12);
        assert!(u.moment1 < 0.0);
        assert_relative_eq!(u.phi_command, 0.0, epsilon = 1e-12);
        assert_relative_eq!(u.moment2, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_commanded_rate_uses_algebraic_approximation() {
        let params = PhysicalParameters::default();
        let gains = Gains::default();
        let state = State {
            theta: 0.02,
            x_vel: 0.5,
            ..State::default()
        };
        let desired = DesiredState {
            x_acc: 0.1,
            ..DesiredState::default()
        };

        let u = compute_control(&state, &desired, &params, &gains);

        let g = params.gravity;
        let theta_c = -(0.1 + 40.0 * 0.0 + 9.0 * (0.0 - 0.5)) / g;
        let theta_c_rate = -(40.0 * (0.0 - 0.5) + 9.0 * (0.1 + g * 0.02)) / g;
        let expected = params.iyy * (25.0 * (theta_c - 0.02) + 11.0 * (theta_c_rate - 0.0));
        assert_relative_eq!(u.theta_command, theta_c, epsilon = 1e-12);
        assert_relative_eq!(u.moment1, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_altitude_feed_forward() {
        let params = PhysicalParameters::default();
        let desired = DesiredState {
            z_pos: 1.0,
            z_vel: 0.5,
            z_acc: 2.0,
            ..DesiredState::default()
        };

        let u = compute_control(&State::default(), &desired, &params, &Gains::default());

        let expected = params.mass * (params.gravity + 2.0 + 65.0 * 1.0 + 10.9 * 0.5);
        assert_relative_eq!(u.force, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_compute_is_deterministic() {
        let c = controller();
        let state = State {
            x: 0.1,
            y: 0.7,
            z: 0.3,
            theta: -0.01,
            phi_vel: 0.2,
            ..State::default()
        };
        let desired = DesiredState::from_array(&[1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);

        let a = c.compute(&state, &desired).to_array();
        let b = c.compute(&state, &desired).to_array();
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.to_bits(), y.to_bits());
        }
    }

    #[test]
    fn test_quantized() {
        let u = ControlInput {
            force: 1.76583,
            moment1: -0.0123456,
            moment2: 0.0987654,
            theta_command: -4.07747,
            phi_command: 0.0004,
        };
        let q = u.quantized();
        assert_relative_eq!(q.force, 1.77, epsilon = 1e-12);
        assert_relative_eq!(q.moment1, -0.012, epsilon = 1e-12);
        assert_relative_eq!(q.moment2, 0.099, epsilon = 1e-12);
        assert_relative_eq!(q.theta_command, -4.077, epsilon = 1e-12);
        assert_relative_eq!(q.phi_command, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_quantized_ties_round_to_even() {
        let u = ControlInput {
            force: 0.125,
            moment1: 0.0625,
            moment2: -0.0625,
            theta_command: 0.1875,
            phi_command: 0.0,
        };
        let q = u.quantized();
        assert_eq!(q.force, 0.12);
        assert_eq!(q.moment1, 0.062);
        assert_eq!(q.moment2, -0.062);
        assert_eq!(q.theta_command, 0.188);
    }
}
