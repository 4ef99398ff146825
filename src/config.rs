//! Run configuration
//!
//! Everything a simulation needs is passed in explicitly through [`SimConfig`], so
//! several runs with different tuning can coexist in one process.

use serde::{Deserialize, Serialize};

use crate::control::DesiredState;
use crate::dynamics::State;
use crate::error::{Result, SimError};

/// Physical constants of the vehicle.
///
/// # Fields
///
/// * `gravity` - Gravitational acceleration (m/s²)
/// * `mass` - Total mass (kg)
/// * `ixx`, `iyy` - Roll and pitch moments of inertia (kg⋅m²)
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhysicalParameters {
    pub gravity: f64,
    pub mass: f64,
    pub ixx: f64,
    pub iyy: f64,
}

impl Default for PhysicalParameters {
    fn default() -> Self {
        Self {
            gravity: 9.81,
            mass: 0.18,
            ixx: 0.00025,
            iyy: 0.00025,
        }
    }
}

impl PhysicalParameters {
    pub fn validate(&self) -> Result<()> {
        ensure_finite("gravity", self.gravity)?;
        ensure_finite("mass", self.mass)?;
        ensure_finite("ixx", self.ixx)?;
        ensure_finite("iyy", self.iyy)?;

        if self.gravity == 0.0 {
            return Err(SimError::config("gravity must be non-zero"));
        }
        if self.mass <= 0.0 {
            return Err(SimError::config(format!(
                "mass must be positive, got {}",
                self.mass
            )));
        }
        if self.ixx <= 0.0 || self.iyy <= 0.0 {
            return Err(SimError::config(format!(
                "moments of inertia must be positive, got ixx={} iyy={}",
                self.ixx, self.iyy
            )));
        }
        Ok(())
    }
}

/// Bounds applied to the pitch and roll moments before integration.
/// Thrust is not limited.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActuatorLimits {
    pub u_min: f64,
    pub u_max: f64,
}

impl Default for ActuatorLimits {
    fn default() -> Self {
        Self {
            u_min: -0.1,
            u_max: 0.1,
        }
    }
}

impl ActuatorLimits {
    pub fn validate(&self) -> Result<()> {
        ensure_finite("u_min", self.u_min)?;
        ensure_finite("u_max", self.u_max)?;
        if self.u_min >= self.u_max {
            return Err(SimError::config(format!(
                "actuator limits must satisfy u_min < u_max, got [{}, {}]",
                self.u_min, self.u_max
            )));
        }
        Ok(())
    }

    /// Hard clip into `[u_min, u_max]`.
    pub fn clamp(&self, moment: f64) -> f64 {
        moment.clamp(self.u_min, self.u_max)
    }
}

/// PD gains for the three translational axes and the two attitude loops.
///
/// Not validated: negative or zero gains are accepted even though they may make the
/// closed loop unstable.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Gains {
    pub kp_x: f64,
    pub kd_x: f64,
    pub kp_y: f64,
    pub kd_y: f64,
    pub kp_z: f64,
    pub kd_z: f64,
    pub kp_theta: f64,
    pub kd_theta: f64,
    pub kp_phi: f64,
    pub kd_phi: f64,
}

impl Default for Gains {
    fn default() -> Self {
        Self {
            kp_x: 40.0,
            kd_x: 9.0,
            kp_y: 40.0,
            kd_y: 9.0,
            kp_z: 65.0,
            kd_z: 10.9,
            kp_theta: 25.0,
            kd_theta: 11.0,
            kp_phi: 25.0,
            kd_phi: 11.0,
        }
    }
}

/// Simulated time span and its uniform discretization.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Horizon {
    /// End of the run [s]; the run starts at 0
    pub final_time: f64,
    /// Number of time points including both endpoints
    pub steps: usize,
}

impl Default for Horizon {
    fn default() -> Self {
        // 30 points per second over 10 s
        Self {
            final_time: 10.0,
            steps: 301,
        }
    }
}

impl Horizon {
    pub fn validate(&self) -> Result<()> {
        ensure_finite("final_time", self.final_time)?;
        if self.final_time <= 0.0 {
            return Err(SimError::config(format!(
                "final_time must be positive, got {}",
                self.final_time
            )));
        }
        if self.steps < 2 {
            return Err(SimError::config(format!(
                "at least 2 time points are required, got {}",
                self.steps
            )));
        }
        Ok(())
    }

    /// Time of point `i`, evenly spaced over `[0, final_time]`.
    pub fn time_at(&self, i: usize) -> f64 {
        if i + 1 >= self.steps {
            return self.final_time;
        }
        self.final_time * i as f64 / (self.steps - 1) as f64
    }

    /// All time points.
    pub fn time_points(&self) -> Vec<f64> {
        (0..self.steps).map(|i| self.time_at(i)).collect()
    }

    pub fn dt(&self) -> f64 {
        self.final_time / (self.steps - 1) as f64
    }
}

/// Which integration service advances the state between time points.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum IntegratorKind {
    /// Adaptive solver from `fast_ode` with the given absolute tolerance.
    Adaptive { tolerance: f64 },
    /// Classical RK4 with a fixed number of substeps per span.
    Rk4 { substeps: usize },
}

impl Default for IntegratorKind {
    fn default() -> Self {
        Self::Adaptive { tolerance: 1e-6 }
    }
}

impl IntegratorKind {
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::Adaptive { tolerance } if !(tolerance.is_finite() && tolerance > 0.0) => Err(
                SimError::config(format!("integrator tolerance must be positive, got {tolerance}")),
            ),
            Self::Rk4 { substeps: 0 } => {
                Err(SimError::config("rk4 integrator needs at least one substep"))
            }
            _ => Ok(()),
        }
    }
}

/// Complete configuration of one simulation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    pub initial_state: State,
    pub desired_state: DesiredState,
    pub params: PhysicalParameters,
    pub limits: ActuatorLimits,
    pub gains: Gains,
    pub horizon: Horizon,
    pub integrator: IntegratorKind,
    /// Round controller outputs (force to 2 decimals, the rest to 3) before clamping.
    pub quantize_inputs: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            initial_state: State::default(),
            desired_state: DesiredState::from_array(&[1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
            params: PhysicalParameters::default(),
            limits: ActuatorLimits::default(),
            gains: Gains::default(),
            horizon: Horizon::default(),
            integrator: IntegratorKind::default(),
            quantize_inputs: false,
        }
    }
}

impl SimConfig {
    /// Checks everything the model divides by or iterates over.
    ///
    /// Gains are deliberately left unchecked.
    pub fn validate(&self) -> Result<()> {
        self.params.validate()?;
        self.limits.validate()?;
        self.horizon.validate()?;
        self.integrator.validate()?;

        if !self.initial_state.is_finite() {
            return Err(SimError::config("initial state contains non-finite values"));
        }
        if self.initial_state.z < 0.0 {
            return Err(SimError::config(format!(
                "initial altitude must not be below ground, got z = {}",
                self.initial_state.z
            )));
        }
        if !self.desired_state.to_array().iter().all(|v| v.is_finite()) {
            return Err(SimError::config("desired state contains non-finite values"));
        }
        Ok(())
    }
}

fn ensure_finite(name: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(SimError::config(format!("{name} must be finite, got {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_physical_parameters() {
        let cases = [
            PhysicalParameters {
                mass: 0.0,
                ..Default::default()
            },
            PhysicalParameters {
                mass: -1.0,
                ..Default::default()
            },
            PhysicalParameters {
                ixx: 0.0,
                ..Default::default()
            },
            PhysicalParameters {
                iyy: -0.1,
                ..Default::default()
            },
            PhysicalParameters {
                gravity: 0.0,
                ..Default::default()
            },
            PhysicalParameters {
                mass: f64::NAN,
                ..Default::default()
            },
        ];

        for params in cases {
            let config = SimConfig {
                params,
                ..Default::default()
            };
            assert!(
                matches!(config.validate(), Err(SimError::Configuration(_))),
                "{params:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_negative_gravity_is_allowed() {
        let params = PhysicalParameters {
            gravity: -9.81,
            ..Default::default()
        };
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_horizon() {
        for horizon in [
            Horizon {
                final_time: 0.0,
                steps: 301,
            },
            Horizon {
                final_time: -1.0,
                steps: 301,
            },
            Horizon {
                final_time: 10.0,
                steps: 1,
            },
            Horizon {
                final_time: f64::INFINITY,
                steps: 301,
            },
        ] {
            assert!(matches!(
                horizon.validate(),
                Err(SimError::Configuration(_))
            ));
        }
    }

    #[test]
    fn test_rejects_inverted_limits() {
        let limits = ActuatorLimits {
            u_min: 0.1,
            u_max: 0.1,
        };
        assert!(limits.validate().is_err());

        let limits = ActuatorLimits {
            u_min: 0.2,
            u_max: -0.2,
        };
        assert!(limits.validate().is_err());
    }

    #[test]
    fn test_rejects_non_finite_initial_state() {
        let config = SimConfig {
            initial_state: State {
                z: f64::NAN,
                ..State::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_initial_state_below_ground() {
        let below = SimConfig {
            initial_state: State {
                z: -0.01,
                ..State::default()
            },
            ..Default::default()
        };
        assert!(matches!(below.validate(), Err(SimError::Configuration(_))));

        let on_ground = SimConfig {
            initial_state: State::default(),
            ..Default::default()
        };
        assert!(on_ground.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_integrator() {
        assert!(IntegratorKind::Rk4 { substeps: 0 }.validate().is_err());
        assert!(IntegratorKind::Adaptive { tolerance: 0.0 }
            .validate()
            .is_err());
        assert!(IntegratorKind::Rk4 { substeps: 8 }.validate().is_ok());
    }

    #[test]
    fn test_clamp() {
        let limits = ActuatorLimits::default();
        assert_eq!(limits.clamp(0.5), 0.1);
        assert_eq!(limits.clamp(-0.5), -0.1);
        assert_eq!(limits.clamp(0.05), 0.05);
    }

    #[test]
    fn test_time_points_are_uniform() {
        let horizon = Horizon::default();
        let times = horizon.time_points();

        assert_eq!(times.len(), 301);
        assert_eq!(times[0], 0.0);
        assert_eq!(times[300], 10.0);
        assert_relative_eq!(horizon.dt(), 1.0 / 30.0, epsilon = 1e-12);
        for pair in times.windows(2) {
            assert_relative_eq!(pair[1] - pair[0], horizon.dt(), epsilon = 1e-12);
        }
    }
}
