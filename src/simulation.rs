//! Fixed-step simulation driver
//!
//! Each step evaluates the controller, clips the moments to the actuator limits,
//! integrates the model over one span with the inputs held constant, applies the
//! ground plane and appends the result to the history.

use tracing::{debug, error, info, warn};

use crate::config::SimConfig;
use crate::control::{ControlInput, Controller, PdController};
use crate::dynamics::{QuadOde, State};
use crate::error::{Result, SimError};
use crate::integrator::{self, Integrator};
use crate::trajectory::{MomentAxis, SaturationEvent, Trajectory, TrajectoryRecord};

/// Drives one run from the initial condition to the final time point.
pub struct Simulator<C = PdController> {
    config: SimConfig,
    controller: C,
    integrator: Box<dyn Integrator>,
    /// Current state; replaced once per step
    state: State,
    /// Index of the last committed time point
    step: usize,
    trajectory: Trajectory,
    on_ground: bool,
    saturation_reported: bool,
    /// Set once an integration error halts the run
    failure: Option<SimError>,
}

impl Simulator<PdController> {
    /// Creates a simulator using the PD controller and the integrator named in `config`.
    ///
    /// Fails with [`SimError::Configuration`] before anything runs if the
    /// configuration is invalid.
    pub fn new(config: SimConfig) -> Result<Self> {
        let controller = PdController::new(config.params, config.gains);
        let integrator = integrator::from_kind(config.integrator);
        Self::with_parts(config, controller, integrator)
    }
}

impl<C: Controller> Simulator<C> {
    /// Creates a simulator with a caller-supplied controller and integrator.
    pub fn with_parts(
        config: SimConfig,
        controller: C,
        integrator: Box<dyn Integrator>,
    ) -> Result<Self> {
        config.validate()?;

        let state = config.initial_state;
        let mut trajectory = Trajectory::with_capacity(config.horizon.steps);
        trajectory.push(TrajectoryRecord::initial(state));

        Ok(Self {
            on_ground: state.z <= 0.0,
            config,
            controller,
            integrator,
            state,
            step: 0,
            trajectory,
            saturation_reported: false,
            failure: None,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn current_state(&self) -> &State {
        &self.state
    }

    /// Index of the last committed time point (0 before the first step).
    pub fn step_index(&self) -> usize {
        self.step
    }

    /// The error that halted the run, if any.
    pub fn failure(&self) -> Option<&SimError> {
        self.failure.as_ref()
    }

    pub fn is_done(&self) -> bool {
        self.step + 1 >= self.config.horizon.steps
    }

    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    pub fn into_trajectory(self) -> Trajectory {
        self.trajectory
    }

    /// Advances one time step.
    ///
    /// Returns the new record, or `None` if the run is already complete. On
    /// [`SimError::Integration`] the state and history are left at the last good step,
    /// and every later call returns the same error.
    pub fn step(&mut self) -> Result<Option<&TrajectoryRecord>> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        if self.is_done() {
            return Ok(None);
        }

        if let Err(err) = self.advance() {
            self.failure = Some(err.clone());
            return Err(err);
        }
        Ok(self.trajectory.last())
    }

    fn advance(&mut self) -> Result<()> {
        let next = self.step + 1;
        let horizon = &self.config.horizon;
        let time_span = (horizon.time_at(self.step), horizon.time_at(next));

        let mut control = self
            .controller
            .compute(&self.state, &self.config.desired_state);
        if self.config.quantize_inputs {
            control = control.quantized();
        }

        let (applied_moments, saturation) = self.clamp_moments(&control);
        if !saturation.is_empty() && !self.saturation_reported {
            warn!(
                step = next,
                time = time_span.1,
                "moment command saturated at actuator limits"
            );
            self.saturation_reported = true;
        }

        let system = QuadOde {
            params: self.config.params,
            force: control.force,
            moment1: applied_moments[0],
            moment2: applied_moments[1],
        };

        let mut state = self
            .integrator
            .integrate(&system, &self.state, time_span)
            .map_err(|reason| {
                error!(step = self.step, reason, "integration failed");
                SimError::integration(self.step, reason)
            })?;

        if !state.is_finite() {
            error!(step = self.step, ?state, "integration produced non-finite state");
            return Err(SimError::integration(
                self.step,
                "integrator returned non-finite state",
            ));
        }

        let ground_contact = state.constrain_to_ground();
        if ground_contact && !self.on_ground {
            warn!(step = next, time = time_span.1, "vehicle hit the ground");
        } else if !ground_contact && self.on_ground && state.z > 0.0 {
            debug!(step = next, time = time_span.1, "vehicle left the ground");
        }
        self.on_ground = state.z <= 0.0;

        debug!(
            step = next,
            time = time_span.1,
            x = state.x,
            y = state.y,
            z = state.z,
            force = control.force,
            "step"
        );

        self.trajectory.push(TrajectoryRecord {
            time: time_span.1,
            state,
            control,
            applied_moments,
            saturation,
            ground_contact,
        });
        self.state = state;
        self.step = next;

        Ok(())
    }

    /// Runs every remaining step and returns the history.
    pub fn run(mut self) -> Result<Trajectory> {
        info!(
            final_time = self.config.horizon.final_time,
            steps = self.config.horizon.steps,
            "starting simulation"
        );

        while self.step()?.is_some() {}

        let desired = &self.config.desired_state;
        info!(
            steps = self.trajectory.len(),
            position_error = self.trajectory.final_position_error(desired),
            saturated_steps = self.trajectory.iter().filter(|r| r.is_saturated()).count(),
            "simulation finished"
        );

        Ok(self.trajectory)
    }

    fn clamp_moments(&self, control: &ControlInput) -> ([f64; 2], Vec<SaturationEvent>) {
        let limits = &self.config.limits;
        let mut events = Vec::new();
        let mut applied = [0.0; 2];

        for (i, (axis, commanded)) in [
            (MomentAxis::Pitch, control.moment1),
            (MomentAxis::Roll, control.moment2),
        ]
        .into_iter()
        .enumerate()
        {
            applied[i] = limits.clamp(commanded);
            if applied[i] != commanded {
                events.push(SaturationEvent {
                    axis,
                    commanded,
                    applied: applied[i],
                });
            }
        }

        (applied, events)
    }
}

/// Runs a full simulation with the PD controller.
pub fn simulate(config: SimConfig) -> Result<Trajectory> {
    Simulator::new(config)?.run()
}
