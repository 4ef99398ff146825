use crate::config::IntegratorKind;
use crate::dynamics::{derivative, QuadOde, State, STATE_LEN};

/// Advances the quadrotor state across one control span.
///
/// The simulator only needs the state at the right end of `time_span`; how the
/// solver gets there is up to the implementation.
pub trait Integrator {
    fn integrate(
        &self,
        system: &QuadOde,
        initial_state: &State,
        time_span: (f64, f64),
    ) -> Result<State, &'static str>;
}

/// Adaptive step-size solver backed by `fast_ode`.
///
/// The solver is given `tolerance` and `10 * tolerance` as its two error tolerances.
#[derive(Clone, Copy, Debug)]
pub struct AdaptiveIntegrator {
    pub tolerance: f64,
}

impl Default for AdaptiveIntegrator {
    fn default() -> Self {
        Self { tolerance: 1e-6 }
    }
}

impl Integrator for AdaptiveIntegrator {
    fn integrate(
        &self,
        system: &QuadOde,
        initial_state: &State,
        time_span: (f64, f64),
    ) -> Result<State, &'static str> {
        if !initial_state.is_finite() {
            return Err("initial state is not finite");
        }

        let initial_coord = fast_ode::Coord(initial_state.to_array());

        let result = fast_ode::solve_ivp(
            system,
            time_span,
            initial_coord,
            |_, _| true,
            self.tolerance,
            self.tolerance * 10.0,
        );

        match result {
            fast_ode::IvpResult::FinalTimeReached(final_coord) => {
                let state = State::from_array(&final_coord.0);
                if state.is_finite() {
                    Ok(state)
                } else {
                    Err("solver returned a non-finite state")
                }
            }
            _ => Err("solver did not reach the end of the time span"),
        }
    }
}

/// Classical 4th-order Runge-Kutta with `substeps` equal steps per span.
#[derive(Clone, Copy, Debug)]
pub struct Rk4Integrator {
    pub substeps: usize,
}

impl Default for Rk4Integrator {
    fn default() -> Self {
        Self { substeps: 10 }
    }
}

impl Integrator for Rk4Integrator {
    fn integrate(
        &self,
        system: &QuadOde,
        initial_state: &State,
        time_span: (f64, f64),
    ) -> Result<State, &'static str> {
        if self.substeps == 0 {
            return Err("rk4 integrator needs at least one substep");
        }

        let h = (time_span.1 - time_span.0) / self.substeps as f64;
        let f = |y: &[f64; STATE_LEN]| {
            derivative(
                &State::from_array(y),
                &system.params,
                system.force,
                system.moment1,
                system.moment2,
            )
        };

        let mut y = initial_state.to_array();
        for _ in 0..self.substeps {
            let k1 = f(&y);
            let k2 = f(&offset(&y, &k1, h * 0.5));
            let k3 = f(&offset(&y, &k2, h * 0.5));
            let k4 = f(&offset(&y, &k3, h));

            for (((yj, a), (b, c)), d) in y
                .iter_mut()
                .zip(&k1)
                .zip(k2.iter().zip(&k3))
                .zip(&k4)
            {
                *yj += (a + 2.0 * b + 2.0 * c + d) * (h / 6.0);
            }
        }

        Ok(State::from_array(&y))
    }
}

fn offset(y: &[f64; STATE_LEN], k: &[f64; STATE_LEN], h: f64) -> [f64; STATE_LEN] {
    let mut out = *y;
    for (o, d) in out.iter_mut().zip(k.iter()) {
        *o += d * h;
    }
    out
}

/// Builds the integrator selected in the configuration.
pub fn from_kind(kind: IntegratorKind) -> Box<dyn Integrator> {
    match kind {
        IntegratorKind::Adaptive { tolerance } => Box::new(AdaptiveIntegrator { tolerance }),
        IntegratorKind::Rk4 { substeps } => Box::new(Rk4Integrator { substeps }),
    }
}
