use quadpd::{ActuatorLimits, DesiredState, PhysicalParameters, SimConfig, Simulator, State};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Recover from a small pitch and roll disturbance while holding 1 m altitude.
fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .init();

    let initial_state = State {
        z: 1.0,
        theta: 0.1,
        phi: -0.05,
        ..State::default()
    };

    let config = SimConfig {
        initial_state,
        desired_state: DesiredState::hold(initial_state.position()),
        params: PhysicalParameters {
            gravity: 9.81,
            mass: 0.18,
            ixx: 0.00025,
            iyy: 0.00025,
        },
        limits: ActuatorLimits {
            u_min: -0.1,
            u_max: 0.1,
        },
        ..Default::default()
    };

    let mut sim = match Simulator::new(config) {
        Ok(sim) => sim,
        Err(e) => {
            println!("Invalid configuration: {}", e);
            return;
        }
    };

    loop {
        match sim.step() {
            Ok(Some(record)) => {
                let s = record.state;
                println!(
                    "{:.3} pos=({:.3}, {:.3}, {:.3}) att=({:.4}, {:.4}) thrust={:.3}",
                    record.time, s.x, s.y, s.z, s.theta, s.phi, record.control.force
                );
            }
            Ok(None) => break,
            Err(e) => {
                println!("Simulation failed: {}", e);
                return;
            }
        }
    }

    let final_state = sim.current_state();
    let target = sim.config().desired_state.position();
    let velocity = final_state.velocity();
    println!("Final state:");
    println!(
        "Position: ({:.3}, {:.3}, {:.3})",
        final_state.x, final_state.y, final_state.z
    );
    println!(
        "Velocity: ({:.3}, {:.3}, {:.3})",
        velocity.x, velocity.y, velocity.z
    );
    println!(
        "Distance to target: {:.4}",
        (final_state.position() - target).norm()
    );
    println!("Attitude: ({:.3}, {:.3})", final_state.theta, final_state.phi);
}
