use nalgebra::Vector3;
use quadpd::{simulate, DesiredState, IntegratorKind, SimConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Fly from the origin to a waypoint and print the path as "t x y z" lines.
fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .init();

    let desired = DesiredState::hold(Vector3::new(1.0, 1.0, 1.0));
    let config = SimConfig {
        desired_state: desired,
        integrator: IntegratorKind::Adaptive { tolerance: 1e-6 },
        ..Default::default()
    };

    match simulate(config) {
        Ok(trajectory) => {
            for record in &trajectory {
                let p = record.state.position();
                println!("{} {} {} {}", record.time, p.x, p.y, p.z);
            }

            let saturations = trajectory.saturation_events();
            if !saturations.is_empty() {
                println!("# {} saturated moment commands", saturations.len());
            }
            if trajectory.settled(&desired, 0.00015) {
                println!("# reached waypoint");
            }
        }
        Err(e) => println!("Simulation failed: {}", e),
    }
}
