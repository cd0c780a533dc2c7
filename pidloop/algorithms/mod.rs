//! Pure computational algorithms for the control loop
//!
//! No I/O: each type owns its numeric state and is advanced one tick at a time
//! by the caller.
//!
//! ## Control
//! - **pid**: PID controller with windup stop, saturation and measurement noise
//!
//! ## Process models
//! - **plant**: damped second-order plant, semi-implicit Euler step

pub mod pid;
pub mod plant;

#[cfg(test)]
mod tests {
    use super::pid::Controller;
    use super::plant::Plant;
    use crate::noise::Silent;
    use crate::{PidConfig, PlantConfig};
    use approx::assert_relative_eq;

    #[test]
    fn test_closed_loop_reaches_setpoint() {
        let config = PidConfig::proportional(50.0)
            .with_saturation(1500.0)
            .with_integral_stop(40.0)
            .with_sampling_interval(0.02);
        let mut controller = Controller::with_noise_source(config, Silent).unwrap();
        let mut plant = Plant::new(PlantConfig::new(10.0, 0.3, 0.0)).unwrap();

        let mut peak: f64 = 0.0;
        for _ in 0..100 {
            let signal = controller.control(plant.value(), 10.0);
            assert!(signal.abs() <= 1500.0);
            plant.change(signal * 0.02);
            assert!(plant.value().is_finite());
            peak = peak.max(plant.value());
        }

        // Underdamped: one overshoot of roughly 15%, then settles
        assert!(peak > 10.0 && peak < 12.0, "peak {peak}");
        assert_relative_eq!(plant.value(), 10.0, epsilon = 1e-3);
    }
}
