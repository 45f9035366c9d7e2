pub mod attitude_estimator;
pub mod command_shaper;
pub mod control_loops;
pub mod filters;
pub mod flight_controllers;
pub mod flight_state;
pub mod integrator;
pub mod pid;
pub mod scheduler;
