//! Signal drivers and task helpers.

pub mod task_pin;
pub mod zco_sim;
