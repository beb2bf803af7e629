//! Application boundary.
//!
//! All interaction between the measurement core and hardware or transport
//! happens through the **port traits** defined in [`ports`], keeping the
//! core fully testable without real peripherals.

pub mod ports;
