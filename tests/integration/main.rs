//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises the measurement pipeline
//! against the simulated adapters. All tests run on the host (x86_64) with
//! no real hardware required.

#![cfg(not(target_os = "espidf"))]

mod init_tests;
mod mock_ports;
mod pipeline_tests;
