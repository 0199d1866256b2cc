//! Integration test suite.
//!
//! Tests are organized by area:
//! 1. Container files on disk
//! 2. Schema evolution across files
//! 3. Corruption recovery
//! 4. User record scenario (generic and specific)

pub mod container_tests;
pub mod evolution_tests;
pub mod helpers;
pub mod recovery_tests;
pub mod user_scenario_tests;
