//! Docker container management for the test database.

pub mod lifecycle;
