//! Small helpers shared by the store, the CLI and the tests.
pub mod json;
