//! Behaviour tests for the helper orchestrators.
//!
//! Test modules:
//! - assessment: record shape, invalid states, engine failures
//! - bitmap: empty results, handle release on every path
//! - elevation: exit code mapping and the bounded wait
//! - dispatch: verb routing over a real channel pair

mod elevation;
