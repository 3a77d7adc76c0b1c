//! Test utilities for session transaction tests.

pub mod mock_host;

#[allow(unused_imports)]
pub use mock_host::{DelegateBehavior, MockHost};
