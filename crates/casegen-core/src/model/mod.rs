//! Canonical test case data model.

mod test_case;

pub use test_case::{
    validate_steps, DataMap, Priority, TestCase, TestCaseMetadata, TestStep, TestType,
    ValidationError, DEFAULT_STEP_EXPECTATION, DEFAULT_TEST_EXPECTATION,
};
