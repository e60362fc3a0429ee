pub mod driver;
pub mod inputs;
pub mod parallel;

pub use driver::{evaluate_point, run_scenario, ComparisonResult, DcaComparison, ScenarioOutput};
pub use inputs::{FailurePolicy, ScenarioInputs, TerminalValue};
