/// Cross-module test suites for the forecasting pipeline
///
/// * `pipeline_tests` - Whole runs through the burn LSTM on synthetic exports
/// * `preprocessing_tests` - Cleaning, feature and scaling behaviour on awkward inputs
pub mod pipeline_tests;
