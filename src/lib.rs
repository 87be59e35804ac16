pub mod config;
pub mod constants;
pub mod daily;
pub mod error;
#[cfg(test)]
pub mod test;
pub mod util {
    pub mod feature_engineering;
    pub mod file_utils;
    pub mod pre_processor;
    pub mod run_report;
    #[cfg(test)]
    pub mod test_utils;
}
