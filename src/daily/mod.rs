pub mod lstm;
pub mod pipeline;
