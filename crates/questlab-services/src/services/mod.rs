pub mod analysis;
pub mod submission;
