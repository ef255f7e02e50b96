pub mod cli;
pub mod parse;
pub mod remote;
pub mod report;
pub mod upload;
pub mod vocab;

pub use parse::DemographicRecord;
