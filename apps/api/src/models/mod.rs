pub mod case;
pub mod profile;
pub mod report;
