pub mod analysis;
pub mod organisation;
