pub mod analyze;
pub mod form;
