pub mod analyze;
pub mod health;
pub mod parse_pdf;
