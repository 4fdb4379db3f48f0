pub mod datetime;
pub mod filename_dates;
pub mod loader;
pub mod parser;
pub mod table;
