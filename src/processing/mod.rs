pub mod edna;
pub mod outliers;
pub mod statistics;
