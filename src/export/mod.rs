//! Export module - CSV output of finished runs.

mod csv_export;

pub use csv_export::*;
