pub mod dead_letter;
pub mod decimal;
pub mod delta;
pub mod envelope;
pub mod errors;
pub mod workload;
