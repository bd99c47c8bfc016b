pub mod artifacts;
pub mod counters;
pub mod lifecycle;
pub mod reset;
