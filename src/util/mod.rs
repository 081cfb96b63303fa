//! Support utilities: frequency math and synthetic signal generation.

pub mod generation;
pub mod math;
