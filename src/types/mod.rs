//! Core types for turnloop.

pub mod generation;
pub mod turn;

pub use generation::*;
pub use turn::*;
