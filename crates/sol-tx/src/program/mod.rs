//! Instruction builders for well-known on-chain programs.

pub mod system;
pub mod token;
