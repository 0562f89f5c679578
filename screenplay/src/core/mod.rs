//! Pure engine state: errors, classification, abilities, memory and tallies.

pub mod abilities;
pub mod analysis;
pub mod failure;
pub mod notepad;
pub mod outcome;
pub mod persona;
pub mod tally;
pub mod title;
