// File: simucast-core/src/interactions/mod.rs

pub mod scheduler;

pub use scheduler::InteractionScheduler;
