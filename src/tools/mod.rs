//! Internal helpers shared by the codec stages

pub mod progress;
