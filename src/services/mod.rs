// src/services/mod.rs

pub mod analytics;
pub mod grading;
pub mod payments;
