// src/handlers/mod.rs

pub mod assignments;
pub mod courses;
pub mod payments;
pub mod quiz;
