// src/models/mod.rs

pub mod assignment;
pub mod course;
pub mod enrollment;
pub mod event;
pub mod payment;
pub mod question;
pub mod quiz_attempt;
