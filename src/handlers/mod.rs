// src/handlers/mod.rs

pub mod catalog;
pub mod grades;
pub mod ranking;
