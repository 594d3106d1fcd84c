// src/models/mod.rs

pub mod class_room;
pub mod grade;
pub mod item;
pub mod notification;
pub mod ranking;
pub mod student;
