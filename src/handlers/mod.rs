// src/handlers/mod.rs

pub mod auth;
pub mod collections;
pub mod exercises;
pub mod lessons;
pub mod notes;
pub mod templates;
