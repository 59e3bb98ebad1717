//! API handlers module

pub mod gallery;
pub mod health;
pub mod library;
pub mod papers;
