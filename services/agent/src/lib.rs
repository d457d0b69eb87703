//! Voice and text front ends for the invoicing agents.

pub mod app;
pub mod audio;
pub mod config;
pub mod dispatch;
