pub mod app;
pub mod braille;
pub mod chart;
pub mod config;
pub mod data;
pub mod error;
pub mod map;
pub mod source;
pub mod ui;
