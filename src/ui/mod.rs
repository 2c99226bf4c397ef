// UI module - egui front-end and visual indicators

pub mod app;
pub mod indicators;
