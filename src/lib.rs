pub mod clock;
pub mod models;
pub mod repositories;
pub mod services;
pub mod settings;
pub mod shell;
pub mod state;
pub mod views;
