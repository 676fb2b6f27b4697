pub mod app;
pub mod artwork;
pub mod commands;
pub mod error;
pub mod gesture;
pub mod logging;
pub mod player;
pub mod reconcile;
pub mod scheduler;
pub mod timer;
pub mod transport;
pub mod ui;
