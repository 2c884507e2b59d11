// Library surface for the binary, headless drivers and integration tests.
pub mod app;
pub mod app_dirs;
pub mod clock;
pub mod config;
pub mod delay;
pub mod engine;
pub mod feedback;
pub mod history;
pub mod rating;
pub mod records;
pub mod runtime;
pub mod scheduler;
pub mod stats;
pub mod store;
pub mod ui;
