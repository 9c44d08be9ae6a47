pub mod app;
pub mod audio;
pub mod config;
pub mod library;
pub mod model;
pub mod policy;
pub mod store;
pub mod transport;
