pub mod config;
pub mod display;
pub mod error;
pub mod features;
pub mod importer;
pub mod logging;
pub mod model;
pub mod schedule;
pub mod store;
pub mod web;
