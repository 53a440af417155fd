pub mod catalog_import;
pub mod db;
pub mod driver;
pub mod error;
pub mod input;
pub mod logbook;
pub mod models;
pub mod navigator;
pub mod search;
pub mod service;
pub mod store;

#[cfg(test)]
mod testing;
