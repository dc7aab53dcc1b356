#[macro_use]
extern crate diesel;
#[macro_use]
extern crate diesel_migrations;

pub mod access;
pub mod aggregate;
pub mod config;
pub mod db;
pub mod error;
pub mod hierarchy;
pub mod keys;
pub mod memory;
pub mod models;
pub mod provision;
pub mod registry;
pub mod schema;
pub mod service;
pub mod store;
