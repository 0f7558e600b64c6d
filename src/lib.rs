#![allow(non_snake_case)]

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod handlers;
pub mod models;
pub mod runtime;
pub mod service;
pub mod state;
pub mod tasks;
