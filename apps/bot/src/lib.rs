pub mod command;
pub mod config;
pub mod gateway;
pub mod handler;
