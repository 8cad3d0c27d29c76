pub mod commons;
pub mod config;
pub mod dto;
pub mod http;
pub mod logic;
