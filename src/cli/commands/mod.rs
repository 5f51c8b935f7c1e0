pub mod config;
pub mod pipeline;
pub mod similar;
pub mod status;
