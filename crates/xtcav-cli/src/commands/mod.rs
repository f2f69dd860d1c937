pub mod config;
pub mod dark;
pub mod generate;
pub mod info;
