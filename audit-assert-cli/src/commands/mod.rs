pub mod baseline;
pub mod config;
pub mod records;
pub mod teardown;
pub mod verify;
