pub mod config;
pub mod db;
pub mod http;
pub mod model;
pub mod render;
pub mod rotate;
pub mod storage;
