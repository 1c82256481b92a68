pub mod controller;
pub mod db;
pub mod gemini;
pub mod generation;
pub mod models;
pub mod store;
