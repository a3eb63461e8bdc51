//! Domain Layer
//!
//! Core model and business rules. Nothing in here knows about HTTP servers,
//! Redis or configuration files; it talks to the outside through the ports.

pub mod entities;
pub mod errors;
pub mod json_feed;
pub mod ports;
pub mod services;
pub mod value_objects;
