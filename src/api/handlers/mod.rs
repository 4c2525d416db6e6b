//! REST API handlers organized by resource.

pub mod cep;
pub mod health;
pub mod infractions;

pub use cep::*;
pub use health::*;
pub use infractions::*;
