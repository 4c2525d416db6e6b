//! Domain models for environmental infraction notices
//!
//! The record itself, its validated creation payload, signature images and
//! the enumerated values the paper form allows.

mod error;
mod record;
pub(crate) mod signature_image;
mod types;

pub use error::*;
pub use record::*;
pub use signature_image::{SignatureImage, PNG_DATA_URL_PREFIX};
pub use types::*;
