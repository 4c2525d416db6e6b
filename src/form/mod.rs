//! Infraction form: the editable draft, its witness rows and request
//! sequencing for out-of-order responses.

mod draft;
mod sequence;
mod witnesses;

pub use draft::*;
pub use sequence::*;
pub use witnesses::*;
