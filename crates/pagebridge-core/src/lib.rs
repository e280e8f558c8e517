//! pagebridge-core: builder-agnostic page layout representation.
//!
//! This crate provides the neutral layout that page builder adapters convert
//! to and from, the [`BuilderAdapter`] contract they implement, and the
//! fidelity types that report what a conversion could not carry over.

mod attrs;
pub mod builder;
mod fidelity;
mod layout;
pub mod markup;
mod page;
mod traits;

pub use attrs::*;
pub use fidelity::*;
pub use layout::*;
pub use page::*;
pub use traits::*;
