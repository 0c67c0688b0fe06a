//! Core types and traits for the catalog kernel.
//!
//! Domain types derive serde so any transport layer can expose them as JSON.

mod audit;
mod clock;
mod filter;
mod metrics;
mod product;
mod traits;
mod user;

pub use audit::*;
pub use clock::*;
pub use filter::*;
pub use metrics::*;
pub use product::*;
pub use traits::*;
pub use user::*;
