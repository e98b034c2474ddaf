//! # Types
//!
//! Value types produced by this crate.
//!
//! Every entity is constructed fresh per call and owned by the caller. A
//! frame refers to its image only through copied values (`image_address`,
//! `module`), never through a live reference into loader state.

pub mod address;
pub mod frame;
pub mod image;

// Re-export all public types
pub use address::Address;
pub use frame::{StackFrame, PLATFORM};
pub use image::{BinaryImage, ImageFormat};
