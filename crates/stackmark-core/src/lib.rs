//! # stackmark-core
//!
//! Crash-time stack capture and symbolication for error reporting.
//!
//! This crate turns the current call stack into a payload a symbolication
//! service can work with:
//! - Stack capture: raw return addresses, bounded and panic-free
//! - Frame symbolication: owning image, nearest exported symbol, demangled
//!   names and in-app classification via the dynamic loader (`dladdr`)
//! - Image catalog: build ids and code-segment bounds of every loaded image
//!   (Mach-O via dyld, ELF via `dl_iterate_phdr`)
//! - Address codec: canonical hex and UUID text for the wire format
//!
//! Nothing on the capture path returns an error. Unresolvable addresses are
//! dropped, images without a build id or code segment are reported with empty
//! fields, and an unusable unwinder yields an empty stack.
//!
//! ## Platform Support
//!
//! - **macOS / iOS**: dyld image list, `dladdr`, Swift runtime demangler
//! - **Linux / Android (64-bit)**: `dl_iterate_phdr`, `dladdr`
//! - **Elsewhere**: capture works; symbolication and the catalog report
//!   nothing
//!
//! ## Why unsafe code is needed
//!
//! The loader, the unwinder and the Swift runtime are only reachable through
//! C APIs handing out raw pointers into loader-owned memory. Those calls are
//! wrapped so that everything past them operates on safe slices and owned
//! values.

#![allow(unsafe_code)] // Required for the dyld, dl_iterate_phdr and dladdr APIs

pub mod capture;
pub mod classify;
pub mod codec;
pub mod config;
pub mod demangle;
pub mod error;
pub mod images;
pub mod prelude;
pub mod registry;
pub mod symbolicate;
pub mod trace_text;
pub mod tracker;
pub mod types;

// Re-export commonly used types
pub use config::{ErrorTrackingConfig, ErrorTrackingConfigBuilder, HostIdentity};
pub use error::{Result, StackmarkError};
pub use images::ImageCatalog;
pub use symbolicate::FrameSymbolicator;
pub use tracker::ErrorTracker;
pub use types::{Address, BinaryImage, StackFrame};
