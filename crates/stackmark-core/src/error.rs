//! # Error Types
//!
//! Errors for the auxiliary APIs of this crate.
//!
//! The capture, symbolication, classification and catalog operations never
//! fail: they degrade to partial or empty output, because they run at the
//! moment of a crash and must not become a second point of failure. The
//! variants below are only produced by the surrounding APIs (reading an image
//! file from disk, the install registry, text parsing of user input).
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.

use thiserror::Error;

/// Main error type for stackmark operations
///
/// ## Error Categories
///
/// 1. **Input errors**: InvalidArgument
/// 2. **Image errors**: UnsupportedFormat, MalformedImage
/// 3. **Registry errors**: AlreadyInstalled
/// 4. **I/O errors**: Io
#[derive(Error, Debug)]
pub enum StackmarkError
{
    /// Invalid argument passed to a stackmark function
    ///
    /// Examples:
    /// - A string that is not a hexadecimal address
    /// - An empty hook key
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The bytes are not an image format we know how to read
    ///
    /// Only thin Mach-O and ELF files are recognized. Universal ("fat")
    /// binaries, PE files and archives end up here.
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// The image header or load-command table could not be parsed
    #[error("Malformed image: {0}")]
    MalformedImage(String),

    /// A hook key is already installed by a different owner
    ///
    /// Installing the same key twice from the same owner is a no-op; this
    /// error is the conflict signal for a second, competing installer.
    #[error("Hook {key:?} is already installed by owner {owner}")]
    AlreadyInstalled
    {
        /// Key of the hook that was requested
        key: String,
        /// Owner currently holding the hook
        owner: u64,
    },

    /// I/O error (for file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for `Result<T, StackmarkError>`
///
/// ```rust
/// use stackmark_core::error::Result;
/// fn foo() -> Result<()>
/// {
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, StackmarkError>;
