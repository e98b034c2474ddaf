//! # Error Tracker
//!
//! Entry point tying configuration, capture, symbolication and the image
//! catalog together for an error-reporting integration.

use tracing::debug;

use crate::capture::capture_current_stack;
use crate::config::ErrorTrackingConfig;
use crate::demangle::{DefaultDemangler, Demangle};
use crate::images::{ImageCatalog, ImageSource, NativeImageSource};
use crate::symbolicate::{AddressResolver, FrameSymbolicator, NativeResolver};
use crate::trace_text::parse_stack_text;
use crate::types::{Address, BinaryImage, StackFrame};

/// Captures and describes call stacks for one SDK instance.
///
/// ```rust
/// use stackmark_core::config::ErrorTrackingConfig;
/// use stackmark_core::ErrorTracker;
///
/// let tracker = ErrorTracker::new(ErrorTrackingConfig::default());
/// let frames = tracker.capture_frames(0);
/// let images = tracker.debug_images(&frames);
/// assert!(images.len() <= frames.len());
/// ```
#[derive(Debug, Clone)]
pub struct ErrorTracker<S = NativeImageSource, R = NativeResolver, D = DefaultDemangler>
{
    config: ErrorTrackingConfig,
    symbolicator: FrameSymbolicator<R, D>,
    catalog: ImageCatalog<S>,
}

impl ErrorTracker
{
    /// Tracker over the current process.
    pub fn new(config: ErrorTrackingConfig) -> Self
    {
        Self::from_parts(config, FrameSymbolicator::new(), ImageCatalog::new())
    }
}

impl<S, R, D> ErrorTracker<S, R, D>
where
    S: ImageSource,
    R: AddressResolver,
    D: Demangle,
{
    /// Tracker with explicit components.
    pub fn from_parts(config: ErrorTrackingConfig, symbolicator: FrameSymbolicator<R, D>, catalog: ImageCatalog<S>) -> Self
    {
        Self {
            config,
            symbolicator,
            catalog,
        }
    }

    /// The classification settings in use.
    pub fn config(&self) -> &ErrorTrackingConfig
    {
        &self.config
    }

    /// Capture and symbolicate the calling thread's stack.
    ///
    /// The first frame is the caller of this method; `skip` drops further
    /// frames above it.
    #[inline(never)]
    pub fn capture_frames(&self, skip: usize) -> Vec<StackFrame>
    {
        // this method's own frame
        let stack = capture_current_stack(skip.saturating_add(1));
        let frames = self.symbolicator.symbolicate(&stack, &self.config, 0);
        debug!(captured = stack.len(), symbolicated = frames.len(), "captured stack");
        frames
    }

    /// Symbolicate addresses captured elsewhere, dropping the first `skip`.
    pub fn symbolicate(&self, addresses: &[Address], skip: usize) -> Vec<StackFrame>
    {
        self.symbolicator.symbolicate(addresses, &self.config, skip)
    }

    /// Frames from pre-formatted stack text.
    pub fn parse_stack_text(&self, text: &str) -> Vec<StackFrame>
    {
        parse_stack_text(text, &self.config)
    }

    /// The image table to send alongside `frames`.
    pub fn debug_images(&self, frames: &[StackFrame]) -> Vec<BinaryImage>
    {
        self.catalog.images_for_frames(frames)
    }

    /// Every loaded image.
    pub fn loaded_images(&self) -> Vec<BinaryImage>
    {
        self.catalog.list_loaded_images()
    }
}
