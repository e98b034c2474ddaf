//! # Stack Capture
//!
//! Records the return addresses of the current thread's call stack, most
//! recent call first.
//!
//! Frames belonging to the capture machinery itself (the unwinder and the
//! capture function) are trimmed automatically when the unwinder reports
//! symbol start addresses. `skip` then drops that many further frames from
//! the caller's side, so a helper that wraps [`capture_current_stack`] passes
//! the number of its own frames sitting above the code it reports on. The
//! right value depends on the caller's call chain and inlining; calibrate it
//! there.
//!
//! At most [`MAX_FRAMES`] addresses are recorded. A failing unwinder yields an
//! empty stack.

use std::panic::{self, AssertUnwindSafe};

use backtrace::Frame;
use smallvec::SmallVec;
use tracing::warn;

use crate::types::Address;

/// Upper bound on recorded frames per capture.
pub const MAX_FRAMES: usize = 256;

/// Captured return addresses, most recent call first.
pub type CapturedStack = SmallVec<[Address; 64]>;

/// Capture the current thread's stack.
///
/// Never panics: if the unwinder fails the result is empty.
///
/// ```rust
/// use stackmark_core::capture::capture_current_stack;
///
/// let stack = capture_current_stack(0);
/// assert!(!stack.is_empty());
/// ```
#[inline(never)]
pub fn capture_current_stack(skip: usize) -> CapturedStack
{
    let mut raw = RawStack::new(capture_current_stack as *const () as usize, skip);

    let walked = panic::catch_unwind(AssertUnwindSafe(|| {
        backtrace::trace(|frame| raw.record(frame));
    }));
    if walked.is_err() {
        warn!("unwinder panicked, returning an empty stack");
        return CapturedStack::new();
    }

    raw.finish()
}

/// Capture the current thread's stack without taking the unwinder's lock.
///
/// For signal and crash handlers, where the interrupted thread may already
/// hold that lock.
///
/// # Safety
///
/// Must not run concurrently with another unsynchronized capture or with
/// anything else driving the unwinder unsynchronized.
#[inline(never)]
pub unsafe fn capture_current_stack_unsynchronized(skip: usize) -> CapturedStack
{
    let mut raw = RawStack::new(capture_current_stack_unsynchronized as *const () as usize, skip);

    let walked = panic::catch_unwind(AssertUnwindSafe(|| {
        backtrace::trace_unsynchronized(|frame| raw.record(frame));
    }));
    if walked.is_err() {
        return CapturedStack::new();
    }

    raw.finish()
}

struct RawStack
{
    addresses: CapturedStack,
    /// Symbol address of the capturing function.
    marker: usize,
    /// Number of leading frames that belong to the capture machinery.
    internal: Option<usize>,
    skip: usize,
}

impl RawStack
{
    fn new(marker: usize, skip: usize) -> Self
    {
        Self {
            addresses: CapturedStack::new(),
            marker,
            internal: None,
            skip,
        }
    }

    fn leading(&self) -> usize
    {
        self.internal.unwrap_or(0).saturating_add(self.skip)
    }

    /// Returns whether the walk should continue.
    fn record(&mut self, frame: &Frame) -> bool
    {
        if self.internal.is_none() && frame.symbol_address() as usize == self.marker {
            self.internal = Some(self.addresses.len() + 1);
        }

        self.addresses.push(Address::from(frame.ip() as usize));
        self.addresses.len() < self.leading().saturating_add(MAX_FRAMES)
    }

    fn finish(mut self) -> CapturedStack
    {
        // Without a marker our own frames cannot be told apart, so the whole
        // walk is left to the caller's skip count.
        let leading = self.leading().min(self.addresses.len());
        self.addresses.drain(..leading);
        self.addresses.truncate(MAX_FRAMES);
        self.addresses
    }
}
