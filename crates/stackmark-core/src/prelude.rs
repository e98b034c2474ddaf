//! Common module for library exports

pub use crate::capture::{capture_current_stack, CapturedStack, MAX_FRAMES};
pub use crate::classify::is_in_app;
pub use crate::config::{ErrorTrackingConfig, ErrorTrackingConfigBuilder, HostIdentity};
pub use crate::demangle::{DefaultDemangler, Demangle};
pub use crate::error::{Result, StackmarkError};
pub use crate::images::{ImageCatalog, ImageSource, StaticImageSource};
pub use crate::registry::InstallRegistry;
pub use crate::symbolicate::{AddressResolver, FrameSymbolicator, ResolvedAddress};
pub use crate::tracker::ErrorTracker;
pub use crate::types::{Address, BinaryImage, ImageFormat, StackFrame};
