//! # In-App Classification
//!
//! Decides whether a module belongs to the host application.
//!
//! Matching is by case-sensitive prefix on the module's short name (the last
//! path component of the image), evaluated in priority order; the first rule
//! that matches wins:
//!
//! 1. `in_app_includes` → in-app
//! 2. `in_app_excludes` → not in-app
//! 3. [`SYSTEM_PREFIXES`] → not in-app
//! 4. `in_app_by_default`
//!
//! ## Example
//!
//! ```rust
//! use stackmark_core::classify::is_in_app;
//! use stackmark_core::config::ErrorTrackingConfigBuilder;
//!
//! let config = ErrorTrackingConfigBuilder::unseeded()
//!     .include("MyApp")
//!     .exclude("Alamofire")
//!     .build();
//!
//! assert!(is_in_app("MyApp", &config));
//! assert!(is_in_app("MyAppKit", &config));
//! assert!(!is_in_app("Alamofire", &config));
//! assert!(!is_in_app("Foundation", &config));
//! assert!(is_in_app("SomeRandomLib", &config));
//! ```

use crate::config::ErrorTrackingConfig;

/// Module-name prefixes of platform libraries that are never in-app.
///
/// UI toolkits, core OS services, graphics, networking and security
/// frameworks, the Swift runtime, and the dynamic-linker support libraries on
/// Apple platforms and glibc-based Linux.
pub const SYSTEM_PREFIXES: &[&str] = &[
    // Apple frameworks
    "Foundation",
    "UIKit",
    "UIKitCore",
    "CoreFoundation",
    "CoreGraphics",
    "QuartzCore",
    "Security",
    "SystemConfiguration",
    "CFNetwork",
    "CoreData",
    "CoreLocation",
    "AVFoundation",
    "Metal",
    "MetalKit",
    "SwiftUI",
    "Combine",
    "AppKit",
    "IOKit",
    "WebKit",
    "GraphicsServices",
    // Apple runtime and loader
    "libswift",
    "libobjc",
    "libsystem_",
    "libdispatch.dylib",
    "libdyld.dylib",
    "dyld",
    // glibc and the Linux loader
    "libc.so",
    "libc-",
    "libm.so",
    "libpthread",
    "libdl.so",
    "librt.so",
    "libgcc_s",
    "libstdc++",
    "ld-linux",
    "linux-vdso",
];

/// Classify `module` according to `config`.
///
/// Pure function; never fails.
pub fn is_in_app(module: &str, config: &ErrorTrackingConfig) -> bool
{
    if matches_any(module, config.in_app_includes()) {
        return true;
    }

    if matches_any(module, config.in_app_excludes()) {
        return false;
    }

    if is_system_module(module) {
        return false;
    }

    config.in_app_by_default()
}

/// Whether `module` starts with a known platform-library prefix.
pub fn is_system_module(module: &str) -> bool
{
    SYSTEM_PREFIXES.iter().any(|prefix| module.starts_with(prefix))
}

fn matches_any<S: AsRef<str>>(module: &str, prefixes: &[S]) -> bool
{
    prefixes.iter().any(|prefix| module.starts_with(prefix.as_ref()))
}
