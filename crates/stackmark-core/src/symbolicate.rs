//! # Frame Symbolication
//!
//! Turns raw return addresses into [`StackFrame`]s using the dynamic loader's
//! own view of the process (`dladdr`): the owning image's path and load base,
//! and the nearest preceding exported symbol.
//!
//! This is deliberately shallow. There is no DWARF, no inlined frames and no
//! source lines; unexported functions come back without a name. Full
//! symbolication happens server side, keyed by the image identifiers the
//! [`ImageCatalog`](crate::images::ImageCatalog) reports.
//!
//! ## Example
//!
//! ```rust
//! use stackmark_core::config::ErrorTrackingConfig;
//! use stackmark_core::symbolicate::FrameSymbolicator;
//! use stackmark_core::types::Address;
//!
//! let symbolicator = FrameSymbolicator::new();
//! let frames = symbolicator.symbolicate(&[Address::new(0x10)], &ErrorTrackingConfig::default(), 0);
//! // Nothing is mapped at 0x10, so the frame is dropped.
//! assert!(frames.is_empty());
//! ```

use tracing::trace;

use crate::classify::is_in_app;
use crate::config::ErrorTrackingConfig;
use crate::demangle::{demangle_or_raw, DefaultDemangler, Demangle};
use crate::types::{Address, StackFrame};

/// What the loader knows about one address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAddress
{
    /// Path of the image containing the address.
    pub image_path: String,
    /// Load base of that image.
    pub image_base: Address,
    /// Raw name of the nearest preceding exported symbol.
    pub symbol_name: Option<String>,
    /// Start address of that symbol.
    pub symbol_address: Option<Address>,
}

/// Address-to-image lookup capability.
pub trait AddressResolver
{
    /// Look up `address`; `None` when no loaded image contains it.
    fn resolve(&self, address: Address) -> Option<ResolvedAddress>;
}

/// Resolver backed by `dladdr(3)`.
#[cfg(unix)]
#[derive(Debug, Clone, Copy, Default)]
pub struct DladdrResolver;

#[cfg(unix)]
impl AddressResolver for DladdrResolver
{
    fn resolve(&self, address: Address) -> Option<ResolvedAddress>
    {
        use std::ffi::CStr;

        let pointer = usize::try_from(address.value()).ok()? as *const libc::c_void;

        // SAFETY: dladdr only inspects loader bookkeeping; any address is
        // acceptable input.
        let mut info: libc::Dl_info = unsafe { std::mem::zeroed() };
        if unsafe { libc::dladdr(pointer, &mut info) } == 0 || info.dli_fname.is_null() {
            return None;
        }

        // SAFETY: non-null strings from dladdr are NUL terminated and live as
        // long as the image stays loaded.
        let image_path = unsafe { CStr::from_ptr(info.dli_fname) }.to_string_lossy().into_owned();
        let symbol_name = (!info.dli_sname.is_null())
            .then(|| unsafe { CStr::from_ptr(info.dli_sname) }.to_string_lossy().into_owned());
        let symbol_address = (!info.dli_saddr.is_null()).then(|| Address::from(info.dli_saddr as usize));

        Some(ResolvedAddress {
            image_path,
            image_base: Address::from(info.dli_fbase as usize),
            symbol_name,
            symbol_address,
        })
    }
}

/// Resolver that never resolves anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullResolver;

impl AddressResolver for NullResolver
{
    fn resolve(&self, _address: Address) -> Option<ResolvedAddress>
    {
        None
    }
}

/// The loader-backed resolver for the current target.
#[cfg(unix)]
pub type NativeResolver = DladdrResolver;
/// The loader-backed resolver for the current target.
#[cfg(not(unix))]
pub type NativeResolver = NullResolver;

/// Builds [`StackFrame`]s from raw addresses.
#[derive(Debug, Clone, Default)]
pub struct FrameSymbolicator<R = NativeResolver, D = DefaultDemangler>
{
    resolver: R,
    demangler: D,
}

impl FrameSymbolicator
{
    /// Symbolicator using the process loader and the default demangler.
    pub fn new() -> Self
    {
        Self::default()
    }
}

impl<R: AddressResolver, D: Demangle> FrameSymbolicator<R, D>
{
    /// Symbolicator with explicit capabilities.
    pub fn with_parts(resolver: R, demangler: D) -> Self
    {
        Self { resolver, demangler }
    }

    /// Symbolicate `addresses`, dropping the first `skip` entries.
    ///
    /// Order is preserved. Addresses no loaded image claims are dropped, so
    /// the result holds at most `addresses.len() - skip` frames.
    pub fn symbolicate(&self, addresses: &[Address], config: &ErrorTrackingConfig, skip: usize) -> Vec<StackFrame>
    {
        addresses
            .iter()
            .skip(skip)
            .filter_map(|address| self.symbolicate_address(*address, config))
            .collect()
    }

    /// Symbolicate a single address.
    pub fn symbolicate_address(&self, address: Address, config: &ErrorTrackingConfig) -> Option<StackFrame>
    {
        let Some(resolved) = self.resolver.resolve(address) else {
            trace!(%address, "address not in any loaded image");
            return None;
        };

        let module = module_name(&resolved.image_path).to_owned();
        let in_app = is_in_app(&module, config);
        let function = resolved
            .symbol_name
            .as_deref()
            .map(|raw| demangle_or_raw(&self.demangler, raw));

        Some(StackFrame {
            instruction_address: address,
            module: Some(module),
            package: Some(resolved.image_path),
            image_address: Some(resolved.image_base),
            in_app,
            function,
            symbol_address: resolved.symbol_address,
            filename: None,
            lineno: None,
        })
    }
}

/// Last path component of an image path.
pub fn module_name(path: &str) -> &str
{
    path.rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::config::ErrorTrackingConfigBuilder;
    use crate::demangle::NoDemangler;

    struct FakeResolver;

    impl AddressResolver for FakeResolver
    {
        fn resolve(&self, address: Address) -> Option<ResolvedAddress>
        {
            let (path, base, symbol) = match address.value() {
                0x1000..=0x1fff => ("/System/Library/Frameworks/Foundation.framework/Foundation", 0x1000, Some("_ZN4core3fmt5write17h0123456789abcdefE")),
                0x2000..=0x2fff => ("/Applications/MyApp.app/MyApp", 0x2000, None),
                _ => return None,
            };
            Some(ResolvedAddress {
                image_path: path.into(),
                image_base: Address::new(base),
                symbol_name: symbol.map(str::to_owned),
                symbol_address: symbol.map(|_| Address::new(base + 0x10)),
            })
        }
    }

    fn config() -> ErrorTrackingConfig
    {
        ErrorTrackingConfigBuilder::unseeded().include("MyApp").build()
    }

    #[test]
    fn test_frames_keep_order_and_drop_unresolved()
    {
        let symbolicator = FrameSymbolicator::with_parts(FakeResolver, DefaultDemangler::default());
        let addresses = [0x2004, 0x9999, 0x1040].map(Address::new);
        let frames = symbolicator.symbolicate(&addresses, &config(), 0);

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].instruction_address, Address::new(0x2004));
        assert_eq!(frames[0].module.as_deref(), Some("MyApp"));
        assert_eq!(frames[0].package.as_deref(), Some("/Applications/MyApp.app/MyApp"));
        assert_eq!(frames[0].image_address, Some(Address::new(0x2000)));
        assert!(frames[0].in_app);
        assert_eq!(frames[0].function, None);

        assert_eq!(frames[1].module.as_deref(), Some("Foundation"));
        assert!(!frames[1].in_app);
        assert_eq!(frames[1].function.as_deref(), Some("core::fmt::write"));
        assert_eq!(frames[1].symbol_offset(), Some(0x30));
    }

    #[test]
    fn test_skip_drops_leading_addresses()
    {
        let symbolicator = FrameSymbolicator::with_parts(FakeResolver, NoDemangler);
        let addresses = [0x1000, 0x1001, 0x2000].map(Address::new);
        let frames = symbolicator.symbolicate(&addresses, &config(), 2);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].instruction_address, Address::new(0x2000));

        assert!(symbolicator.symbolicate(&addresses, &config(), 10).is_empty());
    }

    #[test]
    fn test_raw_symbol_kept_without_demangler()
    {
        let symbolicator = FrameSymbolicator::with_parts(FakeResolver, NoDemangler);
        let frame = symbolicator.symbolicate_address(Address::new(0x1010), &config()).unwrap();
        assert_eq!(frame.function.as_deref(), Some("_ZN4core3fmt5write17h0123456789abcdefE"));
    }

    #[test]
    fn test_module_name()
    {
        assert_eq!(module_name("/usr/lib/libSystem.B.dylib"), "libSystem.B.dylib");
        assert_eq!(module_name("MyApp"), "MyApp");
        assert_eq!(module_name(""), "");
    }

    #[cfg(unix)]
    #[test]
    fn test_dladdr_resolves_libc_symbol()
    {
        let address = Address::from(libc::getpid as usize);
        let resolved = DladdrResolver.resolve(address).unwrap();

        assert!(!resolved.image_path.is_empty());
        assert!(resolved.image_base <= address);
        assert!(resolved.symbol_name.as_deref().is_some_and(|name| name.contains("getpid")));
    }

    #[cfg(unix)]
    #[test]
    fn test_dladdr_rejects_null()
    {
        assert_eq!(DladdrResolver.resolve(Address::ZERO), None);
    }
}
