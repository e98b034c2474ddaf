//! Symbol demangling utilities.
//!
//! Demangling is best effort and optional. A symbol is only handed to a
//! demangler when its prefix matches a known compiler mangling scheme, and any
//! failure (no demangler for the scheme, entry point unavailable, demangler
//! rejects the input) falls back to the raw name unchanged.
//!
//! ## Symbol Mangling
//!
//! - **Swift**: `$s`, `_$s`, `$S`, `_$S`, `$e`, `_$e`, `_T0`. Demangled by the
//!   Swift runtime's own `swift_demangle`, looked up once per process in the
//!   process's exported symbols. Absent when no Swift runtime is loaded.
//! - **Rust**: v0 (`_R`) and legacy (`_ZN…17h<hash>E`). Demangled in-process
//!   with `rustc-demangle`.
//! - **Itanium C++** (`_Z`): shares its prefix with legacy Rust. Legacy Rust
//!   symbols are demangled; plain C++ names are kept raw.

use once_cell::sync::OnceCell;
use rustc_demangle::try_demangle;
use tracing::debug;

/// Optional demangling capability.
///
/// Implementations return `None` whenever they cannot produce a better name;
/// they must never panic.
pub trait Demangle
{
    /// Try to turn `raw` into a human-readable name.
    fn attempt_demangle(&self, raw: &str) -> Option<String>;
}

/// Compiler mangling convention recognized from a symbol's prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManglingScheme
{
    /// Swift (`$s…`, `_T0…`).
    Swift,
    /// Rust v0 (`_R…`).
    RustV0,
    /// Itanium ABI (`_Z…`), used by C++ and legacy Rust.
    Itanium,
}

const SWIFT_PREFIXES: &[&str] = &["$s", "_$s", "$S", "_$S", "$e", "_$e", "_T0"];

/// Identify the mangling scheme of `raw`, if any.
///
/// Apple's `dladdr` strips the leading underscore the linker adds, so both
/// the stripped and unstripped spellings are accepted.
///
/// ```rust
/// use stackmark_core::demangle::{mangling_scheme, ManglingScheme};
///
/// assert_eq!(mangling_scheme("$s4MyApp0A5ClassC6methodyyF"), Some(ManglingScheme::Swift));
/// assert_eq!(mangling_scheme("_ZN4core3fmt5write17h0123456789abcdefE"), Some(ManglingScheme::Itanium));
/// assert_eq!(mangling_scheme("main"), None);
/// ```
pub fn mangling_scheme(raw: &str) -> Option<ManglingScheme>
{
    if SWIFT_PREFIXES.iter().any(|prefix| raw.starts_with(prefix)) {
        return Some(ManglingScheme::Swift);
    }

    let stripped = raw.strip_prefix('_').filter(|rest| rest.starts_with('_')).unwrap_or(raw);
    if stripped.starts_with("_R") {
        Some(ManglingScheme::RustV0)
    } else if stripped.starts_with("_Z") {
        Some(ManglingScheme::Itanium)
    } else {
        None
    }
}

/// Demangle `raw` with `demangler`, falling back to the raw name.
pub fn demangle_or_raw<D: Demangle + ?Sized>(demangler: &D, raw: &str) -> String
{
    demangler.attempt_demangle(raw).unwrap_or_else(|| raw.to_owned())
}

/// Demangler that never demangles.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDemangler;

impl Demangle for NoDemangler
{
    fn attempt_demangle(&self, _raw: &str) -> Option<String>
    {
        None
    }
}

/// In-process Rust demangler backed by `rustc-demangle`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustDemangler;

impl Demangle for RustDemangler
{
    fn attempt_demangle(&self, raw: &str) -> Option<String>
    {
        // alternate form drops the trailing hash and crate disambiguators
        try_demangle(raw).ok().map(|demangled| format!("{demangled:#}"))
    }
}

/// Swift demangler using the Swift runtime loaded in this process.
///
/// The `swift_demangle` entry point is resolved on first use and the result
/// (pointer or "unavailable") is cached for the life of the process.
/// Concurrent first callers block on the same resolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct SwiftRuntimeDemangler;

/// `char *swift_demangle(const char *, size_t, char *, size_t *, uint32_t)`
type SwiftDemangleFn =
    unsafe extern "C" fn(*const libc::c_char, usize, *mut libc::c_char, *mut usize, u32) -> *mut libc::c_char;

static SWIFT_DEMANGLE: OnceCell<Option<SwiftDemangleFn>> = OnceCell::new();

impl SwiftRuntimeDemangler
{
    /// Whether the Swift runtime's demangler could be resolved.
    pub fn is_available(&self) -> bool
    {
        swift_demangle_entry().is_some()
    }
}

impl Demangle for SwiftRuntimeDemangler
{
    fn attempt_demangle(&self, raw: &str) -> Option<String>
    {
        let entry = swift_demangle_entry()?;
        call_swift_demangle(entry, raw)
    }
}

fn swift_demangle_entry() -> Option<SwiftDemangleFn>
{
    *SWIFT_DEMANGLE.get_or_init(|| {
        let entry = resolve_swift_demangle();
        debug!(available = entry.is_some(), "resolved swift_demangle");
        entry
    })
}

#[cfg(unix)]
fn resolve_swift_demangle() -> Option<SwiftDemangleFn>
{
    const NAME: &[u8] = b"swift_demangle\0";

    // SAFETY: NAME is NUL terminated; RTLD_DEFAULT searches the global scope.
    let symbol = unsafe { libc::dlsym(libc::RTLD_DEFAULT, NAME.as_ptr().cast()) };
    if symbol.is_null() {
        return None;
    }

    // SAFETY: the exported swift_demangle has exactly this C signature.
    Some(unsafe { std::mem::transmute::<*mut libc::c_void, SwiftDemangleFn>(symbol) })
}

#[cfg(not(unix))]
fn resolve_swift_demangle() -> Option<SwiftDemangleFn>
{
    None
}

fn call_swift_demangle(entry: SwiftDemangleFn, raw: &str) -> Option<String>
{
    let mangled = std::ffi::CString::new(raw).ok()?;

    // SAFETY: with a null output buffer the runtime mallocs the result, which
    // we own and free below.
    let output = unsafe { entry(mangled.as_ptr(), raw.len(), std::ptr::null_mut(), std::ptr::null_mut(), 0) };
    if output.is_null() {
        return None;
    }

    // SAFETY: non-null results are NUL-terminated C strings.
    let demangled = unsafe { std::ffi::CStr::from_ptr(output) }.to_string_lossy().into_owned();
    // SAFETY: allocated by the runtime with malloc.
    unsafe { libc::free(output.cast()) };

    (!demangled.is_empty()).then_some(demangled)
}

/// Prefix-dispatching demangler used by default.
///
/// Swift symbols go to [`SwiftRuntimeDemangler`], Rust v0 and legacy Rust
/// symbols to [`RustDemangler`]. Unrecognized prefixes and C++ names are never
/// demangled.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultDemangler
{
    swift: SwiftRuntimeDemangler,
    rust: RustDemangler,
}

impl Demangle for DefaultDemangler
{
    fn attempt_demangle(&self, raw: &str) -> Option<String>
    {
        match mangling_scheme(raw)? {
            ManglingScheme::Swift => self.swift.attempt_demangle(raw),
            ManglingScheme::RustV0 => self.rust.attempt_demangle(raw),
            ManglingScheme::Itanium if has_legacy_rust_hash(raw) => self.rust.attempt_demangle(raw),
            ManglingScheme::Itanium => None,
        }
    }
}

/// Legacy Rust symbols end in a `17h<16 hex digits>E` path element.
fn has_legacy_rust_hash(raw: &str) -> bool
{
    raw.rfind("17h").is_some_and(|pos| {
        let tail = &raw.as_bytes()[pos + 3..];
        tail.len() >= 17 && tail[..16].iter().all(u8::is_ascii_hexdigit) && tail[16] == b'E'
    })
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_mangling_scheme_detection()
    {
        assert_eq!(mangling_scheme("_$s4MyApp3fooyyF"), Some(ManglingScheme::Swift));
        assert_eq!(mangling_scheme("_T0s5print"), Some(ManglingScheme::Swift));
        assert_eq!(mangling_scheme("_RNvCs1234_7mycrate3foo"), Some(ManglingScheme::RustV0));
        assert_eq!(mangling_scheme("__ZN3foo3barE"), Some(ManglingScheme::Itanium));
        assert_eq!(mangling_scheme("-[NSException raise]"), None);
        assert_eq!(mangling_scheme("_main"), None);
    }

    #[test]
    fn test_rust_legacy_symbol_is_demangled()
    {
        let raw = "_ZN4core3fmt5write17h0123456789abcdefE";
        let demangled = DefaultDemangler::default().attempt_demangle(raw);
        assert_eq!(demangled.as_deref(), Some("core::fmt::write"));
    }

    #[test]
    fn test_rust_v0_symbol_is_demangled()
    {
        let raw = "_RNvCs1234_7mycrate3foo";
        let demangled = DefaultDemangler::default().attempt_demangle(raw).unwrap();
        assert_eq!(demangled, "mycrate::foo");
    }

    #[test]
    fn test_plain_cpp_symbol_keeps_raw_name()
    {
        let raw = "_ZN3foo3barEv";
        assert_eq!(demangle_or_raw(&DefaultDemangler::default(), raw), raw);
        assert!(!has_legacy_rust_hash("_ZN3foo17hxyzE"));
    }

    #[test]
    fn test_unrecognized_prefix_is_not_demangled()
    {
        // would demangle if handed to rustc-demangle without the prefix gate
        assert_eq!(DefaultDemangler::default().attempt_demangle("main"), None);
        assert_eq!(demangle_or_raw(&DefaultDemangler::default(), "main"), "main");
    }

    #[test]
    fn test_swift_symbol_without_runtime_keeps_raw_name()
    {
        let raw = "$s4MyApp0A5ClassC6methodyyF";
        let name = demangle_or_raw(&DefaultDemangler::default(), raw);
        if SwiftRuntimeDemangler.is_available() {
            assert_ne!(name, raw);
        } else {
            assert_eq!(name, raw);
        }
    }

    #[test]
    fn test_swift_resolution_is_shared_across_threads()
    {
        let results: Vec<bool> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| SwiftRuntimeDemangler.is_available()))
                .collect();
            handles.into_iter().map(|handle| handle.join().unwrap()).collect()
        });
        assert!(results.windows(2).all(|pair| pair[0] == pair[1]));
    }

    #[test]
    fn test_no_demangler()
    {
        let raw = "_ZN4core3fmt5write17h0123456789abcdefE";
        assert_eq!(demangle_or_raw(&NoDemangler, raw), raw);
    }
}
