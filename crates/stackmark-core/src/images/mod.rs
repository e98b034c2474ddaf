//! # Image Catalog
//!
//! Enumerates the binary images loaded into the process and reports the
//! identifiers a symbolication service needs to match frames to debug files:
//! build id, link-time and runtime addresses of the code segment, and size.
//!
//! Where the images come from is abstracted behind [`ImageSource`]:
//!
//! - **Apple platforms**: [`DyldImageSource`] walks the dyld image list and
//!   parses each Mach-O header in place.
//! - **Linux / Android (64-bit)**: [`PhdrImageSource`] walks
//!   `dl_iterate_phdr` and reports ELF images.
//! - **Elsewhere**: [`EmptyImageSource`] reports nothing.
//! - **Tests and offline tooling**: [`StaticImageSource`] serves images from
//!   in-memory buffers.
//!
//! Every call takes a fresh snapshot of the loader state. Images that unload
//! between stack capture and image-table assembly are simply absent from the
//! result.

#[cfg(target_vendor = "apple")]
mod dyld;
pub mod elf;
pub mod file;
pub mod macho;
#[cfg(all(any(target_os = "linux", target_os = "android"), target_pointer_width = "64"))]
mod phdr;

use std::collections::HashSet;

use tracing::debug;

use crate::codec::parse_hex;
use crate::types::{BinaryImage, StackFrame};

#[cfg(target_vendor = "apple")]
pub use dyld::DyldImageSource;
#[cfg(all(any(target_os = "linux", target_os = "android"), target_pointer_width = "64"))]
pub use phdr::PhdrImageSource;

/// The loader walk for the current target.
#[cfg(target_vendor = "apple")]
pub type NativeImageSource = DyldImageSource;
/// The loader walk for the current target.
#[cfg(all(any(target_os = "linux", target_os = "android"), target_pointer_width = "64"))]
pub type NativeImageSource = PhdrImageSource;
/// The loader walk for the current target.
#[cfg(not(any(
    target_vendor = "apple",
    all(any(target_os = "linux", target_os = "android"), target_pointer_width = "64")
)))]
pub type NativeImageSource = EmptyImageSource;

/// Something that can enumerate loaded images.
pub trait ImageSource
{
    /// Call `visit` once per image, in loader order.
    fn for_each_image(&self, visit: &mut dyn FnMut(BinaryImage));
}

/// Source that knows no images.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyImageSource;

impl ImageSource for EmptyImageSource
{
    fn for_each_image(&self, _visit: &mut dyn FnMut(BinaryImage)) {}
}

#[derive(Debug, Clone)]
enum StaticImage
{
    MachO
    {
        bytes: Vec<u8>,
        slide: i64,
        name: String,
    },
    Parsed(BinaryImage),
}

/// Source serving a fixed list of images.
///
/// Mach-O buffers are parsed on every walk, exactly as a live image would
/// be.
///
/// ```rust
/// use stackmark_core::images::{ImageCatalog, StaticImageSource};
///
/// let source = StaticImageSource::new().with_macho(vec![0u8; 4], 0x4000, "libbogus.dylib");
/// let catalog = ImageCatalog::with_source(source);
/// assert_eq!(catalog.find_images(["0x4000"]).len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticImageSource
{
    images: Vec<StaticImage>,
}

impl StaticImageSource
{
    /// Empty source.
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Add a Mach-O image given its header and load commands.
    #[must_use]
    pub fn with_macho(mut self, bytes: Vec<u8>, slide: i64, name: impl Into<String>) -> Self
    {
        self.images.push(StaticImage::MachO {
            bytes,
            slide,
            name: name.into(),
        });
        self
    }

    /// Add an already parsed image.
    #[must_use]
    pub fn with_image(mut self, image: BinaryImage) -> Self
    {
        self.images.push(StaticImage::Parsed(image));
        self
    }
}

impl ImageSource for StaticImageSource
{
    fn for_each_image(&self, visit: &mut dyn FnMut(BinaryImage))
    {
        for image in &self.images {
            match image {
                StaticImage::MachO { bytes, slide, name } => {
                    let mapped = macho::loaded_image_bytes(|len| bytes.get(..len).unwrap_or(bytes.as_slice()));
                    visit(macho::parse_image(mapped, *slide, name.clone()));
                }
                StaticImage::Parsed(image) => visit(image.clone()),
            }
        }
    }
}

/// Catalog of loaded images.
#[derive(Debug, Clone, Default)]
pub struct ImageCatalog<S = NativeImageSource>
{
    source: S,
}

impl ImageCatalog
{
    /// Catalog over the current process's loader.
    pub fn new() -> Self
    {
        Self::default()
    }
}

impl<S: ImageSource> ImageCatalog<S>
{
    /// Catalog over an arbitrary source.
    pub fn with_source(source: S) -> Self
    {
        Self { source }
    }

    /// One record per loaded image, in loader order.
    pub fn list_loaded_images(&self) -> Vec<BinaryImage>
    {
        let mut images = Vec::new();
        self.source.for_each_image(&mut |image| images.push(image));
        debug!(count = images.len(), "listed loaded images");
        images
    }

    /// Images whose runtime `address` is one of `addresses`.
    ///
    /// Addresses are hex text with an optional `0x` prefix; malformed entries
    /// are ignored. An image is reported once per loader entry, however many
    /// times its address appears in the input.
    pub fn find_images<I, T>(&self, addresses: I) -> Vec<BinaryImage>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let wanted: HashSet<u64> = addresses.into_iter().filter_map(|text| parse_hex(text.as_ref())).collect();
        self.find_by_address(&wanted)
    }

    /// Debug images referenced by `frames`.
    ///
    /// Frames without an image address contribute nothing. No loader walk
    /// happens when no frame references an image.
    pub fn images_for_frames(&self, frames: &[StackFrame]) -> Vec<BinaryImage>
    {
        let wanted: HashSet<u64> = frames
            .iter()
            .filter_map(|frame| frame.image_address)
            .map(|address| address.value())
            .collect();
        self.find_by_address(&wanted)
    }

    fn find_by_address(&self, wanted: &HashSet<u64>) -> Vec<BinaryImage>
    {
        if wanted.is_empty() {
            return Vec::new();
        }

        let mut images = Vec::new();
        self.source.for_each_image(&mut |image| {
            if wanted.contains(&image.address.value()) {
                images.push(image);
            }
        });
        images
    }
}

#[cfg(test)]
mod tests
{
    use std::cell::Cell;

    use super::*;
    use crate::types::{Address, ImageFormat};

    fn image(name: &str, address: u64) -> BinaryImage
    {
        BinaryImage {
            name: name.into(),
            uuid: None,
            vm_address: Address::ZERO,
            address: Address::new(address),
            size: 0x1000,
            arch: None,
            format: ImageFormat::MachO,
        }
    }

    fn catalog() -> ImageCatalog<StaticImageSource>
    {
        ImageCatalog::with_source(
            StaticImageSource::new()
                .with_image(image("A", 0x1000))
                .with_image(image("B", 0x2000))
                .with_image(image("C", 0x3000)),
        )
    }

    #[test]
    fn test_unknown_magic_is_still_listed()
    {
        let catalog = ImageCatalog::with_source(
            StaticImageSource::new()
                .with_macho(vec![0xde, 0xad, 0xbe, 0xef, 1, 2, 3, 4], 0x7000, "/usr/lib/libodd.dylib")
                .with_image(image("B", 0x2000)),
        );

        let images = catalog.list_loaded_images();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].name, "/usr/lib/libodd.dylib");
        assert_eq!(images[0].address, Address::new(0x7000));
        assert_eq!(images[0].size, 0);

        let found = catalog.find_images(["0x7000"]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "/usr/lib/libodd.dylib");
    }

    struct CountingSource(Cell<usize>);

    impl ImageSource for CountingSource
    {
        fn for_each_image(&self, visit: &mut dyn FnMut(BinaryImage))
        {
            self.0.set(self.0.get() + 1);
            visit(image("A", 0x1000));
        }
    }

    #[test]
    fn test_find_images_matches_exact_address()
    {
        let found = catalog().find_images(["0x2000"]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "B");
    }

    #[test]
    fn test_find_images_accepts_prefix_variants_and_drops_garbage()
    {
        let found = catalog().find_images(["1000", "0X3000", "nope", "0x2001"]);
        let names: Vec<_> = found.iter().map(|image| image.name.as_str()).collect();
        assert_eq!(names, ["A", "C"]);
    }

    #[test]
    fn test_list_preserves_loader_order()
    {
        let names: Vec<_> = catalog().list_loaded_images().into_iter().map(|image| image.name).collect();
        assert_eq!(names, ["A", "B", "C"]);
    }

    #[test]
    fn test_images_for_frames()
    {
        let mut frame = StackFrame::bare(Address::new(0x3010));
        frame.image_address = Some(Address::new(0x3000));
        let frames = [frame.clone(), frame, StackFrame::bare(Address::new(0x10))];

        let found = catalog().images_for_frames(&frames);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "C");
    }

    #[test]
    fn test_empty_query_skips_loader_walk()
    {
        let catalog = ImageCatalog::with_source(CountingSource(Cell::new(0)));
        assert!(catalog.images_for_frames(&[StackFrame::bare(Address::new(1))]).is_empty());
        assert!(catalog.find_images(["zz"]).is_empty());
        assert_eq!(catalog.source.0.get(), 0);

        assert_eq!(catalog.find_images(["0x1000"]).len(), 1);
        assert_eq!(catalog.source.0.get(), 1);
    }

    #[cfg(any(target_vendor = "apple", all(target_os = "linux", target_pointer_width = "64")))]
    #[test]
    fn test_native_catalog_reports_this_executable()
    {
        let images = ImageCatalog::new().list_loaded_images();
        assert!(!images.is_empty());

        let exe = std::env::current_exe().unwrap();
        let exe_name = exe.file_name().unwrap().to_string_lossy().into_owned();
        let main = images.iter().find(|image| image.name.ends_with(&exe_name)).unwrap();
        assert!(main.size > 0);
        assert!(!main.address.is_null());
    }
}
