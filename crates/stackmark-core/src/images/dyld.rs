//! Loaded-image enumeration through the dyld image list.

use std::ffi::CStr;

use tracing::trace;

use super::{macho, ImageSource};
use crate::types::BinaryImage;

/// Walks the images dyld reports for the current process.
///
/// The list is read without a lock: an image unloaded mid-walk is reported
/// with a null header or name and skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct DyldImageSource;

impl ImageSource for DyldImageSource
{
    #[allow(deprecated)]
    fn for_each_image(&self, visit: &mut dyn FnMut(BinaryImage))
    {
        // SAFETY: dyld query with no preconditions.
        let count = unsafe { libc::_dyld_image_count() };
        for index in 0..count {
            // SAFETY: indices past the end return null, handled below.
            if let Some(image) = unsafe { image_at(index) } {
                visit(image);
            }
        }
    }
}

#[allow(deprecated)]
unsafe fn image_at(index: u32) -> Option<BinaryImage>
{
    let header = libc::_dyld_get_image_header(index);
    let name = libc::_dyld_get_image_name(index);
    if header.is_null() || name.is_null() {
        trace!(index, "dyld image vanished during enumeration");
        return None;
    }

    let name = CStr::from_ptr(name).to_string_lossy().into_owned();
    let slide = libc::_dyld_get_image_vmaddr_slide(index) as i64;

    let start = header.cast::<u8>();
    // SAFETY: dyld maps the header and its load-command table for as long as
    // the image stays loaded; `loaded_image_bytes` never asks past the length
    // the header announces.
    let bytes = macho::loaded_image_bytes(|len| unsafe { std::slice::from_raw_parts(start, len) });
    Some(macho::parse_image(bytes, slide, name))
}
