//! Loaded-image enumeration through `dl_iterate_phdr`.

use std::ffi::CStr;

use object::elf::{FileHeader64, PT_LOAD, PT_NOTE};
use object::Endianness;
use tracing::trace;

use super::elf::{build_id_bytes, code_bounds, gnu_build_id, LoadSegment};
use super::ImageSource;
use crate::codec::format_uuid_bytes;
use crate::types::{Address, BinaryImage, ImageFormat};

/// Name reported for objects the loader gives no path for (e.g. the vDSO).
const UNKNOWN_IMAGE: &str = "unknown";

/// Walks the ELF objects the dynamic loader has mapped into this process.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhdrImageSource;

struct Walk<'a>
{
    visit: &'a mut dyn FnMut(BinaryImage),
    first: bool,
}

impl ImageSource for PhdrImageSource
{
    fn for_each_image(&self, visit: &mut dyn FnMut(BinaryImage))
    {
        let mut walk = Walk { visit, first: true };
        // SAFETY: the callback only touches `walk` through the pointer it is
        // handed, and only for the duration of this call.
        unsafe {
            libc::dl_iterate_phdr(Some(callback), (&mut walk as *mut Walk<'_>).cast());
        }
    }
}

unsafe extern "C" fn callback(info: *mut libc::dl_phdr_info, _size: libc::size_t, data: *mut libc::c_void) -> libc::c_int
{
    let walk = &mut *data.cast::<Walk<'_>>();
    let info = &*info;
    let first = std::mem::replace(&mut walk.first, false);

    let name = image_name(info.dlpi_name, first);
    let headers: &[libc::Elf64_Phdr] = if info.dlpi_phdr.is_null() {
        &[]
    } else {
        std::slice::from_raw_parts(info.dlpi_phdr, usize::from(info.dlpi_phnum))
    };
    let bias = info.dlpi_addr;

    let segments = headers.iter().filter(|header| header.p_type == PT_LOAD).map(|header| LoadSegment {
        vaddr: header.p_vaddr,
        memsz: header.p_memsz,
        align: header.p_align,
        flags: header.p_flags,
    });
    let (vm_address, size) = code_bounds(segments).unwrap_or((0, 0));

    let uuid = headers
        .iter()
        .filter(|header| header.p_type == PT_NOTE)
        .find_map(|header| {
            let start = bias.wrapping_add(header.p_vaddr) as *const u8;
            let len = usize::try_from(header.p_filesz).ok()?;
            // PT_NOTE lies inside a mapped PT_LOAD segment.
            let notes = std::slice::from_raw_parts(start, len);
            gnu_build_id::<FileHeader64<Endianness>>(Endianness::default(), header.p_align, notes).and_then(build_id_bytes)
        })
        .map(|bytes| format_uuid_bytes(&bytes));

    let vm_address = Address::new(vm_address);
    (walk.visit)(BinaryImage {
        name,
        uuid,
        vm_address,
        address: Address::new(vm_address.value().wrapping_add(bias)),
        size,
        arch: Some(std::env::consts::ARCH.to_owned()),
        format: ImageFormat::Elf,
    });

    0
}

unsafe fn image_name(raw: *const libc::c_char, first: bool) -> String
{
    if !raw.is_null() && *raw != 0 {
        return CStr::from_ptr(raw).to_string_lossy().into_owned();
    }

    // The main executable comes first and carries an empty name.
    if first {
        if let Ok(path) = std::env::current_exe() {
            return path.to_string_lossy().into_owned();
        }
    }

    trace!("loaded object without a path");
    UNKNOWN_IMAGE.to_owned()
}
