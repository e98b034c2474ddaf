//! Reading binary images from disk.
//!
//! Useful for checking what a live catalog will report for a binary before
//! shipping it, or for matching uploaded debug files by build id. Files are
//! read at their link-time addresses, i.e. with a slide of zero.

use std::fs;
use std::path::Path;

use object::{Architecture, FileKind, Object, ObjectSegment, SegmentFlags};

use super::elf::{build_id_bytes, code_bounds, LoadSegment};
use super::macho;
use crate::codec::format_uuid_bytes;
use crate::error::{Result, StackmarkError};
use crate::types::{Address, BinaryImage, ImageFormat};

/// Read the image at `path`.
///
/// Thin Mach-O and ELF files of either width are supported; anything else
/// (fat binaries, PE, archives) is [`StackmarkError::UnsupportedFormat`].
pub fn read_image_file(path: impl AsRef<Path>) -> Result<BinaryImage>
{
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    parse_image_bytes(&bytes, path.to_string_lossy().into_owned())
}

/// Parse an in-memory copy of an image file.
pub fn parse_image_bytes(bytes: &[u8], name: String) -> Result<BinaryImage>
{
    let kind = FileKind::parse(bytes).map_err(|err| StackmarkError::UnsupportedFormat(format!("{name}: {err}")))?;

    match kind {
        FileKind::MachO32 | FileKind::MachO64 => Ok(macho::parse_image(bytes, 0, name)),
        FileKind::Elf32 | FileKind::Elf64 => parse_elf(bytes, name),
        other => Err(StackmarkError::UnsupportedFormat(format!("{name}: {other:?}"))),
    }
}

fn parse_elf(bytes: &[u8], name: String) -> Result<BinaryImage>
{
    let file = object::File::parse(bytes).map_err(|err| StackmarkError::MalformedImage(format!("{name}: {err}")))?;

    let segments = file.segments().map(|segment| LoadSegment {
        vaddr: segment.address(),
        memsz: segment.size(),
        align: segment.align(),
        flags: match segment.flags() {
            SegmentFlags::Elf { p_flags } => p_flags,
            _ => 0,
        },
    });
    let (vm_address, size) = code_bounds(segments).unwrap_or((0, 0));

    let uuid = file
        .build_id()
        .map_err(|err| StackmarkError::MalformedImage(format!("{name}: {err}")))?
        .and_then(build_id_bytes)
        .map(|bytes| format_uuid_bytes(&bytes));

    let vm_address = Address::new(vm_address);
    Ok(BinaryImage {
        name,
        uuid,
        vm_address,
        address: vm_address,
        size,
        arch: elf_arch_name(file.architecture()).map(str::to_owned),
        format: ImageFormat::Elf,
    })
}

fn elf_arch_name(architecture: Architecture) -> Option<&'static str>
{
    match architecture {
        Architecture::Aarch64 => Some("aarch64"),
        Architecture::X86_64 => Some("x86_64"),
        Architecture::I386 => Some("x86"),
        Architecture::Arm => Some("arm"),
        _ => None,
    }
}
