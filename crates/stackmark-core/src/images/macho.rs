//! Mach-O header and load-command parsing.
//!
//! Operates on a byte slice covering the image header and its load-command
//! table, so the same code serves live images (dyld hands us a header
//! pointer), files read from disk and synthetic buffers. Only the fields the
//! catalog needs are read: the build UUID, the `__TEXT` segment bounds and the
//! CPU type.

use std::mem;

use object::macho::{
    MachHeader32, MachHeader64, CPU_SUBTYPE_ARM64E, CPU_SUBTYPE_ARM_V7, CPU_SUBTYPE_ARM_V7S, CPU_SUBTYPE_MASK,
    CPU_TYPE_ARM, CPU_TYPE_ARM64, CPU_TYPE_X86, CPU_TYPE_X86_64, MH_CIGAM, MH_CIGAM_64, MH_MAGIC, MH_MAGIC_64,
};
use object::read::macho::{MachHeader, Segment};
use object::Endianness;
use tracing::debug;

use crate::codec::format_uuid_bytes;
use crate::types::{Address, BinaryImage, ImageFormat};

/// Bytes needed to tell the header width from the magic.
pub const MAGIC_LEN: usize = 4;
const TEXT_SEGMENT: &[u8] = b"__TEXT";

/// Header width announced by the magic. Byte order is left to `object`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Width
{
    Bits32,
    Bits64,
}

impl Width
{
    fn detect(bytes: &[u8]) -> Option<Self>
    {
        let magic: [u8; MAGIC_LEN] = bytes.get(..MAGIC_LEN)?.try_into().ok()?;
        match u32::from_be_bytes(magic) {
            MH_MAGIC | MH_CIGAM => Some(Self::Bits32),
            MH_MAGIC_64 | MH_CIGAM_64 => Some(Self::Bits64),
            _ => None,
        }
    }

    fn header_size(self) -> usize
    {
        match self {
            Self::Bits32 => mem::size_of::<MachHeader32<Endianness>>(),
            Self::Bits64 => mem::size_of::<MachHeader64<Endianness>>(),
        }
    }
}

/// Whether `bytes` starts with a thin Mach-O magic of either width or order.
pub fn is_macho(bytes: &[u8]) -> bool
{
    Width::detect(bytes).is_some()
}

/// Size of the fixed header announced by the magic at the start of `bytes`.
pub fn header_size(bytes: &[u8]) -> Option<usize>
{
    Width::detect(bytes).map(Width::header_size)
}

/// Number of bytes spanned by the header plus its load-command table.
///
/// `header` must cover at least [`header_size`] bytes.
pub fn mapped_len(header: &[u8]) -> Option<usize>
{
    match Width::detect(header)? {
        Width::Bits32 => commands_end::<MachHeader32<Endianness>>(header),
        Width::Bits64 => commands_end::<MachHeader64<Endianness>>(header),
    }
}

fn commands_end<Mach>(bytes: &[u8]) -> Option<usize>
where
    Mach: MachHeader<Endian = Endianness>,
{
    let header = Mach::parse(bytes, 0).ok()?;
    let endian = header.endian().ok()?;
    let sizeofcmds = usize::try_from(header.sizeofcmds(endian)).ok()?;
    mem::size_of::<Mach>().checked_add(sizeofcmds)
}

/// The bytes of a mapped image worth handing to [`parse_image`].
///
/// `read(n)` returns the first `n` bytes at the image header. The magic is
/// read first, then the fixed header, then the whole command table, so a
/// header is never read past what it announces. An unknown magic or an
/// unreadable header yields the shorter prefix, which still parses into a
/// record.
pub fn loaded_image_bytes<'a>(read: impl Fn(usize) -> &'a [u8]) -> &'a [u8]
{
    let magic = read(MAGIC_LEN);
    let Some(size) = header_size(magic) else {
        return magic;
    };
    let fixed = read(size);
    mapped_len(fixed).map_or(fixed, |len| read(len))
}

/// Map a header's `cputype`/`cpusubtype` to the conventional architecture name.
pub fn arch_name(cputype: u32, cpusubtype: u32) -> Option<&'static str>
{
    let subtype = cpusubtype & !CPU_SUBTYPE_MASK;
    match cputype {
        CPU_TYPE_ARM64 if subtype == CPU_SUBTYPE_ARM64E => Some("arm64e"),
        CPU_TYPE_ARM64 => Some("arm64"),
        CPU_TYPE_X86_64 => Some("x86_64"),
        CPU_TYPE_X86 => Some("x86"),
        CPU_TYPE_ARM if subtype == CPU_SUBTYPE_ARM_V7 => Some("armv7"),
        CPU_TYPE_ARM if subtype == CPU_SUBTYPE_ARM_V7S => Some("armv7s"),
        CPU_TYPE_ARM => Some("arm"),
        _ => None,
    }
}

/// Parse one Mach-O image into a [`BinaryImage`].
///
/// `bytes` starts at the image header. `slide` is the loader-reported offset
/// between link-time and runtime addresses.
///
/// A record is always produced: an unknown magic, a missing `LC_UUID`, a
/// missing `__TEXT` segment or a broken command table only leave the
/// corresponding fields empty. Without `__TEXT`, `vm_address` and `size` are
/// zero and `address` is the slide itself.
///
/// ```rust
/// use stackmark_core::images::macho::parse_image;
///
/// let image = parse_image(&[0u8; 4], 0x4000, "/usr/lib/libbogus.dylib");
/// assert_eq!(image.uuid, None);
/// assert_eq!(image.size, 0);
/// assert_eq!(image.address.value(), 0x4000);
/// ```
pub fn parse_image(bytes: &[u8], slide: i64, name: impl Into<String>) -> BinaryImage
{
    let mut image = BinaryImage {
        name: name.into(),
        uuid: None,
        vm_address: Address::ZERO,
        address: Address::ZERO.slid_by(slide),
        size: 0,
        arch: None,
        format: ImageFormat::MachO,
    };

    let text = match Width::detect(bytes) {
        Some(Width::Bits32) => read_commands::<MachHeader32<Endianness>>(bytes, &mut image),
        Some(Width::Bits64) => read_commands::<MachHeader64<Endianness>>(bytes, &mut image),
        None => {
            debug!(image = %image.name, "not a Mach-O header");
            None
        }
    };

    if let Some((vm_address, size)) = text {
        image.vm_address = Address::new(vm_address);
        image.address = image.vm_address.slid_by(slide);
        image.size = size;
    }

    image
}

/// Fill in arch and UUID, returning the `__TEXT` bounds when found.
///
/// The walk ends once both are known, or at the first command `object`
/// refuses (size below 8, or running past the table).
fn read_commands<Mach>(bytes: &[u8], image: &mut BinaryImage) -> Option<(u64, u64)>
where
    Mach: MachHeader<Endian = Endianness>,
{
    let header = match Mach::parse(bytes, 0) {
        Ok(header) => header,
        Err(err) => {
            debug!(image = %image.name, %err, "unreadable Mach-O header");
            return None;
        }
    };
    let endian = header.endian().ok()?;
    image.arch = arch_name(header.cputype(endian), header.cpusubtype(endian)).map(str::to_owned);

    let commands = match header.load_commands(endian, bytes, 0) {
        Ok(commands) => commands,
        Err(err) => {
            debug!(image = %image.name, %err, "load-command table out of bounds");
            return None;
        }
    };

    let mut text = None;
    for (index, command) in commands.enumerate() {
        let command = match command {
            Ok(command) => command,
            Err(err) => {
                debug!(image = %image.name, index, %err, "load-command table ends early");
                break;
            }
        };

        if let Ok(Some(uuid)) = command.uuid() {
            image.uuid = Some(format_uuid_bytes(&uuid.uuid));
        } else if let Ok(Some((segment, _))) = Mach::Segment::from_command(command) {
            if segment.name() == TEXT_SEGMENT {
                let vmaddr: u64 = segment.vmaddr(endian).into();
                let vmsize: u64 = segment.vmsize(endian).into();
                text = Some((vmaddr, vmsize));
            }
        }

        if image.uuid.is_some() && text.is_some() {
            break;
        }
    }

    text
}
