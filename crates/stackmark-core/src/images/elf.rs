//! ELF program-header and note helpers.
//!
//! Linux has no `__TEXT` segment or `LC_UUID`; the closest equivalents are
//! the span of the loadable segments and the GNU build-id note. These helpers
//! compute both from already-decoded program headers and raw note bytes, so
//! they serve the live loader walk and files read from disk alike.

use object::elf::{ELF_NOTE_GNU, NT_GNU_BUILD_ID, PF_X};
use object::read::elf::{FileHeader, NoteIterator};

/// The parts of a `PT_LOAD` program header the catalog uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSegment
{
    /// `p_vaddr`
    pub vaddr: u64,
    /// `p_memsz`
    pub memsz: u64,
    /// `p_align`
    pub align: u64,
    /// `p_flags`
    pub flags: u32,
}

impl LoadSegment
{
    fn is_executable(&self) -> bool
    {
        self.flags & PF_X != 0
    }
}

/// Link-time start and size of an image's code.
///
/// The start is the lowest loadable address, aligned down to the segment's
/// alignment; the end is the end of the last executable segment. Returns
/// `None` without any loadable segment. An image with loadable but no
/// executable segments gets a size of zero.
pub fn code_bounds<I>(segments: I) -> Option<(u64, u64)>
where
    I: IntoIterator<Item = LoadSegment>,
{
    let mut start: Option<u64> = None;
    let mut code_end: Option<u64> = None;

    for segment in segments {
        let aligned = if segment.align.is_power_of_two() {
            segment.vaddr & !(segment.align - 1)
        } else {
            segment.vaddr
        };
        start = Some(start.map_or(aligned, |current| current.min(aligned)));

        if segment.is_executable() {
            let end = segment.vaddr.saturating_add(segment.memsz);
            code_end = Some(code_end.map_or(end, |current| current.max(end)));
        }
    }

    let start = start?;
    let size = code_end.map_or(0, |end| end.saturating_sub(start));
    Some((start, size))
}

/// Descriptor of the first `NT_GNU_BUILD_ID` note in a `PT_NOTE` segment.
///
/// `align` is the segment's `p_align`. A malformed note ends the search.
pub fn gnu_build_id<Elf: FileHeader>(endian: Elf::Endian, align: Elf::Word, notes: &[u8]) -> Option<&[u8]>
{
    let notes = NoteIterator::<Elf>::new(endian, align, notes).ok()?;
    notes
        .map_while(Result::ok)
        .find(|note| note.n_type(endian) == NT_GNU_BUILD_ID && note.name() == ELF_NOTE_GNU)
        .map(|note| note.desc())
}

/// Fold a build id of any length into 16 bytes: truncated, or zero padded.
pub fn build_id_bytes(build_id: &[u8]) -> Option<[u8; 16]>
{
    if build_id.is_empty() {
        return None;
    }

    let mut bytes = [0u8; 16];
    let len = build_id.len().min(16);
    bytes[..len].copy_from_slice(&build_id[..len]);
    Some(bytes)
}
