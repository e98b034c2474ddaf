//! Loaded binary image type.

use serde::ser::{Serialize, SerializeStruct, Serializer};

use super::Address;
use crate::codec::format_hex;

/// Container format of a binary image, serialized as the image `type` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat
{
    /// Mach-O (Apple platforms).
    MachO,
    /// ELF (Linux, Android).
    Elf,
}

impl ImageFormat
{
    /// Tag understood by symbolication services.
    pub const fn tag(self) -> &'static str
    {
        match self {
            ImageFormat::MachO => "macho",
            ImageFormat::Elf => "elf",
        }
    }
}

/// Identifiers of one executable or shared library mapped into the process.
///
/// `address == vm_address + slide`. A `size` of zero means the code segment
/// could not be located, in which case `vm_address` is zero as well and
/// `address` is the bare slide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryImage
{
    /// Full path reported by the loader.
    pub name: String,
    /// Build identifier, canonical uppercase 8-4-4-4-12 text.
    pub uuid: Option<String>,
    /// Preferred (link-time) address of the code segment.
    pub vm_address: Address,
    /// Runtime address of the code segment.
    pub address: Address,
    /// Size of the code segment in bytes.
    pub size: u64,
    /// CPU architecture from the image header, when recognized.
    pub arch: Option<String>,
    /// Container format.
    pub format: ImageFormat,
}

impl BinaryImage
{
    /// Whether `address` falls inside this image's code segment.
    pub fn contains(&self, address: Address) -> bool
    {
        let start = self.address.value();
        let value = address.value();
        value >= start && value - start < self.size
    }
}

impl Serialize for BinaryImage
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let optional = [self.uuid.is_some(), !self.vm_address.is_null(), self.arch.is_some()];
        let len = 4 + optional.iter().filter(|present| **present).count();

        let mut state = serializer.serialize_struct("BinaryImage", len)?;
        state.serialize_field("type", self.format.tag())?;
        state.serialize_field("code_file", &self.name)?;
        state.serialize_field("image_addr", &format_hex(self.address.value()))?;
        state.serialize_field("image_size", &self.size)?;
        if let Some(uuid) = &self.uuid {
            state.serialize_field("debug_id", uuid)?;
        }
        if !self.vm_address.is_null() {
            state.serialize_field("image_vmaddr", &format_hex(self.vm_address.value()))?;
        }
        if let Some(arch) = &self.arch {
            state.serialize_field("arch", arch)?;
        }
        state.end()
    }
}
