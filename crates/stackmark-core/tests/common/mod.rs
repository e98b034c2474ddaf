//! Shared fixtures for integration tests

#![allow(dead_code)]

/// `MH_MAGIC_64`
const MAGIC_64: u32 = 0xfeed_facf;
const CPU_TYPE_ARM64: u32 = 0x0100_000c;
const LC_UUID: u32 = 0x1b;
const LC_SEGMENT_64: u32 = 0x19;

pub const UUID: [u8; 16] = [
    0xa1, 0xb2, 0xc3, 0xd4, 0xe5, 0xf6, 0x07, 0x18, 0x29, 0x3a, 0x4b, 0x5c, 0x6d, 0x7e, 0x8f, 0x90,
];
pub const UUID_TEXT: &str = "A1B2C3D4-E5F6-0718-293A-4B5C6D7E8F90";

/// Little-endian 64-bit Mach-O header followed by an `LC_UUID` and a `__TEXT`
/// `LC_SEGMENT_64` command.
pub fn macho_image(uuid: Option<[u8; 16]>, text: Option<(u64, u64)>) -> Vec<u8>
{
    let mut commands = Vec::new();
    let mut ncmds = 0u32;

    if let Some(uuid) = uuid {
        commands.extend(LC_UUID.to_le_bytes());
        commands.extend(24u32.to_le_bytes());
        commands.extend(uuid);
        ncmds += 1;
    }

    if let Some((vmaddr, vmsize)) = text {
        let start = commands.len();
        commands.extend(LC_SEGMENT_64.to_le_bytes());
        commands.extend(72u32.to_le_bytes());
        let mut segname = [0u8; 16];
        segname[..6].copy_from_slice(b"__TEXT");
        commands.extend(segname);
        commands.extend(vmaddr.to_le_bytes());
        commands.extend(vmsize.to_le_bytes());
        commands.resize(start + 72, 0);
        ncmds += 1;
    }

    let mut bytes = Vec::new();
    bytes.extend(MAGIC_64.to_le_bytes());
    bytes.extend(CPU_TYPE_ARM64.to_le_bytes());
    bytes.extend(0u32.to_le_bytes()); // cpusubtype
    bytes.extend(6u32.to_le_bytes()); // MH_DYLIB
    bytes.extend(ncmds.to_le_bytes());
    bytes.extend((commands.len() as u32).to_le_bytes());
    bytes.extend(0u32.to_le_bytes()); // flags
    bytes.extend(0u32.to_le_bytes()); // reserved
    bytes.extend(commands);
    bytes
}
