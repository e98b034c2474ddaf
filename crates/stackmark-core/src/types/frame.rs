//! Symbolicated stack frame type.

use serde::ser::{Serialize, SerializeStruct, Serializer};

use super::Address;
use crate::codec::format_hex;

/// Platform tag attached to every serialized frame.
pub const PLATFORM: &str = std::env::consts::OS;

/// One symbolicated entry of a captured call stack.
///
/// Built once by the symbolicator (or the stack-text parser) and never
/// mutated. Image data is copied in by value: `image_address` and `module`
/// describe the owning image as it was at capture time and do not keep any
/// loader state alive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame
{
    /// Return address as reported by the unwinder.
    pub instruction_address: Address,
    /// Last path component of the owning image (e.g. `Foundation`).
    pub module: Option<String>,
    /// Full path of the owning image.
    pub package: Option<String>,
    /// Load base of the owning image. Matches one `BinaryImage::address`.
    pub image_address: Option<Address>,
    /// Whether the frame belongs to the host application's own code.
    pub in_app: bool,
    /// Demangled function name, or the raw symbol when demangling failed.
    pub function: Option<String>,
    /// Start address of the nearest preceding exported symbol.
    pub symbol_address: Option<Address>,
    /// Source file, only known for frames parsed from formatted stack text.
    pub filename: Option<String>,
    /// Source line, only known for frames parsed from formatted stack text.
    pub lineno: Option<u32>,
}

impl StackFrame
{
    /// A frame carrying nothing but its instruction address.
    pub fn bare(instruction_address: Address) -> Self
    {
        Self {
            instruction_address,
            module: None,
            package: None,
            image_address: None,
            in_app: false,
            function: None,
            symbol_address: None,
            filename: None,
            lineno: None,
        }
    }

    /// Byte offset of the instruction from the start of its symbol.
    pub fn symbol_offset(&self) -> Option<u64>
    {
        let symbol = self.symbol_address?;
        self.instruction_address.value().checked_sub(symbol.value())
    }
}

impl Serialize for StackFrame
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let optional = [
            self.module.is_some(),
            self.package.is_some(),
            self.image_address.is_some(),
            self.function.is_some(),
            self.symbol_address.is_some(),
            self.filename.is_some(),
            self.lineno.is_some(),
        ];
        let len = 3 + optional.iter().filter(|present| **present).count();

        let mut state = serializer.serialize_struct("StackFrame", len)?;
        state.serialize_field("instruction_addr", &format_hex(self.instruction_address.value()))?;
        state.serialize_field("platform", PLATFORM)?;
        state.serialize_field("in_app", &self.in_app)?;
        if let Some(module) = &self.module {
            state.serialize_field("module", module)?;
        }
        if let Some(package) = &self.package {
            state.serialize_field("package", package)?;
        }
        if let Some(image) = self.image_address {
            state.serialize_field("image_addr", &format_hex(image.value()))?;
        }
        if let Some(function) = &self.function {
            state.serialize_field("function", function)?;
        }
        if let Some(symbol) = self.symbol_address {
            state.serialize_field("symbol_addr", &format_hex(symbol.value()))?;
        }
        if let Some(filename) = &self.filename {
            state.serialize_field("filename", filename)?;
        }
        if let Some(lineno) = self.lineno {
            state.serialize_field("lineno", &lineno)?;
        }
        state.end()
    }
}
