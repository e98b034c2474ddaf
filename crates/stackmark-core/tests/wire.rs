//! Tests for the serialized shape of frames and images

use serde_json::{json, Value};
use stackmark_core::types::{Address, BinaryImage, ImageFormat, StackFrame, PLATFORM};

fn image(vm_address: u64, uuid: Option<&str>) -> BinaryImage
{
    BinaryImage {
        name: "/Applications/MyApp.app/MyApp".into(),
        uuid: uuid.map(str::to_owned),
        vm_address: Address::new(vm_address),
        address: Address::new(vm_address + 0x4000),
        size: 0x8000,
        arch: None,
        format: ImageFormat::MachO,
    }
}

#[test]
fn test_bare_frame_has_only_required_fields()
{
    let value = serde_json::to_value(StackFrame::bare(Address::new(0x0000_0001_0450_0000))).unwrap();
    assert_eq!(value, json!({
        "instruction_addr": "0x104500000",
        "platform": PLATFORM,
        "in_app": false,
    }));
}

#[test]
fn test_full_frame()
{
    let frame = StackFrame {
        instruction_address: Address::new(0x1_0000_4abc),
        module: Some("MyApp".into()),
        package: Some("/Applications/MyApp.app/MyApp".into()),
        image_address: Some(Address::new(0x1_0000_4000)),
        in_app: true,
        function: Some("MyApp.ViewController.viewDidLoad() -> ()".into()),
        symbol_address: Some(Address::new(0x1_0000_4a00)),
        filename: Some("ViewController.swift".into()),
        lineno: Some(42),
    };

    let value = serde_json::to_value(&frame).unwrap();
    assert_eq!(value["instruction_addr"], "0x100004abc");
    assert_eq!(value["image_addr"], "0x100004000");
    assert_eq!(value["symbol_addr"], "0x100004a00");
    assert_eq!(value["module"], "MyApp");
    assert_eq!(value["in_app"], true);
    assert_eq!(value["lineno"], 42);
    assert_eq!(value.as_object().unwrap().len(), 10);
}

#[test]
fn test_image_with_build_id_and_vmaddr()
{
    let value = serde_json::to_value(image(0x1_0000_0000, Some("12345678-90AB-CDEF-1234-567890ABCDEF"))).unwrap();
    assert_eq!(value, json!({
        "type": "macho",
        "code_file": "/Applications/MyApp.app/MyApp",
        "image_addr": "0x100004000",
        "image_size": 0x8000,
        "debug_id": "12345678-90AB-CDEF-1234-567890ABCDEF",
        "image_vmaddr": "0x100000000",
    }));
}

#[test]
fn test_image_omits_zero_vmaddr_and_missing_uuid()
{
    let value = serde_json::to_value(image(0, None)).unwrap();
    let object = value.as_object().unwrap();

    assert!(!object.contains_key("image_vmaddr"));
    assert!(!object.contains_key("debug_id"));
    assert_eq!(value["image_addr"], Value::from("0x4000"));
    assert_eq!(value["type"], "macho");
}

#[test]
fn test_elf_image_tag_and_arch()
{
    let mut elf = image(0, None);
    elf.format = ImageFormat::Elf;
    elf.arch = Some("x86_64".into());

    let value = serde_json::to_value(elf).unwrap();
    assert_eq!(value["type"], "elf");
    assert_eq!(value["arch"], "x86_64");
}
