//! # Formatted Stack Text
//!
//! Fallback parser for call stacks that only exist as text, such as the
//! symbol lines a runtime attaches to an exception or a pasted crash log:
//!
//! ```text
//! 0   MyApp        0x00000001045a8f40 MyApp + 12345
//! 2   Foundation   0x00007fff2e4f6a9c -[NSException raise] + 123
//! 4   MyApp        0x0000000104e5c123 MyClass.myMethod() -> () (MyFile.swift:42)
//! ```
//!
//! Each line yields one frame: the first hex literal is the instruction
//! address, the token before it the module, the text after it the function.
//! A trailing `+ N` is the offset from the symbol, or from the image base
//! when the "function" is just the module name again. A trailing
//! `(file:line)` becomes the frame's source location. Lines without an
//! address carry nothing to symbolicate and are dropped.

use crate::classify::is_in_app;
use crate::codec::parse_hex;
use crate::config::ErrorTrackingConfig;
use crate::types::{Address, StackFrame};

/// Parse every line of `text`, skipping lines without an address.
pub fn parse_stack_text(text: &str, config: &ErrorTrackingConfig) -> Vec<StackFrame>
{
    text.lines().filter_map(|line| parse_stack_line(line, config)).collect()
}

/// Parse one formatted stack line.
///
/// ```rust
/// use stackmark_core::config::ErrorTrackingConfigBuilder;
/// use stackmark_core::trace_text::parse_stack_line;
///
/// let config = ErrorTrackingConfigBuilder::unseeded().build();
/// let frame = parse_stack_line("2   Foundation   0x00007fff2e4f6a9c -[NSException raise] + 123", &config).unwrap();
///
/// assert_eq!(frame.instruction_address.value(), 0x7fff_2e4f_6a9c);
/// assert_eq!(frame.module.as_deref(), Some("Foundation"));
/// assert_eq!(frame.function.as_deref(), Some("-[NSException raise]"));
/// assert!(!frame.in_app);
/// ```
pub fn parse_stack_line(line: &str, config: &ErrorTrackingConfig) -> Option<StackFrame>
{
    let line = line.trim();
    let tokens: Vec<(usize, &str)> = line
        .split_whitespace()
        .map(|token| (token.as_ptr() as usize - line.as_ptr() as usize, token))
        .collect();

    let (index, &(start, token)) = tokens.iter().enumerate().find(|(_, (_, token))| is_hex_literal(token))?;
    let address = Address::new(parse_hex(token)?);

    let module = index
        .checked_sub(1)
        .map(|before| tokens[before].1)
        .filter(|candidate| !candidate.bytes().all(|b| b.is_ascii_digit()));

    let rest = line[start + token.len()..].trim();
    let (rest, location) = split_location(rest);
    let (text, offset) = split_offset(rest);
    let text = (!text.is_empty()).then_some(text);

    let mut frame = StackFrame::bare(address);
    frame.in_app = module.is_some_and(|module| is_in_app(module, config));
    frame.module = module.map(str::to_owned);
    if let Some((filename, lineno)) = location {
        frame.filename = Some(filename.to_owned());
        frame.lineno = Some(lineno);
    }

    match (text, offset) {
        // "MyApp + 12345": offset from the image, no symbol known
        (Some(text), Some(offset)) if Some(text) == module => {
            frame.image_address = address.checked_sub(offset);
        }
        (text, offset) => {
            frame.function = text.map(str::to_owned);
            frame.symbol_address = offset.and_then(|offset| address.checked_sub(offset));
        }
    }

    Some(frame)
}

fn is_hex_literal(token: &str) -> bool
{
    token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_hexdigit()))
}

/// Split a trailing `(file.ext:line)` off `text`.
fn split_location(text: &str) -> (&str, Option<(&str, u32)>)
{
    let parsed = text.strip_suffix(')').and_then(|inner| {
        let open = inner.rfind('(')?;
        let (file, line) = inner[open + 1..].rsplit_once(':')?;
        if !file.contains('.') || file.contains(char::is_whitespace) {
            return None;
        }
        let line = line.parse::<u32>().ok()?;
        Some((text[..open].trim_end(), (file, line)))
    });

    match parsed {
        Some((head, location)) => (head, Some(location)),
        None => (text, None),
    }
}

/// Split a trailing `+ N` (decimal) off `text`.
fn split_offset(text: &str) -> (&str, Option<u64>)
{
    text.rsplit_once(" + ")
        .and_then(|(head, tail)| Some((head.trim_end(), tail.trim().parse::<u64>().ok()?)))
        .map_or((text, None), |(head, offset)| (head, Some(offset)))
}
