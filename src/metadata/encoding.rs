//! Objective-C type encoding decoder.
//!
//! Type encodings are the compact strings the compiler emits for ivar types, method signatures
//! and property types (`i`, `@"NSString"`, `{CGPoint=dd}`, `^{__CFString=}` ...). The upgrader
//! needs two facts from them:
//!
//! - the natural **alignment** of an ivar's type, stored in the upgraded ivar descriptor, and
//! - the **length** of the first complete type in a longer signature, because a property's type
//!   is taken from the leading part of its getter's method signature (`i16@0:8` → `i`).
//!
//! Layouts follow natural C rules on the image's [`Target`]: structs are padded to their most
//! aligned member, unions take the largest member, arrays multiply. Consecutive bitfields of a
//! struct share storage and are rounded up to whole bytes.
//!
//! # Examples
//!
//! ```rust
//! use objcabi::{metadata::encoding, Target};
//!
//! assert_eq!(encoding::type_length("i16@0:8")?, 1);
//! assert_eq!(encoding::type_length("@\"NSString\"16@0:8")?, 11);
//!
//! let layout = encoding::layout_of("{CGPoint=dd}", &Target::LP64_LE)?;
//! assert_eq!((layout.size, layout.align), (16, 8));
//! # Ok::<(), objcabi::Error>(())
//! ```

use crate::{
    file::{align_up, PointerWidth, Scalar, Target},
    Error::RecursionLimit,
    Result,
};

/// Nesting limit for structs, unions, arrays and pointers inside one encoding.
const MAX_DEPTH: usize = 64;

/// Qualifiers that may prefix a type without changing its layout
const QUALIFIERS: &[u8] = b"rnNoORV";

/// Base types of a GNU `b<offset><type><bits>` bitfield
const BITFIELD_BASES: &[u8] = b"cCsSiIlLqQB";

/// Size and alignment of a decoded type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeLayout {
    /// `sizeof` the type in bytes
    pub size: usize,
    /// `alignof` the type in bytes
    pub align: usize,
}

impl TypeLayout {
    const fn new(size: usize, align: usize) -> Self {
        TypeLayout { size, align }
    }
}

/// A bitfield member; GNU encodings carry the absolute bit offset and the base type.
struct Bitfield {
    offset: Option<usize>,
    bits: usize,
    align: usize,
}

/// Length in bytes of the first complete type in `types`, including leading qualifiers.
///
/// Frame offsets that follow a type in a method signature are not part of it. An empty string
/// has length zero.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if the leading type cannot be decoded.
pub fn type_length(types: &str) -> Result<usize> {
    if types.is_empty() {
        return Ok(0);
    }

    // Any target works, only the cursor position is of interest
    let mut decoder = Decoder::new(types, Target::default());
    decoder.parse_type()?;
    Ok(decoder.position)
}

/// Size and alignment of the first complete type in `types`.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if the type cannot be decoded, including the empty
/// string.
pub fn layout_of(types: &str, target: &Target) -> Result<TypeLayout> {
    Decoder::new(types, *target).parse_type()
}

/// `alignof` the first complete type in `types`.
///
/// # Errors
/// See [`layout_of`].
pub fn align_of(types: &str, target: &Target) -> Result<usize> {
    layout_of(types, target).map(|layout| layout.align)
}

struct Decoder<'s> {
    bytes: &'s [u8],
    position: usize,
    target: Target,
    depth: usize,
}

impl<'s> Decoder<'s> {
    fn new(types: &'s str, target: Target) -> Self {
        Decoder {
            bytes: types.as_bytes(),
            position: 0,
            target,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.position).copied()
    }

    fn next(&mut self) -> Result<u8> {
        match self.peek() {
            Some(byte) => {
                self.position += 1;
                Ok(byte)
            }
            None => Err(malformed_error!(
                "Type encoding '{}' ends unexpectedly",
                String::from_utf8_lossy(self.bytes)
            )),
        }
    }

    fn expect(&mut self, expected: u8) -> Result<()> {
        let found = self.next()?;
        if found != expected {
            return Err(malformed_error!(
                "Type encoding '{}': expected '{}' at {}, found '{}'",
                String::from_utf8_lossy(self.bytes),
                expected as char,
                self.position - 1,
                found as char
            ));
        }
        Ok(())
    }

    fn number(&mut self) -> Option<usize> {
        let start = self.position;
        let mut value: usize = 0;
        while let Some(digit @ b'0'..=b'9') = self.peek() {
            value = value
                .saturating_mul(10)
                .saturating_add(usize::from(digit - b'0'));
            self.position += 1;
        }
        (self.position > start).then_some(value)
    }

    fn pointer(&self) -> TypeLayout {
        let size = self.target.pointer_size();
        TypeLayout::new(size, size)
    }

    fn parse_type(&mut self) -> Result<TypeLayout> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(RecursionLimit(MAX_DEPTH));
        }
        let layout = self.parse_type_inner();
        self.depth -= 1;
        layout
    }

    fn parse_type_inner(&mut self) -> Result<TypeLayout> {
        while self.peek().is_some_and(|byte| QUALIFIERS.contains(&byte)) {
            self.position += 1;
        }

        let layout = match self.next()? {
            b'A' => self.parse_type()?,
            b'j' => {
                let part = self.parse_type()?;
                TypeLayout::new(part.size * 2, part.align)
            }
            b'c' | b'C' | b'B' => TypeLayout::new(1, 1),
            b's' | b'S' => TypeLayout::new(2, 2),
            b'i' | b'I' | b'f' => TypeLayout::new(4, 4),
            b'l' | b'L' => TypeLayout::new(
                self.target.size_of(Scalar::Long),
                self.target.align_of(Scalar::Long),
            ),
            b'q' | b'Q' | b'd' => TypeLayout::new(8, 8),
            b't' | b'T' => TypeLayout::new(16, 16),
            b'D' => match self.target.pointer_width {
                PointerWidth::Bits64 => TypeLayout::new(16, 16),
                PointerWidth::Bits32 => TypeLayout::new(12, 4),
            },
            b'v' | b'?' => TypeLayout::new(0, 1),
            b'*' | b'#' | b':' => self.pointer(),
            b'@' => {
                match self.peek() {
                    Some(b'"') => self.skip_quoted()?,
                    Some(b'?') => self.position += 1,
                    _ => {}
                }
                self.pointer()
            }
            b'^' => {
                if self.peek() == Some(b'?') {
                    self.position += 1;
                } else {
                    self.parse_type()?;
                }
                self.pointer()
            }
            b'[' => {
                let count = self.number().ok_or_else(|| {
                    malformed_error!(
                        "Type encoding '{}': array without element count",
                        String::from_utf8_lossy(self.bytes)
                    )
                })?;
                let element = self.parse_type()?;
                self.expect(b']')?;
                TypeLayout::new(element.size.saturating_mul(count), element.align)
            }
            b'{' => self.parse_aggregate(b'}', false)?,
            b'(' => self.parse_aggregate(b')', true)?,
            b'b' => {
                let field = self.parse_bitfield()?;
                TypeLayout::new(field.bits.div_ceil(8), field.align)
            }
            other => {
                return Err(malformed_error!(
                    "Type encoding '{}': unknown type code '{}'",
                    String::from_utf8_lossy(self.bytes),
                    other as char
                ))
            }
        };

        Ok(layout)
    }

    fn skip_quoted(&mut self) -> Result<()> {
        self.expect(b'"')?;
        while self.next()? != b'"' {}
        Ok(())
    }

    fn parse_aggregate(&mut self, close: u8, union: bool) -> Result<TypeLayout> {
        // name, up to '=' or the closing bracket
        loop {
            match self.next()? {
                b'=' => break,
                byte if byte == close => return Ok(TypeLayout::new(0, 1)),
                _ => {}
            }
        }

        let mut size: usize = 0;
        let mut align = 1;
        // bit position where the current run of struct bitfields ends
        let mut run_end: Option<usize> = None;
        while self.peek() != Some(close) {
            if self.peek() == Some(b'"') {
                self.skip_quoted()?;
            }

            if self.peek() == Some(b'b') {
                self.position += 1;
                let field = self.parse_bitfield()?;
                align = align.max(field.align);
                if union {
                    size = size.max(field.bits.div_ceil(8));
                } else {
                    let start = run_end.unwrap_or(size.saturating_mul(8));
                    run_end = Some(match field.offset {
                        Some(offset) => start.max(offset.saturating_add(field.bits)),
                        None => start.saturating_add(field.bits),
                    });
                }
                continue;
            }
            if let Some(end) = run_end.take() {
                size = size.max(end.div_ceil(8));
            }

            let member = self.parse_type()?;
            align = align.max(member.align);
            size = if union {
                size.max(member.size)
            } else {
                align_up(size, member.align) + member.size
            };
        }
        self.expect(close)?;
        if let Some(end) = run_end {
            size = size.max(end.div_ceil(8));
        }

        Ok(TypeLayout::new(align_up(size, align), align))
    }

    fn parse_bitfield(&mut self) -> Result<Bitfield> {
        let first = self.number().ok_or_else(|| {
            malformed_error!(
                "Type encoding '{}': bitfield without width",
                String::from_utf8_lossy(self.bytes)
            )
        })?;

        // GNU form: b<offset><type><bits>, clang form: b<bits>
        let gnu = self.peek().is_some_and(|byte| BITFIELD_BASES.contains(&byte))
            && self
                .bytes
                .get(self.position + 1)
                .is_some_and(u8::is_ascii_digit);
        if !gnu {
            return Ok(Bitfield {
                offset: None,
                bits: first,
                align: 1,
            });
        }

        let base = self.parse_type()?;
        let bits = self.number().unwrap_or(0);
        Ok(Bitfield {
            offset: Some(first),
            bits,
            align: base.align,
        })
    }
}
