//! Target description and C record layout computation.
//!
//! Legacy and current runtime records are plain C structs. Their field offsets depend only on
//! the pointer width of the process that produced them: `long`, `size_t`, `uintptr_t` and every
//! pointer follow the pointer width, `int` is always four bytes, and every scalar is aligned to
//! its own size. [`Target`] captures that, and [`Target::layout`] turns a field list into offsets,
//! size and alignment exactly the way a C compiler lays out the struct.

use strum::{Display, EnumIter};

/// Width of a pointer (and of `long`, `size_t`, `uintptr_t`) on the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum PointerWidth {
    /// ILP32 targets
    #[strum(serialize = "32-bit")]
    Bits32,
    /// LP64 targets
    #[strum(serialize = "64-bit")]
    Bits64,
}

impl PointerWidth {
    /// Size of a pointer in bytes
    #[must_use]
    pub const fn bytes(self) -> usize {
        match self {
            PointerWidth::Bits32 => 4,
            PointerWidth::Bits64 => 8,
        }
    }
}

/// Byte order of the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Endianness {
    /// Least significant byte first
    Little,
    /// Most significant byte first
    Big,
}

/// The C scalar kinds that appear in runtime records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Scalar {
    /// Any data or function pointer
    Pointer,
    /// `long`
    Long,
    /// `unsigned long`
    ULong,
    /// `int` / `int32_t`
    Int,
    /// `unsigned int` / `uint32_t`
    UInt,
    /// `char`
    Char,
    /// `size_t`
    SizeT,
    /// `uintptr_t`
    UIntPtr,
}

/// Computed layout of one C struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLayout {
    /// Byte offset of every field, in declaration order
    pub offsets: Vec<usize>,
    /// `sizeof` the struct, including tail padding
    pub size: usize,
    /// `alignof` the struct
    pub align: usize,
}

/// Describes the ABI the image was produced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Target {
    /// Pointer width
    pub pointer_width: PointerWidth,
    /// Byte order
    pub endianness: Endianness,
}

impl Default for Target {
    fn default() -> Self {
        Target::LP64_LE
    }
}

impl Target {
    /// 64-bit little-endian, the most common host
    pub const LP64_LE: Target = Target {
        pointer_width: PointerWidth::Bits64,
        endianness: Endianness::Little,
    };

    /// 32-bit little-endian
    pub const ILP32_LE: Target = Target {
        pointer_width: PointerWidth::Bits32,
        endianness: Endianness::Little,
    };

    /// Create a new target description
    #[must_use]
    pub const fn new(pointer_width: PointerWidth, endianness: Endianness) -> Self {
        Target {
            pointer_width,
            endianness,
        }
    }

    /// Size of a pointer in bytes
    #[must_use]
    pub const fn pointer_size(&self) -> usize {
        self.pointer_width.bytes()
    }

    /// `sizeof` a scalar on this target
    #[must_use]
    pub const fn size_of(&self, scalar: Scalar) -> usize {
        match scalar {
            Scalar::Pointer | Scalar::Long | Scalar::ULong | Scalar::SizeT | Scalar::UIntPtr => {
                self.pointer_size()
            }
            Scalar::Int | Scalar::UInt => 4,
            Scalar::Char => 1,
        }
    }

    /// `alignof` a scalar on this target; every scalar is naturally aligned
    #[must_use]
    pub const fn align_of(&self, scalar: Scalar) -> usize {
        self.size_of(scalar)
    }

    /// Lay out a struct made of `fields`.
    #[must_use]
    pub fn layout(&self, fields: &[Scalar]) -> RecordLayout {
        let mut offsets = Vec::with_capacity(fields.len());
        let mut position = 0;
        let mut align = 1;
        for field in fields {
            let field_align = self.align_of(*field);
            position = align_up(position, field_align);
            offsets.push(position);
            position += self.size_of(*field);
            align = align.max(field_align);
        }

        RecordLayout {
            offsets,
            size: align_up(position, align),
            align,
        }
    }

    /// Offset of a flexible array member of `element` records that follows `header`.
    ///
    /// Matches `offsetof(struct { header...; element list[]; }, list)`.
    #[must_use]
    pub fn array_start(&self, header: &[Scalar], element: &[Scalar]) -> usize {
        let mut position = 0;
        for field in header {
            position = align_up(position, self.align_of(*field)) + self.size_of(*field);
        }
        align_up(position, self.layout(element).align)
    }
}

/// Round `value` up to the next multiple of `align` (`align` must be non-zero).
#[must_use]
pub const fn align_up(value: usize, align: usize) -> usize {
    if align <= 1 {
        return value;
    }
    value.div_ceil(align) * align
}

#[cfg(test)]
mod tests {
    use super::*;

    const IVAR_LIST: &[Scalar] = &[Scalar::Int, Scalar::SizeT];
    const IVAR: &[Scalar] = &[
        Scalar::Pointer,
        Scalar::Pointer,
        Scalar::Pointer,
        Scalar::UInt,
        Scalar::UInt,
    ];

    #[test]
    fn layout_lp64() {
        let layout = Target::LP64_LE.layout(IVAR);
        assert_eq!(layout.offsets, vec![0, 8, 16, 24, 28]);
        assert_eq!(layout.size, 32);
        assert_eq!(layout.align, 8);
    }

    #[test]
    fn layout_ilp32() {
        let layout = Target::ILP32_LE.layout(IVAR);
        assert_eq!(layout.offsets, vec![0, 4, 8, 12, 16]);
        assert_eq!(layout.size, 20);
        assert_eq!(layout.align, 4);
    }

    #[test]
    fn tail_padding() {
        let layout = Target::LP64_LE.layout(&[Scalar::Pointer, Scalar::Int]);
        assert_eq!(layout.size, 16);
        let layout = Target::LP64_LE.layout(&[Scalar::Char, Scalar::Char]);
        assert_eq!(layout.size, 2);
        assert_eq!(layout.align, 1);
    }

    #[test]
    fn flexible_array() {
        assert_eq!(Target::LP64_LE.array_start(IVAR_LIST, IVAR), 16);
        assert_eq!(Target::ILP32_LE.array_start(IVAR_LIST, IVAR), 8);
        // int count followed by pointer-aligned elements
        assert_eq!(Target::LP64_LE.array_start(&[Scalar::Int], IVAR), 8);
        assert_eq!(
            Target::LP64_LE.array_start(&[Scalar::Int, Scalar::Int], &[Scalar::Int]),
            8
        );
    }

    #[test]
    fn align_up_values() {
        assert_eq!(align_up(0, 8), 0);
        assert_eq!(align_up(1, 8), 8);
        assert_eq!(align_up(9, 4), 12);
        assert_eq!(align_up(7, 1), 7);
        assert_eq!(align_up(7, 0), 7);
    }
}
