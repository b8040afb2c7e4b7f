use super::Backend;

/// Image bytes held in an owned buffer: records assembled by an
/// [`ImageBuilder`](super::ImageBuilder) or a dump read into memory.
#[derive(Debug)]
pub struct Memory {
    data: Box<[u8]>,
}

impl Memory {
    /// Take ownership of `data`
    pub fn new(data: Vec<u8>) -> Memory {
        Memory {
            data: data.into_boxed_slice(),
        }
    }
}

impl Backend for Memory {
    fn data(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_bounds() {
        // { isa = 0x1000, name = 0x2000 } on a 64-bit little-endian target
        let mut data = vec![0_u8; 16];
        data[..8].copy_from_slice(&0x1000_u64.to_le_bytes());
        data[8..].copy_from_slice(&0x2000_u64.to_le_bytes());

        let memory = Memory::new(data);
        assert_eq!(memory.len(), 16);
        assert_eq!(memory.data_slice(8, 8).unwrap(), &0x2000_u64.to_le_bytes());
        assert!(memory.data_slice(12, 8).is_err());
        assert!(memory.data_slice(usize::MAX, 1).is_err());
    }
}
