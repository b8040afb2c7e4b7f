//! Physical file backend for memory-mapped I/O.
//!
//! A dumped legacy image can be large (a whole data segment of a process), and the upgrader
//! touches it in a pointer-chasing, non-sequential pattern. Mapping the file lets the operating
//! system page in only what the upgrade actually visits.

use super::Backend;
use crate::{Error::Empty, Result};

use memmap2::Mmap;
use std::{fs, path::Path};

/// A file backend that uses memory-mapped I/O for access to image dumps on disk.
#[derive(Debug)]
pub struct Physical {
    /// Memory-mapped file data
    data: Mmap,
}

impl Physical {
    /// Create a new physical file backend by memory-mapping the specified file.
    ///
    /// The file is mapped read-only.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened or mapped and
    /// [`crate::Error::Empty`] for an empty file.
    pub fn new(path: impl AsRef<Path>) -> Result<Physical> {
        let file = fs::File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Err(Empty);
        }

        // The mapping is read-only and never handed out beyond the lifetime of `Physical`
        let mmap = unsafe { Mmap::map(&file) }?;

        Ok(Physical { data: mmap })
    }
}

impl Backend for Physical {
    fn data(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn physical() {
        let path = std::env::temp_dir().join(format!("objcabi-physical-{}.bin", std::process::id()));
        {
            let mut file = fs::File::create(&path).unwrap();
            file.write_all(&[0x01, 0x02, 0x03, 0x04]).unwrap();
        }

        let physical = Physical::new(&path).unwrap();
        assert_eq!(physical.len(), 4);
        assert_eq!(physical.data_slice(1, 2).unwrap(), &[0x02, 0x03]);
        assert!(physical.data_slice(3, 2).is_err());

        drop(physical);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn missing_file() {
        let result = Physical::new("/nonexistent/objcabi/image.bin");
        assert!(matches!(result, Err(crate::Error::FileError(_))));
    }
}
