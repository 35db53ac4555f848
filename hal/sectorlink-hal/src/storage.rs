//! Block storage abstractions
//!
//! A file-oriented view of the flash filesystem. The transfer engine opens
//! one file per session, streams bytes through it and closes it on every
//! exit path.

/// How a file is opened for a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OpenMode {
    /// Create a new file for writing; fails if the name already exists
    CreateExclusive,
    /// Open an existing file for reading
    ReadOnly,
}

impl OpenMode {
    /// Check if this mode allows writing
    pub fn is_write(self) -> bool {
        matches!(self, OpenMode::CreateExclusive)
    }
}

/// File-oriented block storage
///
/// Implementations sit on top of a flash filesystem. Writes may be buffered
/// until [`BlockStorage::close`], which must perform the final flush.
pub trait BlockStorage {
    /// Open file handle
    type Handle;

    /// Error type for storage operations
    type Error;

    /// Open a file by name
    fn open(&mut self, name: &str, mode: OpenMode) -> Result<Self::Handle, Self::Error>;

    /// Read up to `buf.len()` bytes
    ///
    /// # Returns
    /// The number of bytes read; `0` signals end of data.
    fn read(&mut self, handle: &mut Self::Handle, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Write bytes from `buf`
    ///
    /// # Returns
    /// The number of bytes accepted, which may be less than `buf.len()`.
    fn write(&mut self, handle: &mut Self::Handle, buf: &[u8]) -> Result<usize, Self::Error>;

    /// Close a handle, flushing any buffered data
    fn close(&mut self, handle: Self::Handle) -> Result<(), Self::Error>;
}

impl<T: BlockStorage + ?Sized> BlockStorage for &mut T {
    type Handle = T::Handle;
    type Error = T::Error;

    fn open(&mut self, name: &str, mode: OpenMode) -> Result<Self::Handle, Self::Error> {
        (**self).open(name, mode)
    }

    fn read(&mut self, handle: &mut Self::Handle, buf: &mut [u8]) -> Result<usize, Self::Error> {
        (**self).read(handle, buf)
    }

    fn write(&mut self, handle: &mut Self::Handle, buf: &[u8]) -> Result<usize, Self::Error> {
        (**self).write(handle, buf)
    }

    fn close(&mut self, handle: Self::Handle) -> Result<(), Self::Error> {
        (**self).close(handle)
    }
}
