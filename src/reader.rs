//! Bounded, typed reads over one borrowed device buffer.
//!
//! A [`Reader`] is created per decode pass and never outlives it; the
//! buffer itself stays owned by the device source. Every operation
//! checks bounds first, so the cursor can never leave `0..=len`.

/// Errors produced by [`Reader`] bounds checks.
///
/// All of these abort the decode of the current record; the frame
/// decoder discards the remainder of the enclosing frame and continues
/// with the next one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReaderError {
    /// The cursor already reached the end of the buffer.
    #[error("end of data reached")]
    EndOfData,

    /// More bytes were requested than remain in the buffer.
    #[error("invalid read of {requested} bytes with {remaining} remaining")]
    InvalidRead { requested: usize, remaining: usize },

    /// A seek target lies beyond the end of the buffer.
    #[error("invalid seek to {target} in a buffer of {len} bytes")]
    InvalidSeek { target: usize, len: usize },
}

/// A record that can be read off the wire with [`Reader::read_as`].
///
/// Wire records are packed little-endian with no padding; implementors
/// read field by field so decoding is independent of host endianness.
pub trait Parse: Sized {
    /// Encoded size on the wire, in bytes.
    const SIZE: usize;

    fn parse(reader: &mut Reader<'_>) -> Result<Self, ReaderError>;
}

/// Cursor over a single device buffer.
pub struct Reader<'a> {
    buffer: &'a [u8],
    index: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Reader { buffer, index: 0 }
    }

    /// Current cursor position.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of bytes remaining after the cursor.
    pub fn size(&self) -> usize {
        self.buffer.len() - self.index
    }

    /// Remaining bytes, without advancing the cursor.
    pub fn rest(&self) -> &'a [u8] {
        &self.buffer[self.index..]
    }

    /// Moves the cursor to an absolute position.
    pub fn seek(&mut self, target: usize) -> Result<(), ReaderError> {
        if target > self.buffer.len() {
            return Err(ReaderError::InvalidSeek {
                target,
                len: self.buffer.len(),
            });
        }

        self.index = target;
        Ok(())
    }

    /// Advances the cursor by `count` bytes.
    pub fn skip(&mut self, count: usize) -> Result<(), ReaderError> {
        if count == 0 {
            return Ok(());
        }
        if self.size() == 0 {
            return Err(ReaderError::EndOfData);
        }
        if count > self.size() {
            return Err(ReaderError::InvalidRead {
                requested: count,
                remaining: self.size(),
            });
        }

        self.index += count;
        Ok(())
    }

    /// Copies `dest.len()` bytes into `dest` and advances the cursor.
    pub fn read(&mut self, dest: &mut [u8]) -> Result<(), ReaderError> {
        if dest.is_empty() {
            return Ok(());
        }
        if self.size() == 0 {
            return Err(ReaderError::EndOfData);
        }
        if dest.len() > self.size() {
            return Err(ReaderError::InvalidRead {
                requested: dest.len(),
                remaining: self.size(),
            });
        }

        dest.copy_from_slice(&self.buffer[self.index..self.index + dest.len()]);
        self.index += dest.len();
        Ok(())
    }

    /// Splits off an independent reader over the next `count` bytes and
    /// advances this one past them.
    pub fn subspan(&mut self, count: usize) -> Result<Reader<'a>, ReaderError> {
        if count > 0 && self.size() == 0 {
            return Err(ReaderError::EndOfData);
        }
        if count > self.size() {
            return Err(ReaderError::InvalidRead {
                requested: count,
                remaining: self.size(),
            });
        }

        let sub = Reader::new(&self.buffer[self.index..self.index + count]);
        self.index += count;
        Ok(sub)
    }

    /// Reads a packed little-endian record of type `T`.
    pub fn read_as<T: Parse>(&mut self) -> Result<T, ReaderError> {
        T::parse(self)
    }

    pub fn read_u8(&mut self) -> Result<u8, ReaderError> {
        let mut bytes = [0; 1];
        self.read(&mut bytes)?;
        Ok(bytes[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, ReaderError> {
        let mut bytes = [0; 2];
        self.read(&mut bytes)?;
        Ok(u16::from_le_bytes(bytes))
    }

    pub fn read_u32(&mut self) -> Result<u32, ReaderError> {
        let mut bytes = [0; 4];
        self.read(&mut bytes)?;
        Ok(u32::from_le_bytes(bytes))
    }
}
