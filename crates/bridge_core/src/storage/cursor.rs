// cursor.rs - Bounds-checked traversal of a byte buffer
//
// Every move is checked against the buffer length before any byte is touched.
// Reads and writes go through bytemuck and tolerate unaligned offsets.

use super::StorageError;
use bytemuck::Pod;
use std::mem::size_of;

/// `(buffer, offset, remaining)` view over storage bytes.
pub struct Cursor<B> {
    buf: B,
    offset: usize,
}

impl<B: AsRef<[u8]>> Cursor<B> {
    pub fn new(buf: B) -> Self {
        Self { buf, offset: 0 }
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.as_ref().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.len() - self.offset
    }

    pub fn into_inner(self) -> B {
        self.buf
    }

    fn check(&self, offset: usize, size: usize) -> Result<(), StorageError> {
        let len = self.len();
        match offset.checked_add(size) {
            Some(end) if end <= len => Ok(()),
            _ => Err(StorageError::OutOfBounds { offset, size, len }),
        }
    }

    /// Move to an absolute offset. The end of the buffer is a valid position.
    pub fn seek(&mut self, offset: usize) -> Result<(), StorageError> {
        self.check(offset, 0)?;
        self.offset = offset;
        Ok(())
    }

    pub fn advance(&mut self, count: usize) -> Result<(), StorageError> {
        self.check(self.offset, count)?;
        self.offset += count;
        Ok(())
    }

    /// Skip padding up to the next multiple of `align`.
    pub fn align_to(&mut self, align: usize) -> Result<(), StorageError> {
        let aligned = crate::layout::align_up(self.offset, align.max(1));
        self.seek(aligned)
    }

    pub fn read<T: Pod>(&mut self) -> Result<T, StorageError> {
        let size = size_of::<T>();
        self.check(self.offset, size)?;
        let start = self.offset;
        let value = bytemuck::pod_read_unaligned(&self.buf.as_ref()[start..start + size]);
        self.offset += size;
        Ok(value)
    }

    /// Borrow the next `len` bytes and move past them.
    pub fn slice(&mut self, len: usize) -> Result<&[u8], StorageError> {
        self.check(self.offset, len)?;
        let start = self.offset;
        self.offset += len;
        Ok(&self.buf.as_ref()[start..start + len])
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> Cursor<B> {
    pub fn write<T: Pod>(&mut self, value: T) -> Result<(), StorageError> {
        let size = size_of::<T>();
        self.check(self.offset, size)?;
        let start = self.offset;
        self.buf.as_mut()[start..start + size].copy_from_slice(bytemuck::bytes_of(&value));
        self.offset += size;
        Ok(())
    }

    pub fn slice_mut(&mut self, len: usize) -> Result<&mut [u8], StorageError> {
        self.check(self.offset, len)?;
        let start = self.offset;
        self.offset += len;
        Ok(&mut self.buf.as_mut()[start..start + len])
    }

    /// Zero the next `len` bytes and move past them.
    pub fn fill_zero(&mut self, len: usize) -> Result<(), StorageError> {
        self.slice_mut(len)?.fill(0);
        Ok(())
    }
}

impl<'a> Cursor<&'a [u8]> {
    /// Next `len` bytes, borrowed for the buffer's lifetime.
    pub fn into_slice(self, len: usize) -> Result<&'a [u8], StorageError> {
        self.check(self.offset, len)?;
        let start = self.offset;
        Ok(&self.buf[start..start + len])
    }
}

impl<'a> Cursor<&'a mut [u8]> {
    pub fn into_slice_mut(self, len: usize) -> Result<&'a mut [u8], StorageError> {
        self.check(self.offset, len)?;
        let Cursor { buf, offset } = self;
        Ok(&mut buf[offset..offset + len])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_write_roundtrip_with_padding() {
        let mut bytes = [0u8; 16];
        let mut cursor = Cursor::new(&mut bytes[..]);
        cursor.write::<u8>(7).unwrap();
        cursor.align_to(4).unwrap();
        assert_eq!(cursor.offset(), 4);
        cursor.write::<i32>(-2).unwrap();
        cursor.align_to(8).unwrap();
        cursor.write::<f64>(1.5).unwrap();
        assert_eq!(cursor.remaining(), 0);

        let mut cursor = Cursor::new(&bytes[..]);
        assert_eq!(cursor.read::<u8>().unwrap(), 7);
        cursor.seek(4).unwrap();
        assert_eq!(cursor.read::<i32>().unwrap(), -2);
        cursor.advance(0).unwrap();
        cursor.seek(8).unwrap();
        assert_eq!(cursor.read::<f64>().unwrap(), 1.5);
    }

    #[test]
    fn test_out_of_bounds_is_an_error() {
        let mut bytes = [0u8; 6];
        let mut cursor = Cursor::new(&mut bytes[..]);
        cursor.advance(4).unwrap();
        assert_eq!(
            cursor.write::<u32>(1),
            Err(StorageError::OutOfBounds {
                offset: 4,
                size: 4,
                len: 6
            })
        );
        // A failed access leaves the position unchanged.
        assert_eq!(cursor.offset(), 4);
        assert!(cursor.seek(7).is_err());
        assert!(cursor.seek(6).is_ok());
        assert!(cursor.advance(1).is_err());
        assert!(cursor.align_to(8).is_err());
        assert!(cursor.advance(usize::MAX).is_err());
    }

    #[test]
    fn test_slices_advance() {
        let mut bytes = [1u8, 2, 3, 4];
        let mut cursor = Cursor::new(&mut bytes[..]);
        cursor.fill_zero(2).unwrap();
        assert_eq!(cursor.slice(2).unwrap(), &[3, 4]);
        assert_eq!(bytes, [0, 0, 3, 4]);

        let mut cursor = Cursor::new(&mut bytes[..]);
        cursor.seek(1).unwrap();
        let tail = cursor.into_slice_mut(3).unwrap();
        tail[2] = 9;
        assert_eq!(bytes, [0, 0, 3, 9]);

        let mut cursor = Cursor::new(&bytes[..]);
        cursor.seek(2).unwrap();
        assert!(cursor.into_slice(3).is_err());
    }
}
