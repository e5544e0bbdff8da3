use crate::error::{DecodeError, Result};

/// Forward reader over one byte range of a log buffer
///
/// Positions are absolute offsets into the underlying buffer, so errors and
/// frame offsets can be reported against the original file.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    start: usize,
    end: usize,
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    /// Cursor over the whole buffer
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            start: 0,
            end: data.len(),
            pos: 0,
        }
    }

    /// Cursor over `[start, end)`, clamped to the buffer
    pub fn with_range(data: &'a [u8], start: usize, end: usize) -> Self {
        let end = end.min(data.len());
        let start = start.min(end);
        Self {
            data,
            start,
            end,
            pos: start,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn remaining(&self) -> usize {
        self.end.saturating_sub(self.pos)
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.end
    }

    /// Move to an absolute offset, clamped to the cursor's range
    pub fn seek(&mut self, offset: usize) {
        self.pos = offset.clamp(self.start, self.end);
    }

    pub fn peek_byte(&self) -> Option<u8> {
        if self.pos < self.end {
            Some(self.data[self.pos])
        } else {
            None
        }
    }

    pub fn read_byte(&mut self) -> Result<u8> {
        if self.pos < self.end {
            let byte = self.data[self.pos];
            self.pos += 1;
            Ok(byte)
        } else {
            Err(DecodeError::EndOfData { offset: self.pos })
        }
    }

    /// Read exactly `n` bytes; on failure the position is left unchanged
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(DecodeError::EndOfData { offset: self.end });
        }
        let data: &'a [u8] = self.data;
        let slice = &data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_byte_until_end() {
        let data = [1u8, 2, 3];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_byte(), Ok(1));
        assert_eq!(cursor.read_byte(), Ok(2));
        assert_eq!(cursor.remaining(), 1);
        assert_eq!(cursor.read_byte(), Ok(3));
        assert!(cursor.is_eof());
        assert_eq!(cursor.read_byte(), Err(DecodeError::EndOfData { offset: 3 }));
    }

    #[test]
    fn test_range_positions_are_absolute() {
        let data = b"xxABCDyy";
        let mut cursor = ByteCursor::with_range(data, 2, 6);
        assert_eq!(cursor.position(), 2);
        assert_eq!(cursor.peek_byte(), Some(b'A'));
        assert_eq!(cursor.read_bytes(3), Ok(&b"ABC"[..]));
        assert_eq!(cursor.position(), 5);
        assert!(cursor.read_bytes(2).is_err());
        assert_eq!(cursor.position(), 5, "failed read must not advance");
        assert_eq!(cursor.read_byte(), Ok(b'D'));
        assert_eq!(cursor.peek_byte(), None);
    }

    #[test]
    fn test_seek_is_clamped() {
        let data = [0u8; 10];
        let mut cursor = ByteCursor::with_range(&data, 2, 8);
        cursor.seek(0);
        assert_eq!(cursor.position(), 2);
        cursor.seek(100);
        assert_eq!(cursor.position(), 8);
        assert_eq!(cursor.remaining(), 0);
    }
}
