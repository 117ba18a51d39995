//! Little-endian cursor reader and writer for fixed-width packet layouts.

use super::DecodeError;

/// Cursor-style reader over a little-endian byte buffer.
///
/// Every read is bounds-checked and advances the cursor by the field width.
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn at(data: &'a [u8], offset: usize) -> Self {
        Self { data, pos: offset }
    }

    /// Current cursor offset from the start of the buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let end = self.pos.checked_add(N).filter(|end| *end <= self.data.len()).ok_or(
            DecodeError::OutOfBounds { offset: self.pos, width: N, len: self.data.len() },
        )?;
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(&self.data[self.pos..end]);
        self.pos = end;
        Ok(bytes)
    }

    #[inline]
    pub fn u8(&mut self) -> Result<u8, DecodeError> {
        self.take::<1>().map(|b| b[0])
    }

    #[inline]
    pub fn i8(&mut self) -> Result<i8, DecodeError> {
        self.take::<1>().map(i8::from_le_bytes)
    }

    #[inline]
    pub fn u16_le(&mut self) -> Result<u16, DecodeError> {
        self.take::<2>().map(u16::from_le_bytes)
    }

    #[inline]
    pub fn u32_le(&mut self) -> Result<u32, DecodeError> {
        self.take::<4>().map(u32::from_le_bytes)
    }

    #[inline]
    pub fn u64_le(&mut self) -> Result<u64, DecodeError> {
        self.take::<8>().map(u64::from_le_bytes)
    }

    #[inline]
    pub fn f32_le(&mut self) -> Result<f32, DecodeError> {
        self.take::<4>().map(f32::from_le_bytes)
    }

    pub fn u8_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        self.take::<N>()
    }

    pub fn u16_le_array<const N: usize>(&mut self) -> Result<[u16; N], DecodeError> {
        let mut arr = [0u16; N];
        for item in arr.iter_mut() {
            *item = self.u16_le()?;
        }
        Ok(arr)
    }

    pub fn f32_le_array<const N: usize>(&mut self) -> Result<[f32; N], DecodeError> {
        let mut arr = [0.0f32; N];
        for item in arr.iter_mut() {
            *item = self.f32_le()?;
        }
        Ok(arr)
    }

    pub fn skip(&mut self, n: usize) -> Result<(), DecodeError> {
        let end = self.pos.checked_add(n).filter(|end| *end <= self.data.len()).ok_or(
            DecodeError::OutOfBounds { offset: self.pos, width: n, len: self.data.len() },
        )?;
        self.pos = end;
        Ok(())
    }

    /// Move the cursor to an absolute offset.
    pub fn seek(&mut self, offset: usize) -> Result<(), DecodeError> {
        if offset > self.data.len() {
            return Err(DecodeError::OutOfBounds { offset, width: 0, len: self.data.len() });
        }
        self.pos = offset;
        Ok(())
    }
}

/// Append-only little-endian writer, the mirror image of [`ByteReader`].
#[derive(Debug, Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { buf: Vec::with_capacity(capacity) }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn i8(&mut self, v: i8) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn u16_le(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn u32_le(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn u64_le(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn f32_le(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn bytes(&mut self, v: &[u8]) {
        self.buf.extend_from_slice(v);
    }

    pub fn u16_le_array(&mut self, v: &[u16]) {
        for item in v {
            self.u16_le(*item);
        }
    }

    pub fn f32_le_array(&mut self, v: &[f32]) {
        for item in v {
            self.f32_le(*item);
        }
    }

    pub fn zeros(&mut self, n: usize) {
        self.buf.resize(self.buf.len() + n, 0);
    }

    /// Zero-pad up to an absolute offset; no-op when already past it.
    pub fn pad_to(&mut self, offset: usize) {
        if offset > self.buf.len() {
            self.buf.resize(offset, 0);
        }
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}
