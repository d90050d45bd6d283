//! Byte buffer with independent read/write cursors
//!
//! [`ByteCursor`] is the serialization primitive every wire type is built on.
//! The buffer is zero-filled up to its capacity; the write cursor marks the
//! end of valid data and the read cursor trails it.
//!
//! ```text
//! 0            read          write          capacity
//! |-- consumed --|-- readable --|-- writable --|
//! ```
//!
//! Multi-byte primitives are written in the platform's byte order and the
//! just-written span is reversed when the cursor declares the other order,
//! so the bytes on the wire always follow [`ByteCursor::endianness`].

use bytes::{Bytes, BytesMut};

use super::{Result, WireError};

/// Maximum encoded width of a 32-bit varint.
pub const MAX_VARINT_LEN: usize = 5;

/// Byte order of multi-byte primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endianness {
    /// Least significant byte first (wire default)
    Little,
    /// Most significant byte first
    Big,
}

impl Endianness {
    /// Byte order of the target platform.
    #[cfg(target_endian = "little")]
    pub const NATIVE: Self = Self::Little;
    /// Byte order of the target platform.
    #[cfg(target_endian = "big")]
    pub const NATIVE: Self = Self::Big;

    /// The opposite byte order.
    #[must_use]
    pub const fn swapped(self) -> Self {
        match self {
            Self::Little => Self::Big,
            Self::Big => Self::Little,
        }
    }
}

impl Default for Endianness {
    fn default() -> Self {
        Self::Little
    }
}

/// Ownership and growth policy of a cursor's backing buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorFlags {
    owns_memory: bool,
    growable: bool,
}

impl CursorFlags {
    /// Whether the buffer was allocated by the cursor itself.
    #[must_use]
    pub const fn owns_memory(self) -> bool {
        self.owns_memory
    }

    /// Whether writes may reallocate the buffer.
    #[must_use]
    pub const fn growable(self) -> bool {
        self.growable
    }

    /// Growth requires both flags.
    #[must_use]
    pub const fn can_grow(self) -> bool {
        self.owns_memory && self.growable
    }
}

/// Growable or fixed byte buffer with read and write cursors.
#[derive(Debug, Clone)]
pub struct ByteCursor {
    buf: BytesMut,
    endianness: Endianness,
    flags: CursorFlags,
    read: usize,
    write: usize,
}

impl ByteCursor {
    /// Fixed-capacity cursor; writes past `capacity` fail.
    #[must_use]
    pub fn fixed(capacity: usize) -> Self {
        Self::allocate(capacity, false)
    }

    /// Cursor that reallocates when a write does not fit.
    #[must_use]
    pub fn growable(capacity: usize) -> Self {
        Self::allocate(capacity, true)
    }

    fn allocate(capacity: usize, growable: bool) -> Self {
        Self {
            buf: BytesMut::zeroed(capacity),
            endianness: Endianness::default(),
            flags: CursorFlags {
                owns_memory: true,
                growable,
            },
            read: 0,
            write: 0,
        }
    }

    /// Adopt an already-filled buffer for reading.
    ///
    /// The write cursor is placed at the end of `data` and the cursor never
    /// reallocates it.
    #[must_use]
    pub fn wrap(data: BytesMut) -> Self {
        let write = data.len();
        Self {
            buf: data,
            endianness: Endianness::default(),
            flags: CursorFlags {
                owns_memory: false,
                growable: false,
            },
            read: 0,
            write,
        }
    }

    /// Copy `data` into a new read-only cursor.
    #[must_use]
    pub fn from_slice(data: &[u8]) -> Self {
        Self::wrap(BytesMut::from(data))
    }

    /// Builder-style override of the declared byte order.
    #[must_use]
    pub fn with_endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = endianness;
        self
    }

    /// Declared byte order.
    #[must_use]
    pub const fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// Change the declared byte order for subsequent reads and writes.
    pub fn set_endianness(&mut self, endianness: Endianness) {
        self.endianness = endianness;
    }

    /// Ownership and growth flags.
    #[must_use]
    pub const fn flags(&self) -> CursorFlags {
        self.flags
    }

    /// Total bytes the buffer can hold without growing.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Bytes written so far.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.write
    }

    /// True when nothing has been written.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.write == 0
    }

    /// Offset of the read cursor.
    #[must_use]
    pub const fn read_position(&self) -> usize {
        self.read
    }

    /// Offset of the write cursor.
    #[must_use]
    pub const fn write_position(&self) -> usize {
        self.write
    }

    /// Bytes between the read and write cursors.
    #[must_use]
    pub const fn readable(&self) -> usize {
        self.write - self.read
    }

    /// Bytes between the write cursor and capacity.
    #[must_use]
    pub fn writable(&self) -> usize {
        self.capacity() - self.write
    }

    /// The written prefix of the buffer.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.write]
    }

    /// Bytes not yet consumed by the read cursor.
    #[must_use]
    pub fn unread(&self) -> &[u8] {
        &self.buf[self.read..self.write]
    }

    /// Consume the cursor and return its written bytes.
    #[must_use]
    pub fn into_bytes(mut self) -> Bytes {
        self.buf.truncate(self.write);
        self.buf.freeze()
    }

    /// Rewind the read cursor to the start of the buffer.
    pub fn reset_read(&mut self) {
        self.read = 0;
    }

    /// Discard all written data; capacity is kept.
    pub fn reset_write(&mut self) {
        self.write = 0;
        self.read = 0;
    }

    /// Reallocate with `extra` additional bytes of capacity.
    ///
    /// Only the written prefix is copied; both cursors keep their offsets.
    pub fn grow(&mut self, extra: usize) -> Result<()> {
        if !self.flags.can_grow() {
            return Err(WireError::BufferFull {
                needed: self.writable() + extra,
                available: self.writable(),
            });
        }
        let mut next = BytesMut::zeroed(self.capacity() + extra);
        next[..self.write].copy_from_slice(&self.buf[..self.write]);
        self.buf = next;
        Ok(())
    }

    fn ensure_writable(&mut self, needed: usize) -> Result<()> {
        let available = self.writable();
        if needed <= available {
            return Ok(());
        }
        if !self.flags.can_grow() {
            return Err(WireError::BufferFull { needed, available });
        }
        let shortfall = needed - available;
        self.grow(shortfall.max(self.capacity()).max(16))
    }

    /// Append `data`, byte-swapping the span when the declared byte order
    /// differs from the platform's.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        let start = self.write;
        self.write_raw(data)?;
        if self.endianness != Endianness::NATIVE {
            self.buf[start..self.write].reverse();
        }
        Ok(())
    }

    /// Append `data` verbatim, ignoring the declared byte order.
    pub fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        self.ensure_writable(data.len())?;
        let end = self.write + data.len();
        self.buf[self.write..end].copy_from_slice(data);
        self.write = end;
        Ok(())
    }

    /// Copy up to `out.len()` bytes, undoing the byte-order swap.
    ///
    /// Returns the number of bytes that were readable before the call, which
    /// may exceed `out.len()`; the bytes copied are the smaller of the two.
    pub fn read_bytes(&mut self, out: &mut [u8]) -> usize {
        let readable = self.readable();
        let n = readable.min(out.len());
        out[..n].copy_from_slice(&self.buf[self.read..self.read + n]);
        if self.endianness != Endianness::NATIVE {
            out[..n].reverse();
        }
        self.read += n;
        readable
    }

    /// Fill `out` exactly with unswapped bytes.
    pub fn read_raw(&mut self, out: &mut [u8]) -> Result<()> {
        self.require(out.len())?;
        out.copy_from_slice(&self.buf[self.read..self.read + out.len()]);
        self.read += out.len();
        Ok(())
    }

    /// Advance the read cursor by `n` bytes without copying.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.require(n)?;
        self.read += n;
        Ok(())
    }

    fn require(&self, needed: usize) -> Result<()> {
        let available = self.readable();
        if needed > available {
            return Err(WireError::Truncated { needed, available });
        }
        Ok(())
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        self.require(N)?;
        let mut out = [0u8; N];
        self.read_bytes(&mut out);
        Ok(out)
    }

    /// Overwrite two already-written bytes at `offset` in the declared order.
    pub fn patch_u16(&mut self, offset: usize, value: u16) -> Result<()> {
        let bytes = match self.endianness {
            Endianness::Little => value.to_le_bytes(),
            Endianness::Big => value.to_be_bytes(),
        };
        self.patch(offset, &bytes)
    }

    /// Overwrite one already-written byte at `offset`.
    pub fn patch_u8(&mut self, offset: usize, value: u8) -> Result<()> {
        self.patch(offset, &[value])
    }

    fn patch(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        let end = offset + bytes.len();
        if end > self.write {
            return Err(WireError::Truncated {
                needed: end,
                available: self.write,
            });
        }
        self.buf[offset..end].copy_from_slice(bytes);
        Ok(())
    }

    /// Read a `u16` at an absolute offset without moving the read cursor.
    pub fn peek_u16_at(&self, offset: usize) -> Result<u16> {
        let end = offset + 2;
        if end > self.write {
            return Err(WireError::Truncated {
                needed: end,
                available: self.write,
            });
        }
        let bytes = [self.buf[offset], self.buf[offset + 1]];
        Ok(match self.endianness {
            Endianness::Little => u16::from_le_bytes(bytes),
            Endianness::Big => u16::from_be_bytes(bytes),
        })
    }

    /// Read a byte at an absolute offset without moving the read cursor.
    pub fn peek_u8_at(&self, offset: usize) -> Result<u8> {
        if offset >= self.write {
            return Err(WireError::Truncated {
                needed: offset + 1,
                available: self.write,
            });
        }
        Ok(self.buf[offset])
    }

    /// Append `value` as LEB128: 7-bit groups, least significant first.
    pub fn write_varint(&mut self, value: u32) -> Result<()> {
        let mut encoded = [0u8; MAX_VARINT_LEN];
        let len = encode_varint(value, &mut encoded);
        self.write_raw(&encoded[..len])
    }

    /// Read a LEB128 value. The read cursor is untouched on failure.
    pub fn read_varint(&mut self) -> Result<u32> {
        let start = self.read;
        let result = self.read_varint_inner();
        if result.is_err() {
            self.read = start;
        }
        result
    }

    fn read_varint_inner(&mut self) -> Result<u32> {
        let mut value = 0u32;
        for shift in (0..32).step_by(7) {
            let [byte] = self.read_array::<1>()?;
            if shift == 28 && byte & 0x70 != 0 {
                return Err(WireError::InvalidVarint {
                    max_bytes: MAX_VARINT_LEN,
                });
            }
            value |= u32::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(WireError::InvalidVarint {
            max_bytes: MAX_VARINT_LEN,
        })
    }

    /// Append a varint length prefix followed by the UTF-8 bytes of `value`.
    ///
    /// Nothing is written when the whole field does not fit.
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        let len = u32::try_from(value.len()).map_err(|_| WireError::LengthOverflow {
            len: value.len(),
            max: u32::MAX as usize,
        })?;
        let needed = varint_len(len) + value.len();
        self.ensure_writable(needed)?;
        self.write_varint(len)?;
        self.write_raw(value.as_bytes())
    }

    /// Read a varint-prefixed UTF-8 string. The read cursor is untouched on
    /// failure.
    pub fn read_string(&mut self) -> Result<String> {
        let start = self.read;
        let result = self.read_string_inner();
        if result.is_err() {
            self.read = start;
        }
        result
    }

    fn read_string_inner(&mut self) -> Result<String> {
        let len = self.read_varint()? as usize;
        self.require(len)?;
        let text = std::str::from_utf8(&self.buf[self.read..self.read + len])
            .map_err(|_| WireError::InvalidUtf8)?
            .to_owned();
        self.read += len;
        Ok(text)
    }
}

macro_rules! primitives {
    ($($ty:ty => $write:ident, $read:ident;)*) => {
        impl ByteCursor {
            $(
                #[doc = concat!("Append a `", stringify!($ty), "` in the declared byte order.")]
                pub fn $write(&mut self, value: $ty) -> Result<()> {
                    self.write_bytes(&value.to_ne_bytes())
                }

                #[doc = concat!("Read a `", stringify!($ty), "` in the declared byte order.")]
                pub fn $read(&mut self) -> Result<$ty> {
                    Ok(<$ty>::from_ne_bytes(self.read_array()?))
                }
            )*
        }
    };
}

primitives! {
    u8 => write_u8, read_u8;
    i8 => write_i8, read_i8;
    u16 => write_u16, read_u16;
    i16 => write_i16, read_i16;
    u32 => write_u32, read_u32;
    i32 => write_i32, read_i32;
    u64 => write_u64, read_u64;
    i64 => write_i64, read_i64;
    f32 => write_f32, read_f32;
    f64 => write_f64, read_f64;
}

/// Encoded width of `value` as a varint.
#[must_use]
pub const fn varint_len(mut value: u32) -> usize {
    let mut len = 1;
    while value >= 0x80 {
        value >>= 7;
        len += 1;
    }
    len
}

fn encode_varint(mut value: u32, out: &mut [u8; MAX_VARINT_LEN]) -> usize {
    let mut offset = 0;
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        out[offset] = byte;
        offset += 1;
        if value == 0 {
            return offset;
        }
    }
}
