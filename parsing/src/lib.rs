pub use parsing_macro::*;

use byteorder::{ByteOrder, LittleEndian};

/// Everything in an aseprite file is little endian, so the reader only knows that one order.
pub type LE = LittleEndian;

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("unexpected end of data at byte {offset}: wanted {wanted} bytes, {remaining} left")]
    UnexpectedEof {
        offset: usize,
        wanted: usize,
        remaining: usize,
    },
    #[error("magic number mismatch at byte {offset}: expected {expected:#x}, found {found:#x}")]
    MagicCheckFailed {
        offset: usize,
        expected: u64,
        found: u64,
    },
    #[error("invalid utf-8 string at byte {offset}")]
    InvalidUtf8 {
        offset: usize,
        #[source]
        source: std::str::Utf8Error,
    },
    #[error("cannot seek backwards from byte {from} to byte {to}")]
    SeekBackwards { from: usize, to: usize },
}

pub type Result<T> = std::result::Result<T, Error>;

pub trait ReadBytes<'a> {
    /// Absolute offset of the next byte to be read.
    fn position(&self) -> usize;
    fn remaining(&self) -> usize;
    fn read_bytes(&mut self, num: usize) -> Result<&'a [u8]>;
    fn read_rest(&mut self) -> &'a [u8];
    fn read_type<T: Parse<'a>>(&mut self) -> Result<T>;

    fn skip(&mut self, num: usize) -> Result<()> {
        self.read_bytes(num).map(|_| ())
    }
}

/// A cursor over a byte buffer.
///
/// Offsets reported by the reader (and in its errors) are always relative to
/// the start of the whole buffer, including for readers produced by
/// [`Reader::limit`].
#[derive(Clone, Debug)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    end: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            end: data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pos == self.end
    }

    /// Splits off the next `len` bytes as their own reader and advances past them.
    pub fn limit(&mut self, len: usize) -> Result<Reader<'a>> {
        self.check(len)?;
        let sub = Reader {
            data: self.data,
            pos: self.pos,
            end: self.pos + len,
        };
        self.pos += len;
        Ok(sub)
    }

    /// Moves forward to an absolute offset inside this reader's bounds.
    pub fn seek_to(&mut self, offset: usize) -> Result<()> {
        if offset < self.pos {
            return Err(Error::SeekBackwards {
                from: self.pos,
                to: offset,
            });
        }
        self.skip(offset - self.pos)
    }

    fn check(&self, num: usize) -> Result<()> {
        if num > self.end - self.pos {
            Err(Error::UnexpectedEof {
                offset: self.pos,
                wanted: num,
                remaining: self.end - self.pos,
            })
        } else {
            Ok(())
        }
    }
}

impl<'a> ReadBytes<'a> for Reader<'a> {
    fn position(&self) -> usize {
        self.pos
    }

    fn remaining(&self) -> usize {
        self.end - self.pos
    }

    fn read_bytes(&mut self, num: usize) -> Result<&'a [u8]> {
        self.check(num)?;
        let bytes = &self.data[self.pos..self.pos + num];
        self.pos += num;
        Ok(bytes)
    }

    fn read_rest(&mut self) -> &'a [u8] {
        let bytes = &self.data[self.pos..self.end];
        self.pos = self.end;
        bytes
    }

    fn read_type<T: Parse<'a>>(&mut self) -> Result<T> {
        T::parse(self)
    }
}

pub trait Parse<'a>: Sized {
    fn parse(input: &mut impl ReadBytes<'a>) -> Result<Self>;
}

macro_rules! impl_primitive_parse {
    ($typ: ty, $read: expr) => {
        impl<'a> Parse<'a> for $typ {
            fn parse(input: &mut impl ReadBytes<'a>) -> Result<Self> {
                let bytes = input.read_bytes(std::mem::size_of::<$typ>())?;
                Ok($read(bytes))
            }
        }

        impl<'a, const N: usize> Parse<'a> for [$typ; N] {
            fn parse(input: &mut impl ReadBytes<'a>) -> Result<Self> {
                let mut out = [<$typ>::default(); N];
                for i in out.iter_mut() {
                    *i = input.read_type::<$typ>()?;
                }
                Ok(out)
            }
        }
    };
}

impl_primitive_parse!(u8, |b: &[u8]| b[0]);
impl_primitive_parse!(i8, |b: &[u8]| b[0] as i8);
impl_primitive_parse!(u16, LE::read_u16);
impl_primitive_parse!(i16, LE::read_i16);
impl_primitive_parse!(u32, LE::read_u32);
impl_primitive_parse!(i32, LE::read_i32);
impl_primitive_parse!(u64, LE::read_u64);
impl_primitive_parse!(i64, LE::read_i64);

/// Strings are a WORD byte length followed by that many bytes of UTF-8.
impl<'a> Parse<'a> for String {
    fn parse(input: &mut impl ReadBytes<'a>) -> Result<Self> {
        let len = input.read_type::<u16>()?;
        let offset = input.position();
        let bytes = input.read_bytes(len as usize)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|source| Error::InvalidUtf8 { offset, source })
    }
}
