use std::io::{self, BufReader, ErrorKind, Read};
use std::str::Chars;

use crate::error::DetResult;

/// A finite stream of characters consumed one at a time.
pub trait CharSource {
    /// Next character, or `None` once the stream is exhausted.
    fn next_char(&mut self) -> DetResult<Option<char>>;
}

// ---------------------------------------------------------------------------
// In-memory source
// ---------------------------------------------------------------------------

pub struct StrSource<'a> {
    chars: Chars<'a>,
}

impl<'a> StrSource<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            chars: text.chars(),
        }
    }
}

impl CharSource for StrSource<'_> {
    fn next_char(&mut self) -> DetResult<Option<char>> {
        Ok(self.chars.next())
    }
}

// ---------------------------------------------------------------------------
// Reader source
// ---------------------------------------------------------------------------

/// Decodes UTF-8 incrementally from any byte reader.
pub struct ReaderSource<R: Read> {
    reader: BufReader<R>,
}

impl<R: Read> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
        }
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.reader.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

impl<R: Read> CharSource for ReaderSource<R> {
    fn next_char(&mut self) -> DetResult<Option<char>> {
        let Some(lead) = self.read_byte()? else {
            return Ok(None);
        };

        let width = match lead {
            0x00..=0x7F => return Ok(Some(char::from(lead))),
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => return Err(invalid_utf8(format!("unexpected byte 0x{lead:02x}")).into()),
        };

        let mut buf = [0u8; 4];
        buf[0] = lead;
        self.reader.read_exact(&mut buf[1..width])?;
        let decoded = std::str::from_utf8(&buf[..width]).map_err(|e| invalid_utf8(e.to_string()))?;
        Ok(decoded.chars().next())
    }
}

fn invalid_utf8(detail: String) -> io::Error {
    io::Error::new(ErrorKind::InvalidData, format!("input is not valid UTF-8: {detail}"))
}
