//! Bounds-checked big-endian reader over an in-memory disc file.

use crate::{Error, Result};
use bytes::Buf;

/// Cursor over the bytes of one clip-info or playlist file.
///
/// Every read checks the remaining length first and reports
/// [`Error::Truncated`] with the file name, so malformed input never panics.
pub(crate) struct BinReader<'a> {
    file: &'a str,
    data: &'a [u8],
    pos: usize,
}

impl<'a> BinReader<'a> {
    pub fn new(file: &'a str, data: &'a [u8]) -> Self {
        Self { file, data, pos: 0 }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Move to an absolute offset. Seeking to the very end is allowed.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(self.truncated(pos, 0));
        }
        self.pos = pos;
        Ok(())
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }

    pub fn u8(&mut self) -> Result<u8> {
        let mut buf = self.take(1)?;
        Ok(buf.get_u8())
    }

    pub fn u16(&mut self) -> Result<u16> {
        let mut buf = self.take(2)?;
        Ok(buf.get_u16())
    }

    pub fn u32(&mut self) -> Result<u32> {
        let mut buf = self.take(4)?;
        Ok(buf.get_u32())
    }

    /// Fixed-length ASCII field (clip names, codec ids, language codes).
    pub fn ascii(&mut self, n: usize) -> Result<String> {
        let bytes = self.take(n)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Read a 32-bit address field and check it points inside the file.
    pub fn address(&mut self) -> Result<usize> {
        let at = self.pos;
        let address = self.u32()? as usize;
        if address > self.data.len() {
            return Err(Error::invalid_data(
                self.file,
                format!("address {:#x} at offset {} is past end of file", address, at),
            ));
        }
        Ok(address)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = match self.pos.checked_add(n) {
            Some(end) if end <= self.data.len() => end,
            _ => return Err(self.truncated(self.pos, n)),
        };
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn truncated(&self, offset: usize, need: usize) -> Error {
        Error::Truncated {
            file: self.file.to_string(),
            offset,
            need,
            have: self.data.len().saturating_sub(offset),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_big_endian_reads() {
        let data = [0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE];
        let mut r = BinReader::new("t", &data);
        assert_eq!(r.u8().unwrap(), 0x12);
        assert_eq!(r.u16().unwrap(), 0x3456);
        assert_eq!(r.u32().unwrap(), 0x789A_BCDE);
        assert_eq!(r.pos(), 7);
    }

    #[test]
    fn test_truncated_read_reports_position() {
        let data = [0x00, 0x01];
        let mut r = BinReader::new("00001.CLPI", &data);
        r.u8().unwrap();
        let err = r.u32().unwrap_err();
        assert_matches!(
            err,
            Error::Truncated { offset: 1, need: 4, have: 1, .. }
        );
        // A failed read does not move the cursor.
        assert_eq!(r.pos(), 1);
    }

    #[test]
    fn test_seek_bounds() {
        let data = [0u8; 4];
        let mut r = BinReader::new("t", &data);
        assert!(r.seek(4).is_ok());
        assert!(r.u8().is_err());
        assert!(r.seek(5).is_err());
    }

    #[test]
    fn test_address_past_end() {
        let data = [0x00, 0x00, 0x01, 0x00];
        let mut r = BinReader::new("t", &data);
        assert_matches!(r.address(), Err(Error::InvalidData { .. }));
    }

    #[test]
    fn test_ascii() {
        let data = *b"00001M2TS";
        let mut r = BinReader::new("t", &data);
        assert_eq!(r.ascii(5).unwrap(), "00001");
        assert_eq!(r.ascii(4).unwrap(), "M2TS");
    }
}
