//! Text persistence for BitVector
//!
//! Format:
//!
//! ```text
//! <bit count>\n
//! <bit 0><bit 1>...<bit n-1>     each bit is '0' or '1'
//! ```

use super::{BitVector, MASK};
use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;

impl BitVector {
    /// Write the bit count line followed by the bit string
    pub fn save<W: Write>(&self, mut writer: W) -> Result<()> {
        write!(writer, "{}\n{}", self.bits, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Replace the contents with a bit vector written by [`BitVector::save`].
    ///
    /// Exactly as many characters as the count line announces are consumed.
    /// The body is read before any bit storage is sized, so a count larger
    /// than the input is reported as a format error. On error the vector is
    /// left unchanged.
    pub fn load<R: BufRead>(&mut self, mut reader: R) -> Result<()> {
        let mut header = String::new();
        if reader.read_line(&mut header)? == 0 {
            return Err(Error::Format("missing bit count line".to_string()));
        }
        let bits: usize = header.trim().parse().map_err(|e| {
            Error::Format(format!("invalid bit count {:?}: {}", header.trim(), e))
        })?;

        let mut words: Vec<u64> = Vec::new();
        let mut word = 0u64;
        let mut read = 0usize;
        let mut body = reader.take(bits as u64);
        loop {
            let chunk = body.fill_buf()?;
            if chunk.is_empty() {
                break;
            }
            for &c in chunk {
                match c {
                    b'1' => word |= 1u64 << (read & MASK),
                    b'0' => {}
                    other => {
                        return Err(Error::Format(format!(
                            "unexpected character {:?} at bit {}",
                            other as char, read
                        )))
                    }
                }
                read += 1;
                if read & MASK == 0 {
                    words.push(word);
                    word = 0;
                }
            }
            let len = chunk.len();
            body.consume(len);
        }

        if read < bits {
            return Err(Error::Format(format!(
                "expected {} bit characters, found {}",
                bits, read
            )));
        }
        if read & MASK != 0 {
            words.push(word);
        }

        if words.len() > self.data.len() {
            self.data = words;
        } else {
            self.zero();
            self.data[..words.len()].copy_from_slice(&words);
        }
        self.bits = bits;
        Ok(())
    }

    /// Build a new bit vector from a reader
    pub fn read_from<R: BufRead>(reader: R) -> Result<Self> {
        let mut bv = Self::new();
        bv.load(reader)?;
        Ok(bv)
    }

    /// Save to a file, creating or truncating it
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)?;
        self.save(BufWriter::new(file))?;
        debug!(path = ?path, bits = self.bits, "Saved bit vector");
        Ok(())
    }

    /// Load from a file written by [`BitVector::save_to_path`]
    pub fn load_from_path<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::open(path)?;
        self.load(BufReader::new(file))?;
        debug!(path = ?path, bits = self.bits, "Loaded bit vector");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    #[test]
    fn test_save_format() -> Result<()> {
        let mut bv = BitVector::with_bits(6);
        bv.set(0);
        bv.set(4);

        let mut out = Vec::new();
        bv.save(&mut out)?;
        assert_eq!(out, b"6\n100010");
        Ok(())
    }

    #[test]
    fn test_save_load_round_trip() -> Result<()> {
        let mut bv = BitVector::with_bits(131);
        for i in (0..131).filter(|i| i % 7 == 0 || i % 11 == 3) {
            bv.set(i);
        }

        let mut out = Vec::new();
        bv.save(&mut out)?;

        let restored = BitVector::read_from(Cursor::new(out))?;
        assert_eq!(restored, bv);
        Ok(())
    }

    #[test]
    fn test_load_replaces_previous_contents() -> Result<()> {
        let mut bv = BitVector::with_bits(500);
        for i in 0..500 {
            bv.set(i);
        }
        bv.load(Cursor::new(b"3\n010".to_vec()))?;
        assert_eq!(bv.bits(), 3);
        assert_eq!(bv.ones().collect::<Vec<_>>(), vec![1]);
        Ok(())
    }

    #[test]
    fn test_load_consumes_exactly_count_characters() -> Result<()> {
        let mut reader = Cursor::new(b"2\n11trailing".to_vec());
        let bv = BitVector::read_from(&mut reader)?;
        assert_eq!(bv.to_string(), "11");

        let mut rest = String::new();
        reader.read_to_string(&mut rest)?;
        assert_eq!(rest, "trailing");
        Ok(())
    }

    #[test]
    fn test_load_rejects_malformed_input() {
        let short = BitVector::read_from(Cursor::new(b"5\n101".to_vec()));
        assert!(matches!(short, Err(Error::Format(_))));

        let bad_char = BitVector::read_from(Cursor::new(b"3\n1x1".to_vec()));
        assert!(matches!(bad_char, Err(Error::Format(_))));

        let bad_count = BitVector::read_from(Cursor::new(b"many\n1".to_vec()));
        assert!(matches!(bad_count, Err(Error::Format(_))));

        let empty = BitVector::read_from(Cursor::new(Vec::new()));
        assert!(matches!(empty, Err(Error::Format(_))));
    }

    #[test]
    fn test_load_rejects_counts_beyond_input() {
        let mut bv = BitVector::with_bits(4);
        bv.set(2);

        let huge = bv.load(Cursor::new(b"18446744073709551615\n0".to_vec()));
        assert!(matches!(huge, Err(Error::Format(_))));

        let large = bv.load(Cursor::new(b"1099511627776\n0".to_vec()));
        assert!(matches!(large, Err(Error::Format(_))));

        // failed loads leave the previous contents in place
        assert_eq!(bv.to_string(), "0010");
    }

    #[test]
    fn test_load_reuses_larger_storage() -> Result<()> {
        let mut bv = BitVector::with_bits(640);
        bv.set(600);
        let text = format!("70\n1{}1", "0".repeat(68));
        bv.load(Cursor::new(text.into_bytes()))?;
        assert_eq!(bv.bits(), 70);
        assert_eq!(bv.words(), 10);
        assert_eq!(bv.ones().collect::<Vec<_>>(), vec![0, 69]);
        Ok(())
    }

    #[test]
    fn test_empty_vector_round_trip() -> Result<()> {
        let mut out = Vec::new();
        BitVector::new().save(&mut out)?;
        assert_eq!(out, b"0\n");
        let restored = BitVector::read_from(Cursor::new(out))?;
        assert!(restored.is_empty());
        Ok(())
    }
}
