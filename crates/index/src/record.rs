//! Byte layout of the flat-file corpus.
//!
//! ```text
//! 0000000000001\n                 <- header: entry count, 13 digits
//! 0000019\nMIT\n1s0ua:2ld\n4\n5\n  <- record: body length (7 digits), body
//! ```
//!
//! A record body is `\n{name}\n{hash}\n{block_size}\n{hash_length}\n` and its
//! length prefix counts body bytes. Records carry no separator of their own;
//! the length prefix is the only framing.

use crate::{CorpusEntry, IndexError};

/// Digits in the file header's entry count.
pub const COUNT_WIDTH: usize = 13;
/// Bytes in the file header, including its trailing newline.
pub const HEADER_LEN: usize = COUNT_WIDTH + 1;
/// Digits in a record's length prefix.
pub const LENGTH_WIDTH: usize = 7;
/// Largest body a 7 digit prefix can describe.
pub const MAX_BODY_LEN: usize = 9_999_999;

/// Renders the file header for `count` entries.
pub fn encode_header(count: usize) -> String {
    format!("{count:0width$}\n", width = COUNT_WIDTH)
}

/// Reads the entry count from the first [`HEADER_LEN`] bytes of a file.
pub fn decode_header(buf: &[u8]) -> Result<usize, IndexError> {
    let digits = buf
        .get(..COUNT_WIDTH)
        .ok_or_else(|| IndexError::decode("header shorter than 13 bytes"))?;
    if buf.get(COUNT_WIDTH) != Some(&b'\n') {
        return Err(IndexError::decode("header not terminated by newline"));
    }
    parse_digits(digits, "entry count")
}

/// Encodes one record: length prefix followed by body.
///
/// Names containing a newline cannot be framed and are rejected.
pub fn encode_record(entry: &CorpusEntry) -> Result<Vec<u8>, IndexError> {
    if entry.name.contains('\n') {
        return Err(IndexError::Encode(format!(
            "entry name {:?} contains a newline",
            entry.name
        )));
    }
    let body = format!(
        "\n{}\n{}\n{}\n{}\n",
        entry.name, entry.hash, entry.block_size, entry.hash_length
    );
    if body.len() > MAX_BODY_LEN {
        return Err(IndexError::Encode(format!(
            "record body of {} bytes exceeds {MAX_BODY_LEN}",
            body.len()
        )));
    }

    let mut out = Vec::with_capacity(LENGTH_WIDTH + body.len());
    out.extend_from_slice(format!("{:0width$}", body.len(), width = LENGTH_WIDTH).as_bytes());
    out.extend_from_slice(body.as_bytes());
    Ok(out)
}

/// Parses a 7 digit length prefix.
pub fn decode_length(prefix: &[u8]) -> Result<usize, IndexError> {
    if prefix.len() != LENGTH_WIDTH {
        return Err(IndexError::decode(format!(
            "length prefix must be {LENGTH_WIDTH} bytes, got {}",
            prefix.len()
        )));
    }
    parse_digits(prefix, "record length")
}

/// Decodes a record body (without its length prefix).
pub fn decode_body(body: &[u8]) -> Result<CorpusEntry, IndexError> {
    let text = std::str::from_utf8(body).map_err(IndexError::decode)?;
    let inner = text
        .strip_prefix('\n')
        .and_then(|rest| rest.strip_suffix('\n'))
        .ok_or_else(|| IndexError::decode("record body must start and end with a newline"))?;

    let fields: Vec<&str> = inner.split('\n').collect();
    let [name, hash, block_size, hash_length] = fields.as_slice() else {
        return Err(IndexError::Decode(format!(
            "expected 4 record fields, found {}",
            fields.len()
        )));
    };

    Ok(CorpusEntry {
        name: (*name).to_string(),
        hash: hash.parse().map_err(IndexError::decode)?,
        block_size: parse_digits(block_size.as_bytes(), "block size")?,
        hash_length: parse_digits(hash_length.as_bytes(), "hash length")?,
    })
}

/// Decodes a buffer of back-to-back records (no file header).
///
/// ```rust
/// use index::record::{encode_record, parse_records};
/// use index::CorpusEntry;
///
/// let entry = CorpusEntry::compute("MIT", b"abcdefghij", 4, 5).unwrap();
/// let buf = encode_record(&entry).unwrap();
/// assert_eq!(parse_records(&buf).unwrap(), vec![entry]);
/// ```
pub fn parse_records(buf: &[u8]) -> Result<Vec<CorpusEntry>, IndexError> {
    let mut entries = Vec::new();
    let mut offset = 0;
    while offset < buf.len() {
        let prefix = buf
            .get(offset..offset + LENGTH_WIDTH)
            .ok_or_else(|| IndexError::decode(format!("truncated length prefix at {offset}")))?;
        let len = decode_length(prefix)?;
        let start = offset + LENGTH_WIDTH;
        let body = buf
            .get(start..start + len)
            .ok_or_else(|| IndexError::decode(format!("truncated record body at {start}")))?;
        entries.push(decode_body(body)?);
        offset = start + len;
    }
    Ok(entries)
}

fn parse_digits(digits: &[u8], what: &str) -> Result<usize, IndexError> {
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return Err(IndexError::Decode(format!(
            "{what} is not a decimal number: {:?}",
            String::from_utf8_lossy(digits)
        )));
    }
    digits.iter().try_fold(0usize, |acc, d| {
        acc.checked_mul(10)
            .and_then(|acc| acc.checked_add(usize::from(d - b'0')))
            .ok_or_else(|| IndexError::Decode(format!("{what} overflows")))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, hash: &str, block_size: usize, hash_length: usize) -> CorpusEntry {
        CorpusEntry::new(name, hash.parse().expect("hash"), block_size, hash_length)
    }

    #[test]
    fn header_layout() {
        assert_eq!(encode_header(0), "0000000000000\n");
        assert_eq!(encode_header(42), "0000000000042\n");
        assert_eq!(encode_header(42).len(), HEADER_LEN);
        assert_eq!(decode_header(b"0000000000042\n").unwrap(), 42);
    }

    #[test]
    fn header_rejects_garbage() {
        assert!(decode_header(b"00000000042\n").is_err());
        assert!(decode_header(b"000000000004x\n").is_err());
        assert!(decode_header(b"0000000000042 ").is_err());
    }

    #[test]
    fn record_layout_matches_corpus_files() {
        let bytes = encode_record(&entry("MIT", "1s0ua:2ld", 4, 5)).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, "0000019\nMIT\n1s0ua:2ld\n4\n5\n");
    }

    #[test]
    fn length_counts_utf8_bytes() {
        let bytes = encode_record(&entry("Zürich", "a", 10, 7)).unwrap();
        let body_len = bytes.len() - LENGTH_WIDTH;
        assert_eq!(decode_length(&bytes[..LENGTH_WIDTH]).unwrap(), body_len);
    }

    #[test]
    fn newline_in_name_rejected() {
        let err = encode_record(&entry("bad\nname", "a", 4, 5)).unwrap_err();
        assert!(matches!(err, IndexError::Encode(_)));
    }

    #[test]
    fn parse_recovers_records_in_order() {
        let entries = vec![
            entry("Apache-2.0", "-xyzu5h:22ci", 10, 7),
            entry("MIT", "", 4, 5),
            entry("MIT", "2p", 4, 5),
        ];
        let mut buf = Vec::new();
        for e in &entries {
            buf.extend(encode_record(e).unwrap());
        }
        assert_eq!(parse_records(&buf).unwrap(), entries);
    }

    #[test]
    fn parse_empty_buffer() {
        assert!(parse_records(b"").unwrap().is_empty());
    }

    #[test]
    fn parse_rejects_truncation() {
        let buf = encode_record(&entry("MIT", "22ci", 4, 5)).unwrap();
        assert!(matches!(
            parse_records(&buf[..buf.len() - 1]),
            Err(IndexError::Decode(_))
        ));
        assert!(matches!(parse_records(&buf[..3]), Err(IndexError::Decode(_))));
    }

    #[test]
    fn body_with_wrong_field_count_rejected() {
        assert!(decode_body(b"\nMIT\n22ci\n4\n").is_err());
        assert!(decode_body(b"\nMIT\n22ci\n4\n5\nextra\n").is_err());
        assert!(decode_body(b"MIT\n22ci\n4\n5\n").is_err());
    }

    #[test]
    fn body_with_bad_hash_rejected() {
        assert!(matches!(
            decode_body(b"\nMIT\nNOT-A-HASH\n4\n5\n"),
            Err(IndexError::Decode(_))
        ));
    }
}
