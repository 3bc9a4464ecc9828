use crate::ingest::text::split_lines_keep_ends;
use anyhow::{Context, Result};
use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};
use std::io::Read;

#[derive(Debug, Clone)]
pub struct DecodedMember {
    pub encoding: &'static str,
    pub had_replacements: bool,
    pub lines: Vec<String>,
}

/// Pick an encoding for `bytes`. A byte-order mark wins; empty input has
/// nothing to detect and falls back to UTF-8.
pub fn detect_encoding(bytes: &[u8]) -> &'static Encoding {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return encoding;
    }
    if bytes.is_empty() {
        return UTF_8;
    }
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    detector.guess(None, true)
}

/// Decode raw member bytes into lines, replacing undecodable sequences with
/// U+FFFD. A leading BOM is stripped.
pub fn decode_lines(bytes: &[u8]) -> DecodedMember {
    let encoding = detect_encoding(bytes);
    let (text, used, had_replacements) = encoding.decode(bytes);
    DecodedMember {
        encoding: used.name(),
        had_replacements,
        lines: split_lines_keep_ends(&text),
    }
}

/// Read the whole member into memory before decoding it.
pub fn read_member_lines<R: Read>(mut source: R) -> Result<DecodedMember> {
    let mut bytes = Vec::new();
    source
        .read_to_end(&mut bytes)
        .context("failed to read archive member")?;
    Ok(decode_lines(&bytes))
}
