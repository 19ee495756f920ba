//! gzip+base64 encoding for raw scraped text before it's handed to the TextAnalyzer (§4.3
//! step 6). Neither crate is used together anywhere in the teacher, but each is individually
//! grounded elsewhere in the retrieved pack — see `DESIGN.md`.

use base64::Engine;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::Write;

/// gzip-compress `text` and base64-encode the result.
pub fn compress_to_base64(text: &str) -> std::io::Result<String> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes())?;
    let compressed = encoder.finish()?;
    Ok(base64::engine::general_purpose::STANDARD.encode(compressed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    #[test]
    fn round_trips_through_gzip_and_base64() {
        let original = "the quick brown fox jumps over the lazy dog".repeat(10);
        let encoded = compress_to_base64(&original).unwrap();

        let compressed = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .unwrap();
        let mut decoder = GzDecoder::new(compressed.as_slice());
        let mut decompressed = String::new();
        decoder.read_to_string(&mut decompressed).unwrap();

        assert_eq!(decompressed, original);
    }

    #[test]
    fn compresses_repetitive_text_smaller_than_input() {
        let original = "a".repeat(10_000);
        let encoded = compress_to_base64(&original).unwrap();
        assert!(encoded.len() < original.len());
    }
}
