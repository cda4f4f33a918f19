use std::io::Read;
use std::io::Write;

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::Result;
use crate::StorageError;

pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Inflates a zlib buffer holding UTF-8 text.
pub fn decompress_to_string(data: &[u8]) -> Result<String> {
    let mut text = String::new();
    ZlibDecoder::new(data)
        .read_to_string(&mut text)
        .map_err(|e| StorageError::Compression(e.to_string()))?;
    Ok(text)
}
