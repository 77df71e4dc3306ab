//! zlib backend shared by the deflating codecs

use crate::{PackError, Result};
use flate2::bufread::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Compress `data`; `batch_len` is only used for error context
pub(super) fn deflate(
    codec: &'static str,
    batch_len: usize,
    data: &[u8],
    level: Compression,
) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2 + 16), level);
    encoder
        .write_all(data)
        .map_err(|e| PackError::backend(codec, batch_len, e))?;
    encoder
        .finish()
        .map_err(|e| PackError::backend(codec, batch_len, e))
}

/// Decompress exactly one zlib stream; bytes after its end are corruption
pub(super) fn inflate(codec: &'static str, data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::with_capacity(data.len() * 4);
    decoder
        .read_to_end(&mut out)
        .map_err(|e| PackError::backend(codec, 1, e))?;

    let trailing = decoder.into_inner();
    if !trailing.is_empty() {
        return Err(PackError::corrupt(format!(
            "{} payload has {} bytes after the end of the zlib stream",
            codec,
            trailing.len()
        )));
    }
    Ok(out)
}
