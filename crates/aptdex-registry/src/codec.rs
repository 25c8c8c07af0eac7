//! Streaming decompressors for repository index variants.
//!
//! Every codec consumes its input in bounded chunks and writes into a
//! [`SizeGuard`] that refuses to grow past the configured ceiling, so an
//! oversized or hostile payload is rejected before it is fully materialized.

use std::{
    fmt,
    io::{self, BufReader, Read},
    str::FromStr,
};

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

use crate::error::RegistryError;

/// Input and output chunk size used by every decoder.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Default ceiling for decoded documents.
pub const DEFAULT_MAX_DECODED_SIZE: u64 = 256 * 1024 * 1024;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const BZIP2_MAGIC: &[u8] = b"BZh";

/// Encoding of a repository index resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodecKind {
    #[serde(rename = "zst")]
    Zstd,
    #[serde(rename = "bz2")]
    Bzip2,
    #[serde(rename = "gz")]
    Gzip,
    #[serde(rename = "xz")]
    Xz,
    #[serde(rename = "plain")]
    Plain,
}

impl CodecKind {
    /// Candidates tried when nothing else is configured.
    pub const DEFAULT_ORDER: [CodecKind; 3] = [CodecKind::Zstd, CodecKind::Bzip2, CodecKind::Gzip];

    /// Resource name relative to the repository base URL.
    pub fn resource(self) -> &'static str {
        match self {
            CodecKind::Zstd => "Packages.zst",
            CodecKind::Bzip2 => "Packages.bz2",
            CodecKind::Gzip => "Packages.gz",
            CodecKind::Xz => "Packages.xz",
            CodecKind::Plain => "Packages",
        }
    }

    /// Short name used in configuration and events.
    pub fn name(self) -> &'static str {
        match self {
            CodecKind::Zstd => "zst",
            CodecKind::Bzip2 => "bz2",
            CodecKind::Gzip => "gz",
            CodecKind::Xz => "xz",
            CodecKind::Plain => "plain",
        }
    }

    /// Guesses the codec from a file name's extension.
    pub fn from_file_name(name: &str) -> CodecKind {
        match name.rsplit_once('.').map(|(_, ext)| ext) {
            Some("zst") => CodecKind::Zstd,
            Some("bz2") => CodecKind::Bzip2,
            Some("gz") => CodecKind::Gzip,
            Some("xz") => CodecKind::Xz,
            _ => CodecKind::Plain,
        }
    }

    /// Parses a list of codec names, preserving order.
    pub fn parse_list<S: AsRef<str>>(names: &[S]) -> Result<Vec<CodecKind>, RegistryError> {
        names.iter().map(|name| name.as_ref().parse()).collect()
    }
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CodecKind {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zst" | "zstd" => Ok(CodecKind::Zstd),
            "bz2" | "bzip2" => Ok(CodecKind::Bzip2),
            "gz" | "gzip" => Ok(CodecKind::Gzip),
            "xz" => Ok(CodecKind::Xz),
            "plain" | "none" => Ok(CodecKind::Plain),
            _ => Err(RegistryError::UnknownCodec(s.to_string())),
        }
    }
}

#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Corrupt {codec} stream: {reason}")]
    #[diagnostic(code(aptdex_registry::codec::corrupt))]
    Corrupt { codec: CodecKind, reason: String },

    #[error("Truncated {codec} stream")]
    #[diagnostic(
        code(aptdex_registry::codec::truncated),
        help("The server may have cut the transfer short")
    )]
    Truncated { codec: CodecKind },

    #[error("Decoded {codec} document exceeds {limit} bytes")]
    #[diagnostic(
        code(aptdex_registry::codec::too_large),
        help("Raise `max_decoded_size` if this repository is legitimately large")
    )]
    TooLarge { codec: CodecKind, limit: u64 },
}

impl DecodeError {
    fn from_io(codec: CodecKind, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => DecodeError::Truncated { codec },
            _ => {
                DecodeError::Corrupt {
                    codec,
                    reason: err.to_string(),
                }
            }
        }
    }
}

/// Output buffer that refuses to grow past `limit` bytes.
struct SizeGuard {
    codec: CodecKind,
    limit: u64,
    buf: Vec<u8>,
}

impl SizeGuard {
    fn new(codec: CodecKind, limit: u64, size_hint: usize) -> Self {
        let capacity = size_hint.min(usize::try_from(limit).unwrap_or(usize::MAX));
        Self {
            codec,
            limit,
            buf: Vec::with_capacity(capacity),
        }
    }

    fn push(&mut self, data: &[u8]) -> Result<(), DecodeError> {
        if self.buf.len() as u64 + data.len() as u64 > self.limit {
            return Err(DecodeError::TooLarge {
                codec: self.codec,
                limit: self.limit,
            });
        }
        self.buf.extend_from_slice(data);
        Ok(())
    }

    fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Decodes `raw` as `codec`, failing once the output would exceed `limit` bytes.
pub fn decode(codec: CodecKind, raw: &[u8], limit: u64) -> Result<Vec<u8>, DecodeError> {
    let mut sink = SizeGuard::new(codec, limit, raw.len().saturating_mul(4));

    match codec {
        CodecKind::Zstd => decode_zstd(raw, &mut sink)?,
        CodecKind::Bzip2 => decode_bzip2(raw, &mut sink)?,
        CodecKind::Gzip => decode_gzip(raw, &mut sink)?,
        CodecKind::Xz => {
            let reader = BufReader::with_capacity(CHUNK_SIZE, raw);
            drain(codec, xz2::bufread::XzDecoder::new(reader), &mut sink)?
        }
        CodecKind::Plain => {
            for chunk in raw.chunks(CHUNK_SIZE) {
                sink.push(chunk)?;
            }
        }
    }

    let decoded = sink.finish();
    trace!(
        codec = codec.name(),
        compressed = raw.len(),
        decoded = decoded.len(),
        "decoded"
    );
    Ok(decoded)
}

fn drain<R: Read>(codec: CodecKind, mut reader: R, sink: &mut SizeGuard) -> Result<(), DecodeError> {
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => return Ok(()),
            Ok(n) => sink.push(&buf[..n])?,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(DecodeError::from_io(codec, err)),
        }
    }
}

/// gzip members are detected by magic bytes; anything else is read as zlib.
fn decode_gzip(raw: &[u8], sink: &mut SizeGuard) -> Result<(), DecodeError> {
    let reader = BufReader::with_capacity(CHUNK_SIZE, raw);
    if raw.starts_with(&GZIP_MAGIC) {
        drain(
            CodecKind::Gzip,
            flate2::bufread::MultiGzDecoder::new(reader),
            sink,
        )
    } else {
        drain(CodecKind::Gzip, flate2::bufread::ZlibDecoder::new(reader), sink)
    }
}

fn decode_bzip2(raw: &[u8], sink: &mut SizeGuard) -> Result<(), DecodeError> {
    let codec = CodecKind::Bzip2;
    let mut out = vec![0u8; CHUNK_SIZE];
    let mut input = raw;
    let mut stream = bzip2::Decompress::new(false);

    loop {
        let chunk = &input[..input.len().min(CHUNK_SIZE)];
        let (in_before, out_before) = (stream.total_in(), stream.total_out());

        let status = stream.decompress(chunk, &mut out).map_err(|err| {
            DecodeError::Corrupt {
                codec,
                reason: err.to_string(),
            }
        })?;

        let consumed = (stream.total_in() - in_before) as usize;
        let produced = (stream.total_out() - out_before) as usize;
        sink.push(&out[..produced])?;
        input = &input[consumed..];

        if matches!(status, bzip2::Status::StreamEnd) {
            // pbzip2 and friends concatenate independent streams
            if input.starts_with(BZIP2_MAGIC) {
                stream = bzip2::Decompress::new(false);
                continue;
            }
            return Ok(());
        }

        if consumed == 0 && produced == 0 {
            return Err(DecodeError::Truncated { codec });
        }
    }
}

fn decode_zstd(raw: &[u8], sink: &mut SizeGuard) -> Result<(), DecodeError> {
    use zstd::stream::raw::{Decoder, InBuffer, Operation, OutBuffer};

    let codec = CodecKind::Zstd;
    let corrupt = |err: io::Error| {
        DecodeError::Corrupt {
            codec,
            reason: err.to_string(),
        }
    };

    let mut decoder = Decoder::new().map_err(corrupt)?;
    let mut out = vec![0u8; CHUNK_SIZE];
    // Non-zero while a frame is still incomplete.
    let mut pending = 1usize;

    for chunk in raw.chunks(CHUNK_SIZE) {
        let mut input = InBuffer::around(chunk);
        loop {
            let mut output = OutBuffer::around(out.as_mut_slice());
            pending = decoder.run(&mut input, &mut output).map_err(corrupt)?;
            let produced = output.pos();
            sink.push(&out[..produced])?;

            // A short write with all input consumed means nothing is buffered.
            if input.pos() == chunk.len() && produced < CHUNK_SIZE {
                break;
            }
        }
    }

    if pending != 0 {
        return Err(DecodeError::Truncated { codec });
    }
    Ok(())
}
