//! On-disk tagged framing shared by every snapshot: the outer [`DumpHeader`],
//! the per-kind inner headers, gzip wrapping, and the chunk framing used by
//! `RotatedFilter` to nest one complete snapshot per replica.
//!
//! A snapshot file is `DumpHeader` (always raw, never compressed) followed by
//! a body that is gzip-compressed iff `DumpHeader.used_gzip`. Writing the
//! header raw lets a reader decide whether to wrap the rest of the stream in
//! a decompressor before it has read a single byte of the body — the
//! self-describing property the wire contract requires.
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};
use thiserror::Error;

/// Fixed magic identifying a snapshot file. Part of the wire contract;
/// never changes across format revisions.
pub const MAGIC: u32 = 0x123553F3;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("bad magic: expected {MAGIC:#x}, got {0:#x}")]
    BadMagic(u32),

    #[error("unknown filter kind tag: {0}")]
    UnknownKind(u8),

    #[error("negative chunk length: {0}")]
    NegativeChunkLen(i32),

    #[error("invalid utf-8 in header string")]
    InvalidUtf8,
}

/// Which filter a snapshot body contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Classic,
    Rotated,
}

impl FilterKind {
    fn tag(self) -> u8 {
        match self {
            FilterKind::Classic => 0,
            FilterKind::Rotated => 1,
        }
    }

    fn from_tag(tag: u8) -> Result<Self, FormatError> {
        match tag {
            0 => Ok(FilterKind::Classic),
            1 => Ok(FilterKind::Rotated),
            other => Err(FormatError::UnknownKind(other)),
        }
    }
}

/// The outer tagged header every snapshot file starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpHeader {
    pub used_gzip: bool,
    pub filter_kind: FilterKind,
}

impl DumpHeader {
    fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u32::<BigEndian>(MAGIC)?;
        w.write_u8(self.used_gzip as u8)?;
        w.write_u8(self.filter_kind.tag())?;
        Ok(())
    }

    fn read<R: Read>(r: &mut R) -> Result<Self, FormatError> {
        let magic = r.read_u32::<BigEndian>()?;
        if magic != MAGIC {
            return Err(FormatError::BadMagic(magic));
        }
        let used_gzip = r.read_u8()? != 0;
        let filter_kind = FilterKind::from_tag(r.read_u8()?)?;
        Ok(Self {
            used_gzip,
            filter_kind,
        })
    }
}

/// Writes a complete snapshot: raw `DumpHeader` then `body`, gzip-compressed
/// when `used_gzip` is set.
pub fn write_framed<W: Write>(
    w: &mut W,
    filter_kind: FilterKind,
    used_gzip: bool,
    body: &[u8],
) -> io::Result<()> {
    DumpHeader {
        used_gzip,
        filter_kind,
    }
    .write(w)?;

    if used_gzip {
        let mut encoder = flate2::write::GzEncoder::new(w, flate2::Compression::default());
        encoder.write_all(body)?;
        encoder.finish()?;
    } else {
        w.write_all(body)?;
    }
    Ok(())
}

/// Reads a complete snapshot, decompressing the body if the header says to.
/// Returns the filter kind and the raw (decompressed) body bytes.
pub fn read_framed<R: Read>(r: &mut R) -> Result<(FilterKind, Vec<u8>), FormatError> {
    let header = DumpHeader::read(r)?;
    let mut body = Vec::new();
    if header.used_gzip {
        flate2::read::GzDecoder::new(r).read_to_end(&mut body)?;
    } else {
        r.read_to_end(&mut body)?;
    }
    Ok((header.filter_kind, body))
}

fn write_string<W: Write>(w: &mut W, s: &str) -> io::Result<()> {
    let bytes = s.as_bytes();
    w.write_u32::<BigEndian>(bytes.len() as u32)?;
    w.write_all(bytes)
}

fn read_string<R: Read>(r: &mut R) -> Result<String, FormatError> {
    let len = r.read_u32::<BigEndian>()? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|_| FormatError::InvalidUtf8)
}

/// Inner header for a classic-filter snapshot body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassicHeader {
    pub name: String,
    pub m: u64,
    pub k: u32,
    pub count: u64,
}

impl ClassicHeader {
    pub fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write_string(w, &self.name)?;
        w.write_u64::<BigEndian>(self.m)?;
        w.write_u32::<BigEndian>(self.k)?;
        w.write_u64::<BigEndian>(self.count)?;
        Ok(())
    }

    pub fn read<R: Read>(r: &mut R) -> Result<Self, FormatError> {
        let name = read_string(r)?;
        let m = r.read_u64::<BigEndian>()?;
        let k = r.read_u32::<BigEndian>()?;
        let count = r.read_u64::<BigEndian>()?;
        Ok(Self { name, m, k, count })
    }
}

/// Inner header for a rotated-filter snapshot body. `rotate_interval_secs`
/// and `last_rotated_epoch_secs` carry the duration/timestamp fields spec'd
/// as implementation-defined, encoded as plain seconds counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotatedHeader {
    pub r: u32,
    pub current: u32,
    pub name: String,
    pub rotate_interval_secs: u64,
    pub last_rotated_epoch_secs: u64,
}

impl RotatedHeader {
    pub fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u32::<BigEndian>(self.r)?;
        w.write_u32::<BigEndian>(self.current)?;
        write_string(w, &self.name)?;
        w.write_u64::<BigEndian>(self.rotate_interval_secs)?;
        w.write_u64::<BigEndian>(self.last_rotated_epoch_secs)?;
        Ok(())
    }

    pub fn read<R: Read>(r: &mut R) -> Result<Self, FormatError> {
        let r_count = r.read_u32::<BigEndian>()?;
        let current = r.read_u32::<BigEndian>()?;
        let name = read_string(r)?;
        let rotate_interval_secs = r.read_u64::<BigEndian>()?;
        let last_rotated_epoch_secs = r.read_u64::<BigEndian>()?;
        Ok(Self {
            r: r_count,
            current,
            name,
            rotate_interval_secs,
            last_rotated_epoch_secs,
        })
    }
}

/// Writes one `{body_len: i32, data}` replica chunk.
pub fn write_chunk<W: Write>(w: &mut W, data: &[u8]) -> io::Result<()> {
    w.write_i32::<BigEndian>(data.len() as i32)?;
    w.write_all(data)
}

/// Reads one replica chunk written by [`write_chunk`].
pub fn read_chunk<R: Read>(r: &mut R) -> Result<Vec<u8>, FormatError> {
    let len = r.read_i32::<BigEndian>()?;
    if len < 0 {
        return Err(FormatError::NegativeChunkLen(len));
    }
    let mut data = vec![0u8; len as usize];
    r.read_exact(&mut data)?;
    Ok(data)
}
