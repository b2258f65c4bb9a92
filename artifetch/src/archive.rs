//! Range-aware ZIP central directory reader.
//!
//! Wheels are ZIP archives, and a ZIP archive keeps its directory at the
//! very end of the file:
//!
//! ```text
//! [local headers + data ...][central directory][zip64 record][zip64 locator][EOCD + comment]
//! ```
//!
//! A tail range request therefore returns a file whose absolute offsets are
//! meaningless (the start of the archive is missing). This reader never uses
//! the recorded central directory offset; it finds the directory by walking
//! backwards from the end record by the recorded directory size, which works
//! for a complete archive and for any suffix of it that is long enough.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use thiserror::Error;

const EOCD_SIGNATURE: u32 = 0x0605_4b50;
const EOCD_LEN: u64 = 22;
const MAX_COMMENT_LEN: u64 = u16::MAX as u64;

const ZIP64_LOCATOR_SIGNATURE: u32 = 0x0706_4b50;
const ZIP64_LOCATOR_LEN: u64 = 20;
const ZIP64_EOCD_SIGNATURE: u32 = 0x0606_4b50;
const ZIP64_EOCD_LEN: u64 = 56;

const CENTRAL_HEADER_SIGNATURE: u32 = 0x0201_4b50;
const CENTRAL_HEADER_LEN: usize = 46;

/// General purpose flag bit marking UTF-8 names.
const FLAG_UTF8: u16 = 1 << 11;

/// Errors reading an archive index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// I/O error while reading the file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// No end of central directory record in the file.
    #[error("no end of central directory record found")]
    MissingEndRecord,

    /// The file ends before the whole directory is available.
    #[error("central directory is truncated: need {needed} bytes, have {available}")]
    Truncated { needed: u64, available: u64 },

    /// The directory is present but does not parse.
    #[error("malformed central directory: {0}")]
    Malformed(String),
}

/// Entry names listed in an archive's central directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZipIndex {
    names: Vec<String>,
}

impl ZipIndex {
    /// Read the index of an archive, or of a tail of one, from a file.
    pub fn open(path: &Path) -> Result<Self, IndexError> {
        let file = File::open(path)?;
        Self::read(BufReader::new(file))
    }

    /// Read the index from any seekable reader.
    pub fn read<R: Read + Seek>(mut reader: R) -> Result<Self, IndexError> {
        let len = reader.seek(SeekFrom::End(0))?;
        if len < EOCD_LEN {
            return Err(IndexError::MissingEndRecord);
        }

        let (eocd_pos, eocd) = find_end_record(&mut reader, len)?;

        let (directory_end, entries, directory_size) = if eocd.needs_zip64() {
            read_zip64_record(&mut reader, eocd_pos)?
        } else {
            (eocd_pos, u64::from(eocd.entries), u64::from(eocd.directory_size))
        };

        if directory_size > directory_end {
            return Err(IndexError::Truncated {
                needed: directory_size + (len - directory_end),
                available: len,
            });
        }

        let size = usize::try_from(directory_size)
            .map_err(|_| IndexError::Malformed("central directory too large".to_string()))?;
        let mut directory = vec![0u8; size];
        reader.seek(SeekFrom::Start(directory_end - directory_size))?;
        reader.read_exact(&mut directory)?;

        let names = parse_directory(&directory, entries)?;
        Ok(Self { names })
    }

    /// Entry names in directory order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Whether any entry name ends with `suffix`.
    pub fn contains_suffix(&self, suffix: &str) -> bool {
        self.names.iter().any(|name| name.ends_with(suffix))
    }
}

/// Fields of the end of central directory record used here.
#[derive(Debug, Clone, Copy)]
struct EndRecord {
    entries: u16,
    directory_size: u32,
    directory_offset: u32,
}

impl EndRecord {
    fn needs_zip64(&self) -> bool {
        self.entries == u16::MAX
            || self.directory_size == u32::MAX
            || self.directory_offset == u32::MAX
    }
}

/// Scan backwards for the end record. The record is at most
/// `EOCD_LEN + MAX_COMMENT_LEN` bytes from the end of the file.
fn find_end_record<R: Read + Seek>(reader: &mut R, len: u64) -> Result<(u64, EndRecord), IndexError> {
    let search_len = len.min(EOCD_LEN + MAX_COMMENT_LEN);
    let search_start = len - search_len;
    let mut tail = vec![0u8; search_len as usize];
    reader.seek(SeekFrom::Start(search_start))?;
    reader.read_exact(&mut tail)?;

    let last_candidate = tail.len() - EOCD_LEN as usize;
    for idx in (0..=last_candidate).rev() {
        if le_u32(&tail, idx) != EOCD_SIGNATURE {
            continue;
        }

        let comment_len = le_u16(&tail, idx + 20) as usize;
        if idx + EOCD_LEN as usize + comment_len > tail.len() {
            continue;
        }

        let record = EndRecord {
            entries: le_u16(&tail, idx + 10),
            directory_size: le_u32(&tail, idx + 12),
            directory_offset: le_u32(&tail, idx + 16),
        };
        return Ok((search_start + idx as u64, record));
    }

    Err(IndexError::MissingEndRecord)
}

/// Follow the ZIP64 locator that precedes the end record.
///
/// Returns `(directory_end, entries, directory_size)`, where the directory
/// ends where the ZIP64 end record starts.
fn read_zip64_record<R: Read + Seek>(reader: &mut R, eocd_pos: u64) -> Result<(u64, u64, u64), IndexError> {
    let needed = ZIP64_LOCATOR_LEN + ZIP64_EOCD_LEN;
    if eocd_pos < needed {
        return Err(IndexError::Truncated {
            needed,
            available: eocd_pos,
        });
    }

    let mut locator = [0u8; ZIP64_LOCATOR_LEN as usize];
    reader.seek(SeekFrom::Start(eocd_pos - ZIP64_LOCATOR_LEN))?;
    reader.read_exact(&mut locator)?;
    if le_u32(&locator, 0) != ZIP64_LOCATOR_SIGNATURE {
        return Err(IndexError::Malformed("missing zip64 end record locator".to_string()));
    }

    let record_pos = eocd_pos - ZIP64_LOCATOR_LEN - ZIP64_EOCD_LEN;
    let mut record = [0u8; ZIP64_EOCD_LEN as usize];
    reader.seek(SeekFrom::Start(record_pos))?;
    reader.read_exact(&mut record)?;
    if le_u32(&record, 0) != ZIP64_EOCD_SIGNATURE {
        return Err(IndexError::Malformed("bad zip64 end record signature".to_string()));
    }

    let entries = le_u64(&record, 32);
    let directory_size = le_u64(&record, 40);
    Ok((record_pos, entries, directory_size))
}

fn parse_directory(directory: &[u8], entries: u64) -> Result<Vec<String>, IndexError> {
    let mut names = Vec::new();
    let mut pos = 0usize;

    for entry in 0..entries {
        if pos + CENTRAL_HEADER_LEN > directory.len() {
            return Err(IndexError::Malformed(format!(
                "entry {} header runs past the directory",
                entry
            )));
        }
        if le_u32(directory, pos) != CENTRAL_HEADER_SIGNATURE {
            return Err(IndexError::Malformed(format!(
                "bad central header signature for entry {}",
                entry
            )));
        }

        let flags = le_u16(directory, pos + 8);
        let name_len = le_u16(directory, pos + 28) as usize;
        let extra_len = le_u16(directory, pos + 30) as usize;
        let comment_len = le_u16(directory, pos + 32) as usize;

        let name_start = pos + CENTRAL_HEADER_LEN;
        let next = name_start + name_len + extra_len + comment_len;
        if next > directory.len() {
            return Err(IndexError::Malformed(format!(
                "entry {} runs past the directory",
                entry
            )));
        }

        let raw = &directory[name_start..name_start + name_len];
        let name = if flags & FLAG_UTF8 != 0 {
            String::from_utf8(raw.to_vec())
                .map_err(|_| IndexError::Malformed(format!("entry {} name is not UTF-8", entry)))?
        } else {
            String::from_utf8_lossy(raw).into_owned()
        };
        names.push(name);
        pos = next;
    }

    Ok(names)
}

fn le_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([buf[at], buf[at + 1]])
}

fn le_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

fn le_u64(buf: &[u8], at: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[at..at + 8]);
    u64::from_le_bytes(bytes)
}
