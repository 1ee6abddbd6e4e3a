//! Binary snapshot codec.
//!
//! A snapshot is two little-endian files sharing a name prefix:
//!
//! ```text
//! <prefix>.idx  [8 bytes magic "MAYFLIDX"] [u32 version] [postings] [u32 crc]
//! <prefix>.exp  [8 bytes magic "MAYFLEXP"] [u32 version] [deadlines] [u32 crc]
//! ```
//!
//! The postings section is a term count followed by, per term,
//! `term_id u64 | count u32 | count x (doc_id u64 | weight f32)`. The
//! deadline section is `count u32 | count x (term_id u64 | doc_id u64 |
//! expire_time i64)`. The trailing CRC32 covers the section bytes. Any
//! magic, version, length, or CRC failure rejects the file.

use std::fs;
use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::error::{MayflyError, Result};
use crate::index::posting::Posting;
use crate::types::{DocId, ExpireTime, TermId};

const INDEX_MAGIC: &[u8; 8] = b"MAYFLIDX";
const EXPIRE_MAGIC: &[u8; 8] = b"MAYFLEXP";
const SNAPSHOT_VERSION: u32 = 1;

/// One tracked deadline, as serialized in the expiration section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ExpireRecord {
    pub term_id: TermId,
    pub doc_id: DocId,
    pub expire_time: ExpireTime,
}

/// A quiesced copy of the index state: published postings plus deadlines.
#[derive(Debug, Default)]
pub struct IndexSnapshot {
    /// Per-term postings, terms ascending, entries ascending by doc.
    pub postings: Vec<(TermId, Vec<Posting>)>,
    /// Tracked deadlines, sorted for deterministic output.
    pub expire: Vec<ExpireRecord>,
}

/// Path of the postings file for a snapshot prefix.
#[must_use]
pub fn index_path(prefix: &str) -> PathBuf {
    PathBuf::from(format!("{prefix}.idx"))
}

/// Path of the expiration file for a snapshot prefix.
#[must_use]
pub fn expire_path(prefix: &str) -> PathBuf {
    PathBuf::from(format!("{prefix}.exp"))
}

/// Serialize and write both snapshot files for `prefix`.
///
/// Each file is written to a sibling `.tmp` and renamed into place, so a
/// failed dump leaves any previous snapshot intact.
pub fn write_snapshot(prefix: &str, snapshot: &IndexSnapshot) -> Result<()> {
    write_atomic(
        &index_path(prefix),
        &frame(INDEX_MAGIC, &encode_postings(&snapshot.postings)),
    )?;
    write_atomic(
        &expire_path(prefix),
        &frame(EXPIRE_MAGIC, &encode_expire(&snapshot.expire)),
    )?;
    Ok(())
}

/// Read and validate both snapshot files for `prefix`.
pub fn read_snapshot(prefix: &str) -> Result<IndexSnapshot> {
    let idx = fs::read(index_path(prefix))?;
    let postings = decode_postings(unframe(INDEX_MAGIC, &idx)?)?;
    let exp = fs::read(expire_path(prefix))?;
    let expire = decode_expire(unframe(EXPIRE_MAGIC, &exp)?)?;
    Ok(IndexSnapshot { postings, expire })
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn frame(magic: &[u8; 8], payload: &[u8]) -> Bytes {
    let mut buf = Vec::with_capacity(magic.len() + 4 + payload.len() + 4);
    buf.extend_from_slice(magic);
    buf.extend_from_slice(&SNAPSHOT_VERSION.to_le_bytes());
    buf.extend_from_slice(payload);
    buf.extend_from_slice(&crc32fast::hash(payload).to_le_bytes());
    Bytes::from(buf)
}

fn unframe<'a>(magic: &[u8; 8], data: &'a [u8]) -> Result<&'a [u8]> {
    if data.len() < magic.len() + 4 + 4 {
        return Err(MayflyError::Snapshot("snapshot file too short".into()));
    }
    if &data[..8] != magic {
        return Err(MayflyError::Snapshot(format!(
            "bad snapshot magic: {:?}",
            &data[..8]
        )));
    }
    let version = u32::from_le_bytes(data[8..12].try_into().expect("fixed slice"));
    if version != SNAPSHOT_VERSION {
        return Err(MayflyError::Snapshot(format!(
            "unsupported snapshot version: {version}"
        )));
    }
    let payload = &data[12..data.len() - 4];
    let stored = u32::from_le_bytes(data[data.len() - 4..].try_into().expect("fixed slice"));
    let computed = crc32fast::hash(payload);
    if stored != computed {
        return Err(MayflyError::ChecksumMismatch {
            expected: computed,
            actual: stored,
        });
    }
    Ok(payload)
}

fn encode_postings(postings: &[(TermId, Vec<Posting>)]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&(postings.len() as u32).to_le_bytes());
    for (term_id, entries) in postings {
        buf.extend_from_slice(&term_id.to_le_bytes());
        buf.extend_from_slice(&(entries.len() as u32).to_le_bytes());
        for p in entries {
            buf.extend_from_slice(&p.doc_id.to_le_bytes());
            buf.extend_from_slice(&p.weight.to_le_bytes());
        }
    }
    buf
}

fn decode_postings(payload: &[u8]) -> Result<Vec<(TermId, Vec<Posting>)>> {
    let mut r = Reader::new(payload);
    let term_count = r.take_u32()?;
    let mut postings = Vec::with_capacity(term_count as usize);
    for _ in 0..term_count {
        let term_id = r.take_u64()?;
        let count = r.take_u32()?;
        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let doc_id = r.take_u64()?;
            let weight = r.take_f32()?;
            if entries.last().is_some_and(|p: &Posting| p.doc_id >= doc_id) {
                return Err(MayflyError::Snapshot(format!(
                    "posting list for term {term_id} not strictly sorted"
                )));
            }
            entries.push(Posting { doc_id, weight });
        }
        postings.push((term_id, entries));
    }
    r.finish()?;
    Ok(postings)
}

fn encode_expire(expire: &[ExpireRecord]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4 + expire.len() * 24);
    buf.extend_from_slice(&(expire.len() as u32).to_le_bytes());
    for rec in expire {
        buf.extend_from_slice(&rec.term_id.to_le_bytes());
        buf.extend_from_slice(&rec.doc_id.to_le_bytes());
        buf.extend_from_slice(&rec.expire_time.to_le_bytes());
    }
    buf
}

fn decode_expire(payload: &[u8]) -> Result<Vec<ExpireRecord>> {
    let mut r = Reader::new(payload);
    let count = r.take_u32()?;
    let mut expire = Vec::with_capacity(count as usize);
    for _ in 0..count {
        expire.push(ExpireRecord {
            term_id: r.take_u64()?,
            doc_id: r.take_u64()?,
            expire_time: r.take_i64()?,
        });
    }
    r.finish()?;
    Ok(expire)
}

/// Bounds-checked little-endian reader over a snapshot payload.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|&e| e <= self.buf.len());
        let Some(end) = end else {
            return Err(MayflyError::Snapshot("snapshot payload truncated".into()));
        };
        let out = &self.buf[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn take_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().expect("fixed slice")))
    }

    fn take_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.take(8)?.try_into().expect("fixed slice")))
    }

    fn take_i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.take(8)?.try_into().expect("fixed slice")))
    }

    fn take_f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.take(4)?.try_into().expect("fixed slice")))
    }

    /// Error unless the payload was consumed exactly.
    fn finish(&self) -> Result<()> {
        if self.pos != self.buf.len() {
            return Err(MayflyError::Snapshot(format!(
                "snapshot payload has {} trailing bytes",
                self.buf.len() - self.pos
            )));
        }
        Ok(())
    }
}
