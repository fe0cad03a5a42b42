/**
 * Record data accessor (component C4) and the `ByteAccessor` interface it is
 * built on (spec §6, consumed from the image-acquisition collaborator).
 *
 * Reads a main record's payload, transparently inflating it when the
 * compressed flag is set. Scratch buffers are pooled per size class and
 * released on every exit path via an RAII guard — the "scoped acquisition
 * with guaranteed release" spec §5 calls for, mirrored on the teacher's
 * `Drop for FicFile` / `Drop for MmoFile` (present, if trivial).
 */
use crate::common::MainRecordHeader;
use crate::logger::{get_logger, LogLevel};
use flate2::read::ZlibDecoder;
use std::io::Read;
use std::sync::{Mutex, OnceLock};

pub type IoResult<T> = std::io::Result<T>;

/// Random read access into a large read-only image. Must be thread-compatible
/// (usable from one thread at a time) but not thread-safe — the core itself
/// is single-threaded (spec §5).
pub trait ByteAccessor {
    fn read(&self, dst: &mut [u8], src_offset: u64, length: u32) -> IoResult<usize>;
    fn image_length(&self) -> u64;
}

/// A `ByteAccessor` over an in-memory buffer — used directly by tests in lieu
/// of a mock, since it's pure data rather than injected behavior.
pub struct SliceAccessor<'a>(pub &'a [u8]);

impl<'a> ByteAccessor for SliceAccessor<'a> {
    fn read(&self, dst: &mut [u8], src_offset: u64, length: u32) -> IoResult<usize> {
        let start = src_offset as usize;
        let want = length as usize;
        if start > self.0.len() {
            return Ok(0);
        }
        let end = (start + want).min(self.0.len());
        let n = end - start;
        dst[..n].copy_from_slice(&self.0[start..end]);
        Ok(n)
    }

    fn image_length(&self) -> u64 {
        self.0.len() as u64
    }
}

const MAIN_RECORD_HEADER_LEN: u64 = 24;

/// Size classes the scratch-buffer pool hands out (spec §5: 256B–64KiB).
const SIZE_CLASSES: [usize; 5] = [256, 1024, 4096, 16384, 65536];

fn class_for(size: usize) -> usize {
    SIZE_CLASSES
        .iter()
        .copied()
        .find(|&c| c >= size)
        .unwrap_or(*SIZE_CLASSES.last().unwrap())
}

struct Pool {
    free: Mutex<[Vec<Vec<u8>>; 5]>,
}

fn pool() -> &'static Pool {
    static POOL: OnceLock<Pool> = OnceLock::new();
    POOL.get_or_init(|| Pool {
        free: Mutex::new(Default::default()),
    })
}

/// An RAII-guarded scratch buffer: released back to its size class on drop,
/// on every exit path including early-return via `?`.
pub struct PooledBuf {
    buf: Vec<u8>,
    class_idx: usize,
}

impl PooledBuf {
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    pub fn truncate(&mut self, len: usize) {
        self.buf.truncate(len);
    }

    pub fn capacity_class(&self) -> usize {
        SIZE_CLASSES[self.class_idx]
    }
}

impl Drop for PooledBuf {
    fn drop(&mut self) {
        let mut buf = std::mem::take(&mut self.buf);
        buf.clear();
        if let Ok(mut free) = pool().free.lock() {
            free[self.class_idx].push(buf);
        }
    }
}

/// Acquires a scratch buffer sized to cover `requested` bytes (rounded up to
/// the nearest size class), reusing a pooled allocation when one is free.
pub fn acquire(requested: usize) -> PooledBuf {
    let class_idx = SIZE_CLASSES
        .iter()
        .position(|&c| c == class_for(requested))
        .unwrap();
    let class_size = SIZE_CLASSES[class_idx];
    let mut buf = pool()
        .free
        .lock()
        .ok()
        .and_then(|mut free| free[class_idx].pop())
        .unwrap_or_default();
    buf.resize(class_size, 0);
    PooledBuf { buf, class_idx }
}

/// Reads a main record's payload from the image, decompressing it if
/// `header.is_compressed` is set. Returns `None` on truncation (requested
/// range exceeds image length) or decompression failure — the caller falls
/// back to the shallow record shape in both cases (spec §4.4, §7).
pub fn read_record_data(
    accessor: &dyn ByteAccessor,
    header: &MainRecordHeader,
    buffer_hint: usize,
) -> Option<PooledBuf> {
    let body_offset = header.offset + MAIN_RECORD_HEADER_LEN;
    if body_offset > accessor.image_length() {
        get_logger().log_with_source(
            LogLevel::Warn,
            format!(
                "record {} at offset {} exceeds image length {}",
                header.form_id,
                header.offset,
                accessor.image_length()
            ),
            Some("RecordDataAccessor".to_string()),
        );
        return None;
    }

    let want = (header.data_size as usize).min(buffer_hint.max(SIZE_CLASSES[0]));
    let mut raw = acquire(want);
    let read_len = want.min(raw.capacity_class());
    let n = accessor
        .read(&mut raw.as_mut_slice()[..read_len], body_offset, read_len as u32)
        .ok()?;
    raw.truncate(n);

    if !header.is_compressed {
        return Some(raw);
    }

    decompress(raw.as_slice(), header)
}

fn decompress(compressed: &[u8], header: &MainRecordHeader) -> Option<PooledBuf> {
    if compressed.len() < 4 {
        get_logger().log_with_source(
            LogLevel::Warn,
            format!("record {} marked compressed but body too short", header.form_id),
            Some("RecordDataAccessor".to_string()),
        );
        return None;
    }
    let decompressed_size =
        u32::from_be_bytes([compressed[0], compressed[1], compressed[2], compressed[3]]) as usize;
    let mut decoder = ZlibDecoder::new(&compressed[4..]);
    let mut out = acquire(decompressed_size.max(SIZE_CLASSES[0]));
    let target_len = decompressed_size.min(out.capacity_class());
    match decoder.read_exact(&mut out.as_mut_slice()[..target_len]) {
        Ok(()) => {
            out.truncate(target_len);
            Some(out)
        }
        Err(e) => {
            get_logger().log_with_source(
                LogLevel::Warn,
                format!("record {} decompression failed: {}", header.form_id, e),
                Some("RecordDataAccessor".to_string()),
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{FormId, Tag};
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn header(offset: u64, data_size: u32, compressed: bool) -> MainRecordHeader {
        MainRecordHeader {
            kind: Tag::new(*b"BOOK"),
            offset,
            data_size,
            flags: 0,
            form_id: FormId(0xA),
            is_compressed: compressed,
            is_big_endian: true,
        }
    }

    #[test]
    fn truncated_range_returns_none() {
        let image = vec![0u8; 10];
        let accessor = SliceAccessor(&image);
        let h = header(0, 100, false);
        assert!(read_record_data(&accessor, &h, 1024).is_none());
    }

    #[test]
    fn zero_data_size_reads_empty() {
        let image = vec![0u8; 24];
        let accessor = SliceAccessor(&image);
        let h = header(0, 0, false);
        let buf = read_record_data(&accessor, &h, 1024).unwrap();
        assert_eq!(buf.as_slice().len(), 0);
    }

    #[test]
    fn compressed_record_roundtrip_scenario_b() {
        // BOOK EDID "NVBook01\0" + DATA {flags=1, skill=18, value=25 be, weight=0.5 be}
        let mut body = Vec::new();
        body.extend_from_slice(b"EDID");
        body.extend_from_slice(&9u16.to_be_bytes());
        body.extend_from_slice(b"NVBook01\0");
        body.extend_from_slice(b"DATA");
        body.extend_from_slice(&10u16.to_be_bytes());
        body.push(1u8);
        body.push(18u8);
        body.extend_from_slice(&25i32.to_be_bytes());
        body.extend_from_slice(&0.5f32.to_be_bytes());

        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(&body).unwrap();
        let compressed = enc.finish().unwrap();

        let mut wire = vec![0u8; 24]; // header padding
        wire.extend_from_slice(&(body.len() as u32).to_be_bytes());
        wire.extend_from_slice(&compressed);

        let accessor = SliceAccessor(&wire);
        let h = header(0, wire.len() as u32 - 24, true);
        let buf = read_record_data(&accessor, &h, 1024).expect("should decompress");
        assert_eq!(buf.as_slice(), body.as_slice());
    }

    #[test]
    fn garbled_compressed_body_falls_back_to_none() {
        let mut wire = vec![0u8; 24];
        wire.extend_from_slice(&100u32.to_be_bytes());
        wire.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
        let accessor = SliceAccessor(&wire);
        let h = header(0, wire.len() as u32 - 24, true);
        assert!(read_record_data(&accessor, &h, 1024).is_none());
    }
}
