/**
 * Byte primitives (component C1).
 *
 * Endian-aware fixed-width reads from a byte slice at an offset, plus the two
 * string flavors the wire format needs: null-terminated (display/editor-id
 * subrecord payloads) and raw fixed-length tags (never swapped, never
 * null-terminated — see common::Tag).
 *
 * Every function here is a pure, panic-free slice read: out-of-range reads
 * return None rather than indexing past the end, since malformed subrecords
 * are a normal and expected input (spec §4.2, §7).
 */
use crate::common::Endian;

pub fn read_u16(data: &[u8], offset: usize, endian: Endian) -> Option<u16> {
    let b = data.get(offset..offset + 2)?;
    Some(match endian {
        Endian::Little => u16::from_le_bytes([b[0], b[1]]),
        Endian::Big => u16::from_be_bytes([b[0], b[1]]),
    })
}

pub fn read_i16(data: &[u8], offset: usize, endian: Endian) -> Option<i16> {
    read_u16(data, offset, endian).map(|v| v as i16)
}

pub fn read_u32(data: &[u8], offset: usize, endian: Endian) -> Option<u32> {
    let b = data.get(offset..offset + 4)?;
    Some(match endian {
        Endian::Little => u32::from_le_bytes([b[0], b[1], b[2], b[3]]),
        Endian::Big => u32::from_be_bytes([b[0], b[1], b[2], b[3]]),
    })
}

pub fn read_i32(data: &[u8], offset: usize, endian: Endian) -> Option<i32> {
    read_u32(data, offset, endian).map(|v| v as i32)
}

pub fn read_i64(data: &[u8], offset: usize, endian: Endian) -> Option<i64> {
    let b = data.get(offset..offset + 8)?;
    let arr = [b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]];
    Some(match endian {
        Endian::Little => i64::from_le_bytes(arr),
        Endian::Big => i64::from_be_bytes(arr),
    })
}

pub fn read_u64(data: &[u8], offset: usize, endian: Endian) -> Option<u64> {
    read_i64(data, offset, endian).map(|v| v as u64)
}

pub fn read_f32(data: &[u8], offset: usize, endian: Endian) -> Option<f32> {
    read_u32(data, offset, endian).map(f32::from_bits)
}

pub fn read_f64(data: &[u8], offset: usize, endian: Endian) -> Option<f64> {
    read_u64(data, offset, endian).map(f64::from_bits)
}

pub fn read_u8(data: &[u8], offset: usize) -> Option<u8> {
    data.get(offset).copied()
}

pub fn read_i8(data: &[u8], offset: usize) -> Option<i8> {
    read_u8(data, offset).map(|v| v as i8)
}

/// Reads a null-terminated string starting at `offset`. An empty slice yields
/// the empty string; an unterminated slice yields the whole remaining slice
/// (spec §4.1).
pub fn read_cstring(data: &[u8], offset: usize) -> String {
    let Some(rest) = data.get(offset..) else {
        return String::new();
    };
    let end = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
    String::from_utf8_lossy(&rest[..end]).into_owned()
}

/// Same as `read_cstring` but operating on an already-sliced buffer (the
/// common case: a subrecord's payload bytes with no surrounding record).
pub fn cstring_from_bytes(data: &[u8]) -> String {
    read_cstring(data, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn le_be_u32_roundtrip() {
        let data = [0x01, 0x02, 0x03, 0x04];
        assert_eq!(read_u32(&data, 0, Endian::Little), Some(0x0403_0201));
        assert_eq!(read_u32(&data, 0, Endian::Big), Some(0x0102_0304));
    }

    #[test]
    fn f32_little_endian() {
        // 10.0f32 little-endian: 00 00 20 41
        let data = [0x00, 0x00, 0x20, 0x41];
        assert_eq!(read_f32(&data, 0, Endian::Little), Some(10.0));
    }

    #[test]
    fn cstring_empty_slice() {
        assert_eq!(read_cstring(&[], 0), "");
    }

    #[test]
    fn cstring_unterminated() {
        let data = b"NVBook01";
        assert_eq!(read_cstring(data, 0), "NVBook01");
    }

    #[test]
    fn cstring_terminated() {
        let data = b"NVBook01\0trailing garbage";
        assert_eq!(read_cstring(data, 0), "NVBook01");
    }

    #[test]
    fn out_of_range_reads_are_none() {
        let data = [0u8; 2];
        assert_eq!(read_u32(&data, 0, Endian::Little), None);
        assert_eq!(read_u16(&data, 1, Endian::Little), None);
    }
}
