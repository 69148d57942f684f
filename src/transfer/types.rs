//! Part arithmetic and protocol records

/// One planned part of a file: where it starts and how long it is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartSpec {
    /// 1-based, contiguous
    pub part_number: i32,
    /// Absolute byte offset into the source file
    pub offset: u64,
    /// Exact byte length; only the final part may be shorter than the
    /// configured part size
    pub len: u64,
}

/// Confirmation tag returned by the storage endpoint for one accepted part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartTag {
    pub part_number: i32,
    pub etag: String,
}

/// Record returned by the endpoint when a transfer session closes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionRecord {
    pub key: String,
    pub etag: Option<String>,
    pub location: Option<String>,
}

/// Split a file of `file_size` bytes into parts of `part_size` bytes.
///
/// Parts cover offsets `[0, file_size)` exactly: indices start at 1 and
/// are contiguous, every part is `part_size` long except possibly the
/// last, and a zero-byte file yields no parts at all (the caller must
/// handle that case explicitly; a zero-length part is never planned).
pub fn part_plan(file_size: u64, part_size: u64) -> Vec<PartSpec> {
    assert!(part_size > 0, "part size must be non-zero");

    let mut parts = Vec::new();
    let mut offset = 0u64;
    let mut part_number = 1i32;
    while offset < file_size {
        let len = part_size.min(file_size - offset);
        parts.push(PartSpec {
            part_number,
            offset,
            len,
        });
        offset += len;
        part_number += 1;
    }
    parts
}
