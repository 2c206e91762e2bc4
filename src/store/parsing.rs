//! Zero-allocation parsing of track-interval lines.
//!
//! Line layout (tab-separated):
//! `chrom  start  end  track_id  [tissue  source]`
//!
//! Metadata columns holding `.` or nothing are treated as absent.

use memchr::memchr_iter;

/// Fast u64 parsing - no allocation, no error formatting.
///
/// Returns None if the input is empty, contains non-digit characters,
/// or overflows.
#[inline(always)]
pub fn parse_u64_fast(bytes: &[u8]) -> Option<u64> {
    if bytes.is_empty() {
        return None;
    }
    let mut n: u64 = 0;
    for &b in bytes {
        let d = b.wrapping_sub(b'0');
        if d > 9 {
            return None;
        }
        n = n.checked_mul(10)?.checked_add(d as u64)?;
    }
    Some(n)
}

/// Check if a line should be skipped (empty, comment, or header).
#[inline(always)]
pub fn should_skip_line(line: &[u8]) -> bool {
    line.is_empty() || line[0] == b'#' || line.starts_with(b"track") || line.starts_with(b"browser")
}

/// Strip a trailing `\n` or `\r\n`.
#[inline]
pub fn trim_line_end(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Up to six tab-separated fields of one line, borrowed from the buffer.
#[derive(Debug, Default)]
pub struct Fields<'a> {
    fields: [&'a [u8]; 6],
    count: usize,
}

impl<'a> Fields<'a> {
    /// Split on tabs using memchr. Columns past the sixth are ignored.
    pub fn split(line: &'a [u8]) -> Self {
        let mut fields: [&'a [u8]; 6] = [&[]; 6];
        let mut count = 0;
        let mut begin = 0;
        for tab in memchr_iter(b'\t', line) {
            if count == fields.len() {
                break;
            }
            fields[count] = &line[begin..tab];
            count += 1;
            begin = tab + 1;
        }
        if count < fields.len() {
            fields[count] = &line[begin..];
            count += 1;
        }
        Self { fields, count }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&'a [u8]> {
        if index < self.count {
            Some(self.fields[index])
        } else {
            None
        }
    }

    /// Optional metadata column as text; `.`, empty or non-UTF-8 is `None`.
    pub fn metadata(&self, index: usize) -> Option<&'a str> {
        let raw = self.get(index)?;
        if raw.is_empty() || raw == b"." {
            return None;
        }
        std::str::from_utf8(raw).ok()
    }
}

/// Coordinates and track of one line, or the reason it is malformed.
#[derive(Debug, PartialEq, Eq)]
pub struct RowCore<'a> {
    pub start: u64,
    pub end: u64,
    pub track_id: &'a str,
}

/// Parse columns 2-4. Does not check `start < end`.
pub fn parse_row_core<'a>(fields: &Fields<'a>) -> Result<RowCore<'a>, &'static str> {
    if fields.len() < 4 {
        return Err("expected at least 4 fields");
    }
    let start = fields
        .get(1)
        .and_then(parse_u64_fast)
        .ok_or("invalid start position")?;
    let end = fields
        .get(2)
        .and_then(parse_u64_fast)
        .ok_or("invalid end position")?;
    let track_id = fields
        .get(3)
        .filter(|t| !t.is_empty())
        .and_then(|t| std::str::from_utf8(t).ok())
        .ok_or("missing track id")?;
    Ok(RowCore {
        start,
        end,
        track_id,
    })
}
