//! Tab-separated report output.
//!
//! Uses itoa for integer formatting and ryu for float formatting
//! to avoid allocation per line.
//!
//! Columns: `track_id covered_length fraction raw_candidates merged_count
//! intervals tissue source`, with intervals as `start-end,start-end` and
//! absent metadata as `.`.

use crate::report::{QueryOutcome, TrackOverlap};
use std::io::{self, BufWriter, Write};

/// Buffer size for ReportWriter (256 KB).
const DEFAULT_BUFFER_SIZE: usize = 256 * 1024;

/// Header line matching the columns written by [`ReportWriter`].
pub const REPORT_HEADER: &str =
    "#track_id\tcovered_length\tfraction\traw_candidates\tmerged_count\tintervals\ttissue\tsource";

/// Buffered writer for overlap reports.
pub struct ReportWriter<W: Write> {
    writer: BufWriter<W>,
    itoa_buf: itoa::Buffer,
    ryu_buf: ryu::Buffer,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(output: W) -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE, output)
    }

    pub fn with_capacity(capacity: usize, output: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(capacity, output),
            itoa_buf: itoa::Buffer::new(),
            ryu_buf: ryu::Buffer::new(),
        }
    }

    /// Write the column header.
    pub fn write_header(&mut self, with_region: bool) -> io::Result<()> {
        if with_region {
            self.writer.write_all(b"#chrom\tstart\tend\t")?;
            self.writer.write_all(&REPORT_HEADER.as_bytes()[1..])?;
        } else {
            self.writer.write_all(REPORT_HEADER.as_bytes())?;
        }
        self.writer.write_all(b"\n")
    }

    /// Write every entry of a query outcome.
    ///
    /// With `with_region`, each line is prefixed by the region's
    /// `chrom start end`.
    pub fn write_outcome(&mut self, outcome: &QueryOutcome, with_region: bool) -> io::Result<()> {
        for entry in outcome.report.iter() {
            if with_region {
                let region = &outcome.region;
                self.writer.write_all(region.chrom().as_bytes())?;
                self.write_tab()?;
                self.write_int(region.start())?;
                self.write_tab()?;
                self.write_int(region.end())?;
                self.write_tab()?;
            }
            self.write_entry(entry)?;
        }
        Ok(())
    }

    /// Write one report line.
    pub fn write_entry(&mut self, entry: &TrackOverlap) -> io::Result<()> {
        self.writer.write_all(entry.track_id.as_bytes())?;
        self.write_tab()?;
        self.write_int(entry.covered_length)?;
        self.write_tab()?;
        self.write_float(entry.fraction_covered())?;
        self.write_tab()?;
        self.write_int(entry.raw_candidate_count)?;
        self.write_tab()?;
        self.write_int(entry.merged.len())?;
        self.write_tab()?;
        for (i, interval) in entry.merged.iter().enumerate() {
            if i > 0 {
                self.writer.write_all(b",")?;
            }
            self.write_int(interval.start())?;
            self.writer.write_all(b"-")?;
            self.write_int(interval.end())?;
        }
        self.write_tab()?;
        self.write_optional(entry.tissue.as_deref())?;
        self.write_tab()?;
        self.write_optional(entry.source.as_deref())?;
        self.writer.write_all(b"\n")
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    #[inline]
    fn write_tab(&mut self) -> io::Result<()> {
        self.writer.write_all(b"\t")
    }

    #[inline]
    fn write_int<I: itoa::Integer>(&mut self, n: I) -> io::Result<()> {
        self.writer.write_all(self.itoa_buf.format(n).as_bytes())
    }

    #[inline]
    fn write_float(&mut self, f: f64) -> io::Result<()> {
        self.writer.write_all(self.ryu_buf.format(f).as_bytes())
    }

    #[inline]
    fn write_optional(&mut self, value: Option<&str>) -> io::Result<()> {
        self.writer.write_all(value.unwrap_or(".").as_bytes())
    }
}
