//! Binary head files (`.hds`, `.ddn` and the SUB-WT `.hds` outputs).
//!
//! Each record is a header followed by one layer of values:
//!
//! ```text
//! KSTP KPER   i32 i32
//! PERTIM TOTIM real real     (f32 or f64)
//! TEXT        16 bytes, right justified
//! NCOL NROW ILAY  i32 i32 i32
//! DATA        NROW*NCOL reals
//! ```
//!
//! The simulator writes either single or double precision reals and the
//! file does not say which; the precision whose text fields decode as
//! printable ASCII for every record wins.

use crate::error::{OutputError, Result};
use byteorder::{ByteOrder, LittleEndian};
use memmap2::Mmap;
use modflow_core::{Array2d, CellIndex};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const TEXT_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Precision {
    Single,
    Double,
}

impl Precision {
    pub fn real_size(self) -> usize {
        match self {
            Precision::Single => 4,
            Precision::Double => 8,
        }
    }

    pub fn header_size(self) -> usize {
        8 + 2 * self.real_size() + TEXT_LEN + 12
    }

    fn read_real(self, bytes: &[u8]) -> f64 {
        match self {
            Precision::Single => LittleEndian::read_f32(bytes) as f64,
            Precision::Double => LittleEndian::read_f64(bytes),
        }
    }
}

/// Header of one record. `kstp`, `kper` and `ilay` are stored as written,
/// one-based.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadRecord {
    pub kstp: i32,
    pub kper: i32,
    pub pertim: f64,
    pub totim: f64,
    pub text: String,
    pub ncol: usize,
    pub nrow: usize,
    pub ilay: i32,
    #[serde(skip)]
    data_offset: usize,
}

impl HeadRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(kstp: i32, kper: i32, pertim: f64, totim: f64, text: &str, ncol: usize, nrow: usize, ilay: i32) -> Self {
        Self {
            kstp,
            kper,
            pertim,
            totim,
            text: text.trim().to_string(),
            ncol,
            nrow,
            ilay,
            data_offset: 0,
        }
    }

    fn from_bytes(bytes: &[u8], precision: Precision) -> Option<Self> {
        let rs = precision.real_size();
        let text_start = 8 + 2 * rs;
        let text_bytes = &bytes[text_start..text_start + TEXT_LEN];
        if !text_bytes.iter().all(|b| (0x20..0x7f).contains(b)) {
            return None;
        }
        let dims = text_start + TEXT_LEN;
        let ncol = LittleEndian::read_i32(&bytes[dims..dims + 4]);
        let nrow = LittleEndian::read_i32(&bytes[dims + 4..dims + 8]);
        let ilay = LittleEndian::read_i32(&bytes[dims + 8..dims + 12]);
        if ncol <= 0 || nrow <= 0 {
            return None;
        }
        Some(Self {
            kstp: LittleEndian::read_i32(&bytes[0..4]),
            kper: LittleEndian::read_i32(&bytes[4..8]),
            pertim: precision.read_real(&bytes[8..8 + rs]),
            totim: precision.read_real(&bytes[8 + rs..8 + 2 * rs]),
            text: String::from_utf8_lossy(text_bytes).trim().to_string(),
            ncol: ncol as usize,
            nrow: nrow as usize,
            ilay,
            data_offset: 0,
        })
    }

    fn to_bytes(&self, precision: Precision) -> Vec<u8> {
        let mut bytes = vec![0u8; precision.header_size()];
        let rs = precision.real_size();
        LittleEndian::write_i32(&mut bytes[0..4], self.kstp);
        LittleEndian::write_i32(&mut bytes[4..8], self.kper);
        match precision {
            Precision::Single => {
                LittleEndian::write_f32(&mut bytes[8..12], self.pertim as f32);
                LittleEndian::write_f32(&mut bytes[12..16], self.totim as f32);
            }
            Precision::Double => {
                LittleEndian::write_f64(&mut bytes[8..16], self.pertim);
                LittleEndian::write_f64(&mut bytes[16..24], self.totim);
            }
        }
        let text_start = 8 + 2 * rs;
        let text = format!("{:>16}", self.text);
        let text = text.as_bytes();
        let text = &text[text.len().saturating_sub(TEXT_LEN)..];
        bytes[text_start..text_start + TEXT_LEN].copy_from_slice(text);
        let dims = text_start + TEXT_LEN;
        LittleEndian::write_i32(&mut bytes[dims..dims + 4], self.ncol as i32);
        LittleEndian::write_i32(&mut bytes[dims + 4..dims + 8], self.nrow as i32);
        LittleEndian::write_i32(&mut bytes[dims + 8..dims + 12], self.ilay);
        bytes
    }

    pub fn kstpkper(&self) -> (i32, i32) {
        (self.kstp, self.kper)
    }

    fn data_len(&self, precision: Precision) -> usize {
        self.nrow * self.ncol * precision.real_size()
    }
}

/// Which time step to pull out of a head file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Selector {
    /// Position in [`HeadFile::times`].
    Index(usize),
    Totim(f64),
    /// One-based time step and stress period, as written in the file.
    KstpKper(i32, i32),
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Selector::Index(i) => write!(f, "index {}", i),
            Selector::Totim(t) => write!(f, "totim {}", t),
            Selector::KstpKper(kstp, kper) => write!(f, "kstp {} kper {}", kstp, kper),
        }
    }
}

enum Source {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl Source {
    fn bytes(&self) -> &[u8] {
        match self {
            Source::Mapped(mmap) => &mmap[..],
            Source::Owned(bytes) => bytes.as_slice(),
        }
    }
}

pub struct HeadFile {
    source: Source,
    _file: Option<File>,
    precision: Precision,
    records: Vec<HeadRecord>,
}

impl HeadFile {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let metadata = file.metadata()?;
        let min = Precision::Single.header_size() as u64;
        if metadata.len() < min {
            return Err(OutputError::FileTruncated {
                expected: min,
                actual: metadata.len(),
            });
        }

        let mmap = unsafe { Mmap::map(&file)? };
        let (precision, records) = index_records(&mmap)?;
        tracing::debug!(
            path = %path.as_ref().display(),
            records = records.len(),
            ?precision,
            "opened head file"
        );
        Ok(Self {
            source: Source::Mapped(mmap),
            _file: Some(file),
            precision,
            records,
        })
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let (precision, records) = index_records(&bytes)?;
        Ok(Self {
            source: Source::Owned(bytes),
            _file: None,
            precision,
            records,
        })
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn records(&self) -> &[HeadRecord] {
        &self.records
    }

    pub fn nlay(&self) -> usize {
        self.records
            .iter()
            .map(|r| r.ilay.max(1) as usize)
            .max()
            .unwrap_or(0)
    }

    pub fn nrow(&self) -> usize {
        self.records.first().map_or(0, |r| r.nrow)
    }

    pub fn ncol(&self) -> usize {
        self.records.first().map_or(0, |r| r.ncol)
    }

    /// Distinct simulation times in file order.
    pub fn times(&self) -> Vec<f64> {
        let mut times: Vec<f64> = Vec::new();
        for record in &self.records {
            if times.last() != Some(&record.totim) {
                times.push(record.totim);
            }
        }
        times
    }

    /// Distinct `(kstp, kper)` pairs in file order.
    pub fn kstpkper(&self) -> Vec<(i32, i32)> {
        let mut steps: Vec<(i32, i32)> = Vec::new();
        for record in &self.records {
            if steps.last() != Some(&record.kstpkper()) {
                steps.push(record.kstpkper());
            }
        }
        steps
    }

    /// Values of one record.
    pub fn record_data(&self, index: usize) -> Result<Array2d<f64>> {
        let record = self.records.get(index).ok_or(OutputError::RecordOutOfBounds {
            index,
            total: self.records.len(),
        })?;
        let rs = self.precision.real_size();
        let start = record.data_offset;
        let end = start + record.data_len(self.precision);
        let bytes = self.source.bytes();
        if end > bytes.len() {
            return Err(OutputError::FileTruncated {
                expected: end as u64,
                actual: bytes.len() as u64,
            });
        }
        let values = bytes[start..end]
            .chunks_exact(rs)
            .map(|chunk| self.precision.read_real(chunk))
            .collect();
        Ok(Array2d::from_vec(record.nrow, record.ncol, values, &record.text)?)
    }

    fn matching_records(&self, selector: Selector) -> Result<Vec<usize>> {
        let matches: Vec<usize> = match selector {
            Selector::Index(i) => {
                let times = self.times();
                let totim = *times.get(i).ok_or(OutputError::RecordOutOfBounds {
                    index: i,
                    total: times.len(),
                })?;
                self.records_at(|r| r.totim == totim)
            }
            Selector::Totim(t) => {
                let tol = 1e-6 * t.abs().max(1.0);
                self.records_at(|r| (r.totim - t).abs() <= tol)
            }
            Selector::KstpKper(kstp, kper) => self.records_at(|r| r.kstp == kstp && r.kper == kper),
        };
        if matches.is_empty() {
            return Err(OutputError::NoMatchingRecord(selector.to_string()));
        }
        Ok(matches)
    }

    fn records_at(&self, predicate: impl Fn(&HeadRecord) -> bool) -> Vec<usize> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| predicate(r))
            .map(|(i, _)| i)
            .collect()
    }

    /// One array per layer for the selected time, ordered by layer.
    pub fn get_data(&self, selector: Selector) -> Result<Vec<Array2d<f64>>> {
        let mut indices = self.matching_records(selector)?;
        indices.sort_by_key(|&i| self.records[i].ilay);
        indices.into_iter().map(|i| self.record_data(i)).collect()
    }

    /// `(totim, value)` for one cell across every time in the file.
    pub fn get_ts(&self, cell: CellIndex) -> Result<Vec<(f64, f64)>> {
        if cell.row >= self.nrow() || cell.column >= self.ncol() || cell.layer >= self.nlay() {
            return Err(OutputError::CellOutOfRange(format!(
                "{} outside {}x{}x{} head file",
                cell,
                self.nlay(),
                self.nrow(),
                self.ncol()
            )));
        }
        let ilay = cell.layer as i32 + 1;
        let mut series = Vec::new();
        for (index, record) in self.records.iter().enumerate() {
            if record.ilay != ilay {
                continue;
            }
            let data = self.record_data(index)?;
            if let Some(value) = data.get(cell.row, cell.column) {
                series.push((record.totim, value));
            }
        }
        Ok(series)
    }
}

fn index_records(bytes: &[u8]) -> Result<(Precision, Vec<HeadRecord>)> {
    if bytes.is_empty() {
        return Err(OutputError::InvalidHeader("empty file".to_string()));
    }
    for precision in [Precision::Single, Precision::Double] {
        if let Some(records) = scan(bytes, precision) {
            return Ok((precision, records));
        }
    }
    Err(OutputError::InvalidHeader(
        "records do not decode as single or double precision".to_string(),
    ))
}

fn scan(bytes: &[u8], precision: Precision) -> Option<Vec<HeadRecord>> {
    let header_size = precision.header_size();
    let mut records = Vec::new();
    let mut offset = 0;
    while offset < bytes.len() {
        if offset + header_size > bytes.len() {
            return None;
        }
        let mut record = HeadRecord::from_bytes(&bytes[offset..offset + header_size], precision)?;
        record.data_offset = offset + header_size;
        offset = record.data_offset + record.data_len(precision);
        if offset > bytes.len() {
            return None;
        }
        records.push(record);
    }
    Some(records)
}

/// Writes head-file records.
pub struct HeadFileWriter<W: Write> {
    writer: W,
    precision: Precision,
    records_written: usize,
}

impl HeadFileWriter<BufWriter<File>> {
    pub fn create<P: AsRef<Path>>(path: P, precision: Precision) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file), precision))
    }
}

impl<W: Write> HeadFileWriter<W> {
    pub fn new(writer: W, precision: Precision) -> Self {
        Self {
            writer,
            precision,
            records_written: 0,
        }
    }

    pub fn write_record(&mut self, header: &HeadRecord, values: &[f64]) -> Result<()> {
        let expected = header.nrow * header.ncol;
        if values.len() != expected {
            return Err(OutputError::InvalidHeader(format!(
                "record has {} values, header says {}x{}",
                values.len(),
                header.nrow,
                header.ncol
            )));
        }
        self.writer.write_all(&header.to_bytes(self.precision))?;
        let mut data = vec![0u8; header.data_len(self.precision)];
        match self.precision {
            Precision::Single => {
                for (chunk, value) in data.chunks_exact_mut(4).zip(values) {
                    LittleEndian::write_f32(chunk, *value as f32);
                }
            }
            Precision::Double => {
                for (chunk, value) in data.chunks_exact_mut(8).zip(values) {
                    LittleEndian::write_f64(chunk, *value);
                }
            }
        }
        self.writer.write_all(&data)?;
        self.records_written += 1;
        Ok(())
    }

    pub fn records_written(&self) -> usize {
        self.records_written
    }

    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}
