use std::fs::File;
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use memmap2::Mmap;
use tracing::debug;

use crate::error::{FrapError, Result};
use crate::frame::{Calibration, PixelType, Samples, SourceInfo, Stack};

pub const SER_HEADER_SIZE: usize = 178;
const SER_MAGIC: &[u8; 14] = b"LUCAM-RECORDER";

/// SER timestamps count 100 ns ticks.
const TICKS_PER_SECOND: f64 = 1e7;

/// SER file header (178 bytes).
#[derive(Clone, Debug)]
pub struct SerHeader {
    pub color_id: i32,
    pub little_endian: bool,
    pub width: u32,
    pub height: u32,
    pub pixel_depth: u32,
    pub frame_count: u32,
    pub observer: String,
    pub instrument: String,
    pub telescope: String,
    pub date_time: u64,
    pub date_time_utc: u64,
}

impl SerHeader {
    /// Bytes per sample (1 for 8-bit, 2 for 9-16 bit).
    pub fn bytes_per_sample(&self) -> usize {
        if self.pixel_depth <= 8 { 1 } else { 2 }
    }

    pub fn pixel_type(&self) -> PixelType {
        if self.pixel_depth <= 8 {
            PixelType::U8
        } else {
            PixelType::U16
        }
    }

    /// Total bytes per frame.
    pub fn frame_byte_size(&self) -> usize {
        self.width as usize * self.height as usize * self.bytes_per_sample()
    }
}

/// Memory-mapped reader for single-plane SER videos.
pub struct SerReader {
    mmap: Mmap,
    pub header: SerHeader,
}

impl SerReader {
    /// Open a SER file and validate its header.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };

        if mmap.len() < SER_HEADER_SIZE {
            return Err(FrapError::InvalidSer("File too small for SER header".into()));
        }
        if &mmap[0..14] != SER_MAGIC {
            return Err(FrapError::InvalidSer("Missing LUCAM-RECORDER magic".into()));
        }

        let header = parse_header(&mmap[..SER_HEADER_SIZE])?;
        if header.pixel_depth == 0 || header.pixel_depth > 16 {
            return Err(FrapError::InvalidSer(format!(
                "Unsupported pixel depth: {} bits",
                header.pixel_depth
            )));
        }
        if header.color_id >= 100 {
            return Err(FrapError::UnsupportedPixelFormat(format!(
                "multi-plane SER color id {}",
                header.color_id
            )));
        }

        let expected = header
            .frame_byte_size()
            .checked_mul(header.frame_count as usize)
            .and_then(|d| d.checked_add(SER_HEADER_SIZE))
            .ok_or_else(|| FrapError::InvalidSer("Frame data size overflows".into()))?;
        if mmap.len() < expected {
            return Err(FrapError::InvalidSer(format!(
                "File truncated: expected at least {} bytes, got {}",
                expected,
                mmap.len()
            )));
        }

        Ok(Self { mmap, header })
    }

    pub fn frame_count(&self) -> usize {
        self.header.frame_count as usize
    }

    /// Raw bytes of one frame (zero-copy from the mapping).
    pub fn frame_raw(&self, index: usize) -> &[u8] {
        assert!(index < self.frame_count(), "frame {index} out of range");
        let size = self.header.frame_byte_size();
        let offset = SER_HEADER_SIZE + index * size;
        &self.mmap[offset..offset + size]
    }

    /// Per-frame timestamps from the optional trailer.
    pub fn timestamps(&self) -> Option<Vec<u64>> {
        let trailer =
            SER_HEADER_SIZE + self.header.frame_byte_size() * self.frame_count();
        if trailer + 8 * self.frame_count() > self.mmap.len() {
            return None;
        }
        let mut cursor = std::io::Cursor::new(&self.mmap[trailer..]);
        (0..self.frame_count())
            .map(|_| cursor.read_u64::<LittleEndian>().ok())
            .collect()
    }

    /// Median spacing of the trailer timestamps in seconds, if present and positive.
    pub fn frame_interval_seconds(&self) -> Option<f64> {
        let stamps = self.timestamps()?;
        let mut deltas: Vec<u64> = stamps
            .windows(2)
            .filter_map(|w| w[1].checked_sub(w[0]))
            .filter(|&d| d > 0)
            .collect();
        if deltas.is_empty() {
            return None;
        }
        deltas.sort_unstable();
        Some(deltas[deltas.len() / 2] as f64 / TICKS_PER_SECOND)
    }

    pub fn source_info(&self, path: &Path) -> SourceInfo {
        SourceInfo {
            path: path.to_path_buf(),
            total_frames: self.frame_count(),
            width: self.header.width,
            height: self.header.height,
            pixel_type: self.header.pixel_type(),
            observer: non_empty(&self.header.observer),
            instrument: non_empty(&self.header.instrument),
        }
    }

    /// Decode every frame into a stack of raw samples.
    ///
    /// Without an explicit calibration, the frame interval comes from the
    /// timestamp trailer when it has one.
    pub fn read_stack(&self, calibration: Option<Calibration>) -> Result<Stack> {
        let frames = self.frame_count();
        let n = self.header.width as usize * self.header.height as usize;
        let data = &self.mmap[SER_HEADER_SIZE..SER_HEADER_SIZE + self.header.frame_byte_size() * frames];

        let samples = match self.header.pixel_type() {
            PixelType::U8 => Samples::U8(data.to_vec()),
            _ => {
                let le = self.header.little_endian;
                Samples::U16(
                    data.chunks_exact(2)
                        .map(|pair| {
                            let pair = [pair[0], pair[1]];
                            if le {
                                u16::from_le_bytes(pair)
                            } else {
                                u16::from_be_bytes(pair)
                            }
                        })
                        .collect(),
                )
            }
        };
        debug_assert_eq!(samples.len(), n * frames);

        let calibration = calibration.unwrap_or_else(|| match self.frame_interval_seconds() {
            Some(dt) => Calibration {
                frame_interval: dt,
                time_unit: "s".into(),
                ..Calibration::default()
            },
            None => Calibration::default(),
        });
        debug!(
            frames,
            width = self.header.width,
            height = self.header.height,
            depth = self.header.pixel_depth,
            "SER stack decoded"
        );
        Stack::new(
            self.header.width as usize,
            self.header.height as usize,
            frames,
            samples,
            calibration,
        )
    }
}

fn parse_header(buf: &[u8]) -> Result<SerHeader> {
    let mut cursor = std::io::Cursor::new(&buf[14..]); // skip magic

    let _lu_id = cursor.read_i32::<LittleEndian>()?;
    let color_id = cursor.read_i32::<LittleEndian>()?;
    let le_flag = cursor.read_i32::<LittleEndian>()?;
    let width = cursor.read_i32::<LittleEndian>()? as u32;
    let height = cursor.read_i32::<LittleEndian>()? as u32;
    let pixel_depth = cursor.read_i32::<LittleEndian>()? as u32;
    let frame_count = cursor.read_i32::<LittleEndian>()? as u32;

    let observer = read_fixed_string(&buf[42..82]);
    let instrument = read_fixed_string(&buf[82..122]);
    let telescope = read_fixed_string(&buf[122..162]);

    let mut cursor = std::io::Cursor::new(&buf[162..]);
    let date_time = cursor.read_u64::<LittleEndian>()?;
    let date_time_utc = cursor.read_u64::<LittleEndian>()?;

    if width == 0 || height == 0 {
        return Err(FrapError::InvalidDimensions { width, height });
    }

    // Most writers put 0 here for little-endian data despite the format notes.
    let little_endian = le_flag != 1;

    Ok(SerHeader {
        color_id,
        little_endian,
        width,
        height,
        pixel_depth,
        frame_count,
        observer,
        instrument,
        telescope,
        date_time,
        date_time_utc,
    })
}

fn read_fixed_string(buf: &[u8]) -> String {
    String::from_utf8_lossy(buf)
        .trim_end_matches('\0')
        .trim()
        .to_string()
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() { None } else { Some(s.to_string()) }
}
