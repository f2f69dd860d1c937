use std::fs::File;
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use memmap2::Mmap;
use ndarray::Array2;

use crate::error::{Result, XtcavError};
use crate::frame::Frame;

pub const SER_HEADER_SIZE: usize = 178;
const SER_MAGIC: &[u8; 14] = b"LUCAM-RECORDER";
const SER_COLOR_MONO: i32 = 0;

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
    /// Bytes per pixel (1 for 8-bit, 2 for 9-16 bit).
    pub fn bytes_per_pixel(&self) -> usize {
        if self.pixel_depth <= 8 { 1 } else { 2 }
    }

    /// Total bytes per frame, `None` on overflow.
    pub fn frame_byte_size(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(self.bytes_per_pixel())
    }
}

/// Memory-mapped reader for monochrome SER camera recordings.
///
/// Pixel values are returned as raw detector counts.
pub struct SerReader {
    mmap: Mmap,
    frame_size: usize,
    pub header: SerHeader,
}

impl SerReader {
    /// Open a SER file and parse its header.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };

        if mmap.len() < SER_HEADER_SIZE {
            return Err(XtcavError::InvalidSer(
                "File too small for SER header".into(),
            ));
        }

        if &mmap[0..14] != SER_MAGIC {
            return Err(XtcavError::InvalidSer(
                "Missing LUCAM-RECORDER magic".into(),
            ));
        }

        let header = parse_header(&mmap[..SER_HEADER_SIZE])?;
        if header.color_id != SER_COLOR_MONO {
            return Err(XtcavError::InvalidSer(format!(
                "Unsupported color id {}, XTCAV recordings are monochrome",
                header.color_id
            )));
        }
        if header.pixel_depth == 0 || header.pixel_depth > 16 {
            return Err(XtcavError::InvalidSer(format!(
                "Unsupported pixel depth {}",
                header.pixel_depth
            )));
        }

        let frame_size = header
            .frame_byte_size()
            .ok_or_else(|| XtcavError::InvalidSer("Frame size overflow".into()))?;
        let expected_data_size = frame_size
            .checked_mul(header.frame_count as usize)
            .and_then(|data| data.checked_add(SER_HEADER_SIZE))
            .ok_or_else(|| XtcavError::InvalidSer("Data size overflow".into()))?;
        if mmap.len() < expected_data_size {
            return Err(XtcavError::InvalidSer(format!(
                "File truncated: expected at least {} bytes, got {}",
                expected_data_size,
                mmap.len()
            )));
        }

        Ok(Self {
            mmap,
            frame_size,
            header,
        })
    }

    pub fn frame_count(&self) -> usize {
        self.header.frame_count as usize
    }

    /// Get the raw bytes for a single frame (zero-copy from mmap).
    pub fn frame_raw(&self, index: usize) -> Result<&[u8]> {
        let count = self.frame_count();
        if index >= count {
            return Err(XtcavError::EventIndexOutOfRange {
                index,
                total: count,
            });
        }
        let offset = SER_HEADER_SIZE + index * self.frame_size;
        Ok(&self.mmap[offset..offset + self.frame_size])
    }

    /// Read a single frame as f32 detector counts.
    pub fn read_frame(&self, index: usize) -> Result<Array2<f32>> {
        let raw = self.frame_raw(index)?;
        Ok(decode_counts(
            raw,
            self.header.height as usize,
            self.header.width as usize,
            self.header.bytes_per_pixel(),
            self.header.little_endian,
        ))
    }

    /// Iterator over all frames, tagged with their frame index.
    pub fn frames(&self) -> impl Iterator<Item = Result<Frame>> + '_ {
        (0..self.frame_count()).map(move |i| self.read_frame(i).map(|data| Frame::new(data, i)))
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
        return Err(XtcavError::InvalidDimensions { width, height });
    }

    // Writers disagree on the meaning of 0; only 1 marks big-endian data.
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

fn decode_counts(
    raw: &[u8],
    height: usize,
    width: usize,
    bytes_per_sample: usize,
    little_endian: bool,
) -> Array2<f32> {
    let mut data = Array2::<f32>::zeros((height, width));

    for row in 0..height {
        for col in 0..width {
            let idx = (row * width + col) * bytes_per_sample;
            data[[row, col]] = if bytes_per_sample == 1 {
                raw[idx] as f32
            } else {
                let pair = [raw[idx], raw[idx + 1]];
                if little_endian {
                    u16::from_le_bytes(pair) as f32
                } else {
                    u16::from_be_bytes(pair) as f32
                }
            };
        }
    }

    data
}
