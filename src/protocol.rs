//! Wire records of the IPTS character device protocol.
//!
//! One device buffer carries a four-level hierarchy: an outer [`DataHeader`],
//! a [`PayloadHeader`] advertising a frame count, [`FrameHeader`]s, and
//! within each frame a sequence of [`ReportHeader`]-prefixed records. All
//! integers are little-endian, all records packed with no padding; reserved
//! bytes are skipped on read.

use crate::reader::{Parse, Reader, ReaderError};

/// Absolute X axis maximum reported by the device.
pub const MAX_X: u16 = 9600;

/// Absolute Y axis maximum reported by the device.
pub const MAX_Y: u16 = 7200;

/// Diagonal of the X/Y axis space.
pub const MAX_DIAGONAL: u16 = 12000;

/// Axis maximum of the single-touch fallback interface.
pub const MAX_SINGLETOUCH: u16 = 1 << 15;

/// Type tag of the outer data header.
///
/// Only `Payload` records carry touch and stylus frames; the others are
/// control traffic that the decoder skips without raising an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Payload,
    Error,
    Vendor,
    HidReport,
    GetFeatures,
    Unknown(u32),
}

impl From<u32> for DataType {
    fn from(tag: u32) -> Self {
        match tag {
            0 => DataType::Payload,
            1 => DataType::Error,
            2 => DataType::Vendor,
            3 => DataType::HidReport,
            4 => DataType::GetFeatures,
            tag => DataType::Unknown(tag),
        }
    }
}

/// Type tag of a payload frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    Stylus,
    Heatmap,
    Unknown(u16),
}

impl From<u16> for FrameType {
    fn from(tag: u16) -> Self {
        match tag {
            6 => FrameType::Stylus,
            8 => FrameType::Heatmap,
            tag => FrameType::Unknown(tag),
        }
    }
}

/// Type tag of a report within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportType {
    HeatmapTimestamp,
    HeatmapDim,
    Heatmap,
    StylusV1,
    StylusV2,
    Unknown(u16),
}

impl From<u16> for ReportType {
    fn from(tag: u16) -> Self {
        match tag {
            0x400 => ReportType::HeatmapTimestamp,
            0x403 => ReportType::HeatmapDim,
            0x425 => ReportType::Heatmap,
            0x410 => ReportType::StylusV1,
            0x460 => ReportType::StylusV2,
            tag => ReportType::Unknown(tag),
        }
    }
}

bitflags::bitflags! {
    /// Stylus state bits shared by the v1 and v2 data records.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StylusMode: u16 {
        /// The stylus hovers within sensing range.
        const PROXIMITY = 1 << 0;
        /// The tip touches the screen.
        const CONTACT = 1 << 1;
        /// The barrel button is pressed.
        const BUTTON = 1 << 2;
        /// The eraser end is active.
        const RUBBER = 1 << 3;
    }
}

/// Outer header of one device buffer. 64 bytes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataHeader {
    pub kind: DataType,
    /// Size of the data that follows this header.
    pub size: u32,
    pub buffer: u32,
}

impl Parse for DataHeader {
    const SIZE: usize = 64;

    fn parse(reader: &mut Reader<'_>) -> Result<Self, ReaderError> {
        let kind = DataType::from(reader.read_u32()?);
        let size = reader.read_u32()?;
        let buffer = reader.read_u32()?;
        reader.skip(52)?;

        Ok(DataHeader { kind, size, buffer })
    }
}

/// Payload header advertising the number of frames. 12 bytes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadHeader {
    pub counter: u32,
    pub frames: u32,
}

impl Parse for PayloadHeader {
    const SIZE: usize = 12;

    fn parse(reader: &mut Reader<'_>) -> Result<Self, ReaderError> {
        let counter = reader.read_u32()?;
        let frames = reader.read_u32()?;
        reader.skip(4)?;

        Ok(PayloadHeader { counter, frames })
    }
}

/// Header of one payload frame. 16 bytes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub index: u16,
    pub kind: FrameType,
    /// Size of the frame body that follows this header.
    pub size: u32,
}

impl Parse for FrameHeader {
    const SIZE: usize = 16;

    fn parse(reader: &mut Reader<'_>) -> Result<Self, ReaderError> {
        let index = reader.read_u16()?;
        let kind = FrameType::from(reader.read_u16()?);
        let size = reader.read_u32()?;
        reader.skip(8)?;

        Ok(FrameHeader { index, kind, size })
    }
}

/// Header of one report within a frame. 4 bytes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportHeader {
    pub kind: ReportType,
    /// Size of the report body that follows this header.
    pub size: u16,
}

impl Parse for ReportHeader {
    const SIZE: usize = 4;

    fn parse(reader: &mut Reader<'_>) -> Result<Self, ReaderError> {
        let kind = ReportType::from(reader.read_u16()?);
        let size = reader.read_u16()?;

        Ok(ReportHeader { kind, size })
    }
}

/// Prefix of a stylus report: element count plus the pen serial.
/// 8 bytes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StylusReportHeader {
    /// Number of stylus data records that follow.
    pub elements: u8,
    pub serial: u32,
}

impl Parse for StylusReportHeader {
    const SIZE: usize = 8;

    fn parse(reader: &mut Reader<'_>) -> Result<Self, ReaderError> {
        let elements = reader.read_u8()?;
        reader.skip(3)?;
        let serial = reader.read_u32()?;

        Ok(StylusReportHeader { elements, serial })
    }
}

/// Stylus element as reported by gen7 devices. 16 bytes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StylusDataV2 {
    pub timestamp: u16,
    pub mode: StylusMode,
    pub x: u16,
    pub y: u16,
    pub pressure: u16,
    /// Altitude angle in centidegrees; 0 means tilt is not reported.
    pub altitude: u16,
    /// Azimuth angle in centidegrees.
    pub azimuth: u16,
}

impl Parse for StylusDataV2 {
    const SIZE: usize = 16;

    fn parse(reader: &mut Reader<'_>) -> Result<Self, ReaderError> {
        let timestamp = reader.read_u16()?;
        let mode = StylusMode::from_bits_truncate(reader.read_u16()?);
        let x = reader.read_u16()?;
        let y = reader.read_u16()?;
        let pressure = reader.read_u16()?;
        let altitude = reader.read_u16()?;
        let azimuth = reader.read_u16()?;
        reader.skip(2)?;

        Ok(StylusDataV2 {
            timestamp,
            mode,
            x,
            y,
            pressure,
            altitude,
            azimuth,
        })
    }
}

/// Stylus element as reported by older devices. 12 bytes on the wire.
///
/// Pressure uses a quarter of the v2 scale and has to be multiplied by
/// four before emission; tilt and timestamps are not reported at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StylusDataV1 {
    pub mode: StylusMode,
    pub x: u16,
    pub y: u16,
    pub pressure: u16,
}

impl Parse for StylusDataV1 {
    const SIZE: usize = 12;

    fn parse(reader: &mut Reader<'_>) -> Result<Self, ReaderError> {
        reader.skip(4)?;
        let mode = StylusMode::from_bits_truncate(u16::from(reader.read_u8()?));
        let x = reader.read_u16()?;
        let y = reader.read_u16()?;
        let pressure = reader.read_u16()?;
        reader.skip(1)?;

        Ok(StylusDataV1 {
            mode,
            x,
            y,
            pressure,
        })
    }
}

/// Dimensions and value range of the heatmap that follows in the same
/// frame. 8 bytes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeatmapDim {
    pub height: u8,
    pub width: u8,
    pub y_min: u8,
    pub y_max: u8,
    pub x_min: u8,
    pub x_max: u8,
    /// Raw cell value at full contact.
    pub z_min: u8,
    /// Raw cell value of an idle cell.
    pub z_max: u8,
}

impl Parse for HeatmapDim {
    const SIZE: usize = 8;

    fn parse(reader: &mut Reader<'_>) -> Result<Self, ReaderError> {
        Ok(HeatmapDim {
            height: reader.read_u8()?,
            width: reader.read_u8()?,
            y_min: reader.read_u8()?,
            y_max: reader.read_u8()?,
            x_min: reader.read_u8()?,
            x_max: reader.read_u8()?,
            z_min: reader.read_u8()?,
            z_max: reader.read_u8()?,
        })
    }
}

/// Device timestamp attached to a heatmap. 8 bytes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeatmapTimestamp {
    pub count: u16,
    pub timestamp: u32,
}

impl Parse for HeatmapTimestamp {
    const SIZE: usize = 8;

    fn parse(reader: &mut Reader<'_>) -> Result<Self, ReaderError> {
        reader.skip(2)?;
        let count = reader.read_u16()?;
        let timestamp = reader.read_u32()?;

        Ok(HeatmapTimestamp { count, timestamp })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::Reader;

    #[test]
    fn data_header_layout() {
        #[rustfmt::skip]
        let mut bytes = vec![
            0x00, 0x00, 0x00, 0x00, // type: payload
            0x2a, 0x00, 0x00, 0x00, // size: 42
            0x03, 0x00, 0x00, 0x00, // buffer: 3
        ];
        bytes.extend_from_slice(&[0; 52]);

        let mut reader = Reader::new(&bytes);
        let header: DataHeader = reader.read_as().unwrap();

        assert_eq!(header.kind, DataType::Payload);
        assert_eq!(header.size, 42);
        assert_eq!(header.buffer, 3);
        assert_eq!(reader.index(), DataHeader::SIZE);
    }

    #[test]
    fn unknown_tags_are_preserved() {
        assert_eq!(DataType::from(7), DataType::Unknown(7));
        assert_eq!(FrameType::from(0xffff), FrameType::Unknown(0xffff));
        assert_eq!(ReportType::from(0x999), ReportType::Unknown(0x999));
    }

    #[test]
    fn stylus_mode_bits() {
        let mode = StylusMode::from_bits_truncate(0b1011);

        assert!(mode.contains(StylusMode::PROXIMITY));
        assert!(mode.contains(StylusMode::CONTACT));
        assert!(!mode.contains(StylusMode::BUTTON));
        assert!(mode.contains(StylusMode::RUBBER));

        // bits outside of the mask are dropped
        assert_eq!(StylusMode::from_bits_truncate(0xfff0 | 0b0001).bits(), 1);
    }

    #[test]
    fn stylus_v1_layout() {
        #[rustfmt::skip]
        let bytes: &[u8] = &[
            0x00, 0x00, 0x00, 0x00, // reserved
            0x03,                   // mode: proximity | contact
            0x10, 0x27,             // x: 10000
            0x20, 0x4e,             // y: 20000
            0xfa, 0x00,             // pressure: 250
            0x00,                   // reserved
        ];

        let mut reader = Reader::new(bytes);
        let data: StylusDataV1 = reader.read_as().unwrap();

        assert_eq!(data.mode, StylusMode::PROXIMITY | StylusMode::CONTACT);
        assert_eq!(data.x, 10000);
        assert_eq!(data.y, 20000);
        assert_eq!(data.pressure, 250);
        assert_eq!(reader.size(), 0);
    }

    #[test]
    fn heatmap_dim_layout() {
        let bytes: &[u8] = &[48, 72, 0, 255, 0, 255, 10, 200];

        let mut reader = Reader::new(bytes);
        let dim: HeatmapDim = reader.read_as().unwrap();

        assert_eq!(dim.height, 48);
        assert_eq!(dim.width, 72);
        assert_eq!(dim.z_min, 10);
        assert_eq!(dim.z_max, 200);
    }
}
