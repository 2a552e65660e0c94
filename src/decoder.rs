//! Walks the record hierarchy of one device buffer and routes its
//! contents.
//!
//! Stylus reports are emitted to the [`EventSink`] as soon as they are
//! decoded; heatmap reports are assembled per frame and handed to the
//! [`TouchProcessor`]. Unknown record types are skipped by their
//! advertised size, and a malformed frame only costs that frame.

use std::f64::consts::{FRAC_PI_4, PI};

use log::{debug, trace, warn};

use crate::config::{Config, ConfigError};
use crate::processor::{EventSink, StylusEvent, TouchProcessor};
use crate::protocol::{
    DataHeader, DataType, FrameHeader, FrameType, HeatmapDim, HeatmapTimestamp, PayloadHeader,
    ReportHeader, ReportType, StylusDataV1, StylusDataV2, StylusReportHeader,
};
use crate::reader::{Parse, Reader, ReaderError};

/// Decoder over raw IPTS device buffers.
///
/// One instance carries the touch pipeline's state across buffers;
/// feed it every buffer the device source delivers, in order.
pub struct Decoder {
    touch: TouchProcessor,
}

impl Decoder {
    /// Builds a decoder, rejecting malformed configurations.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        Ok(Decoder {
            touch: TouchProcessor::new(config)?,
        })
    }

    /// Decodes one raw device buffer.
    ///
    /// Parse errors never propagate: a malformed buffer or frame is
    /// logged and dropped, and decoding resumes with the next input.
    pub fn process<S: EventSink>(&mut self, buffer: &[u8], sink: &mut S) {
        let mut reader = Reader::new(buffer);

        if let Err(err) = self.parse_data(&mut reader, sink) {
            warn!("dropping malformed buffer: {}", err);
        }
    }

    /// Clears all temporal touch state, e.g. after the device was
    /// re-opened.
    pub fn reset(&mut self) {
        self.touch.reset();
    }

    fn parse_data<S: EventSink>(
        &mut self,
        reader: &mut Reader<'_>,
        sink: &mut S,
    ) -> Result<(), ReaderError> {
        let header: DataHeader = reader.read_as()?;

        match header.kind {
            DataType::Payload => {
                let mut payload = reader.subspan(header.size as usize)?;
                self.parse_payload(&mut payload, sink)
            }
            kind => {
                debug!("skipping {:?} data record of {} bytes", kind, header.size);
                Ok(())
            }
        }
    }

    fn parse_payload<S: EventSink>(
        &mut self,
        reader: &mut Reader<'_>,
        sink: &mut S,
    ) -> Result<(), ReaderError> {
        let header: PayloadHeader = reader.read_as()?;

        for _ in 0..header.frames {
            let frame: FrameHeader = reader.read_as()?;
            let mut body = reader.subspan(frame.size as usize)?;

            match frame.kind {
                FrameType::Stylus | FrameType::Heatmap => {
                    // the body is a subspan, so a malformed frame
                    // leaves the outer cursor intact
                    if let Err(err) = self.parse_frame(&mut body, sink) {
                        warn!("discarding frame {}: {}", frame.index, err);
                    }
                }
                FrameType::Unknown(kind) => {
                    debug!(
                        "skipping unknown frame type {:#06x} of {} bytes",
                        kind, frame.size
                    );
                }
            }
        }

        Ok(())
    }

    /// Walks the reports of one frame. Stylus data goes straight to the
    /// sink; heatmap dimensions and cells are collected and processed
    /// together once the frame ends.
    fn parse_frame<S: EventSink>(
        &mut self,
        reader: &mut Reader<'_>,
        sink: &mut S,
    ) -> Result<(), ReaderError> {
        let mut dim: Option<HeatmapDim> = None;
        let mut cells: Option<&[u8]> = None;

        while reader.size() >= ReportHeader::SIZE {
            let header: ReportHeader = reader.read_as()?;
            let mut report = reader.subspan(header.size as usize)?;

            match header.kind {
                ReportType::StylusV1 => read_stylus_v1(&mut report, sink)?,
                ReportType::StylusV2 => read_stylus_v2(&mut report, sink)?,
                ReportType::HeatmapDim => dim = Some(report.read_as()?),
                ReportType::Heatmap => cells = Some(report.rest()),
                ReportType::HeatmapTimestamp => {
                    let time: HeatmapTimestamp = report.read_as()?;
                    trace!("heatmap timestamp {} (count {})", time.timestamp, time.count);
                }
                ReportType::Unknown(kind) => {
                    debug!(
                        "skipping unknown report type {:#06x} of {} bytes",
                        kind, header.size
                    );
                }
            }
        }

        if let (Some(dim), Some(cells)) = (dim, cells) {
            self.touch.process(&dim, cells, sink);
        }

        Ok(())
    }
}

fn read_stylus_v1<S: EventSink>(reader: &mut Reader<'_>, sink: &mut S) -> Result<(), ReaderError> {
    let header: StylusReportHeader = reader.read_as()?;
    trace!("stylus report serial {:#010x}", header.serial);

    for _ in 0..header.elements {
        let data: StylusDataV1 = reader.read_as()?;

        sink.emit_stylus(&StylusEvent {
            timestamp: 0,
            mode: data.mode,
            x: data.x,
            y: data.y,
            // v1 pressure uses a quarter of the v2 scale
            pressure: data.pressure.saturating_mul(4),
            tilt_x: 0,
            tilt_y: 0,
        });
    }

    Ok(())
}

fn read_stylus_v2<S: EventSink>(reader: &mut Reader<'_>, sink: &mut S) -> Result<(), ReaderError> {
    let header: StylusReportHeader = reader.read_as()?;
    trace!("stylus report serial {:#010x}", header.serial);

    for _ in 0..header.elements {
        let data: StylusDataV2 = reader.read_as()?;
        let (tilt_x, tilt_y) = tilt(data.altitude, data.azimuth);

        sink.emit_stylus(&StylusEvent {
            timestamp: data.timestamp,
            mode: data.mode,
            x: data.x,
            y: data.y,
            pressure: data.pressure,
            tilt_x,
            tilt_y,
        });
    }

    Ok(())
}

/// Converts the spherical altitude/azimuth angles (centidegrees) into
/// the two tilt axes the event sink expects. A zero altitude means the
/// device did not measure tilt.
fn tilt(altitude: u16, azimuth: u16) -> (i32, i32) {
    if altitude == 0 {
        return (0, 0);
    }

    let alt = f64::from(altitude) / 18000.0 * PI;
    let azm = f64::from(azimuth) / 18000.0 * PI;
    let scale = 4500.0 / FRAC_PI_4;

    let tilt_x = 9000.0 - alt.cos().atan2(alt.sin() * azm.cos()) * scale;
    let tilt_y = alt.cos().atan2(alt.sin() * azm.sin()) * scale - 9000.0;

    (tilt_x as i32, tilt_y as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_altitude_reports_no_tilt() {
        assert_eq!(tilt(0, 27000), (0, 0));
    }

    #[test]
    fn forty_five_degree_altitude() {
        let (tilt_x, tilt_y) = tilt(4500, 0);

        assert!((tilt_x - 4500).abs() <= 1);
        assert!(tilt_y.abs() <= 1);
    }
}
