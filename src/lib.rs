//! A [sans-I/O](https://sans-io.readthedocs.io/how-to-sans-io.html)
//! processing core for the Intel Precise Touch & Stylus (IPTS) devices
//! found in Microsoft Surface hardware. The device delivers raw
//! buffers over a HID-style character interface; this crate turns them
//! into stylus events and stabilized, tracked touch contacts.
//!
//! The pipeline has five stages, driven synchronously one buffer at a
//! time:
//!
//! ```text
//! raw bytes -> Reader -> Decoder -> BlobDetector -> ContactTracker -> ContactStabilizer
//!                          |
//!                          +-> stylus records -> EventSink
//! ```
//!
//! Reading the device, loading configuration files and emitting OS
//! input events are left to the surrounding program (see the `iptsd`
//! binary for a minimal one); the core only consumes byte buffers and
//! an [`EventSink`].
//!
//! Usage is simple:
//!
//! ```
//! use ipts::{Config, Contact, Decoder, EventSink, StylusEvent};
//!
//! struct Sink;
//!
//! impl EventSink for Sink {
//!     fn emit_stylus(&mut self, event: &StylusEvent) {
//!         println!("{:?}", event);
//!     }
//!
//!     fn emit_contacts(&mut self, frame: &[Contact]) {
//!         println!("{:?}", frame);
//!     }
//! }
//!
//! let mut decoder = Decoder::new(&Config::default()).unwrap();
//! let mut sink = Sink;
//!
//! // one buffer from the device source
//! let buffer: &[u8] = &[];
//! decoder.process(buffer, &mut sink);
//! ```

#![deny(rustdoc::broken_intra_doc_links)]

pub mod config;
pub mod contact;
pub mod decoder;
pub mod detector;
pub mod heatmap;
pub mod processor;
pub mod protocol;
pub mod reader;
pub mod stabilizer;
pub mod tracker;

pub use config::{Config, ConfigError, DetectorConfig, StabilizerConfig, Thresholds, TrackerConfig};
pub use contact::Contact;
pub use decoder::Decoder;
pub use detector::{Blob, BlobDetector};
pub use heatmap::Heatmap;
pub use processor::{EventSink, StylusEvent, TouchProcessor};
pub use protocol::StylusMode;
pub use reader::{Parse, Reader, ReaderError};
pub use stabilizer::ContactStabilizer;
pub use tracker::ContactTracker;
