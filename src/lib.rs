//! # Arithmetic-Coded Lossless JPEG Scan Codec
//!
//! The entropy-coding core of a lossless predictive image codec: a
//! context-adaptive binary arithmetic coder (the QM-coder family of the
//! JPEG standards), the context model that bands spatial prediction
//! residuals, and the scan driver that walks a frame in MCU row groups
//! and feeds residual symbols through the coder. Encoder and decoder
//! produce and consume byte-identical streams for the same content; that
//! is the compatibility contract this crate owns.
//!
//! Layering, bottom up:
//! - `coding`: the estimation table, the adaptive contexts and the
//!   encoder/decoder engine over `io::Write` / `io::Read`
//! - `codestream`: the frame-type and restart markers the core touches
//! - `scan`: configuration, spatial prediction and the two driver halves
//! - `buffer`: the sample-buffer seam to the caller's pixel storage
//!
//! Everything else about the container (tables, color, boxes, file I/O)
//! lives with the caller.

pub use error::{CodecError, Result};

pub mod error;

pub mod coding {
    pub mod context;
    pub mod qm_coder;
    pub mod table;
}

pub mod codestream {
    pub mod marker;
}

pub mod scan {
    pub(crate) mod component;
    pub mod config;
    pub mod decoder;
    pub mod encoder;
    pub mod predict;
}

pub mod buffer {
    pub mod frame;
}

pub use buffer::frame::{PlaneBuffer, SampleBuffer};
pub use coding::context::QmContext;
pub use coding::qm_coder::{QmDecoder, QmEncoder};
pub use scan::config::{ComponentParams, ScanConfig};
pub use scan::decoder::ScanDecoder;
pub use scan::encoder::ScanEncoder;
pub use scan::predict::Predictor;

use std::io::Read;

/// Encode a whole frame into a fresh byte vector.
pub fn encode_frame<F: SampleBuffer>(frame: &F, config: &ScanConfig) -> Result<Vec<u8>> {
    let mut encoder = ScanEncoder::new(Vec::new(), config.clone())?;
    while encoder.start_mcu_row() {
        while encoder.write_mcu(frame)? {}
    }
    encoder.finish()
}

/// Decode a whole frame from a byte source.
pub fn decode_frame<R: Read>(source: R, config: &ScanConfig) -> Result<PlaneBuffer> {
    let mut frame = PlaneBuffer::new(config.components.len(), config.width, config.height);
    let mut decoder = ScanDecoder::new(source, config.clone())?;
    while decoder.start_mcu_row() {
        while decoder.parse_mcu(&mut frame)? {}
    }
    decoder.finish()?;
    Ok(frame)
}
