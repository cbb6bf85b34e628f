//! The decode half of the predictive scan driver.
//!
//! Mirrors the encoder exactly: the same row walk, the same prediction
//! and classification on (Da, Db), the same symbol order through the
//! arithmetic decoder, so the two state machines stay in lockstep on the
//! same byte stream. Restart boundaries resynchronize on RSTm, verify the
//! modulo-8 index and reset the same adaptive state the encoder resets.

use log::{debug, trace};
use std::io::Read;

use crate::buffer::frame::SampleBuffer;
use crate::codestream::marker;
use crate::coding::qm_coder::QmDecoder;
use crate::error::{CodecError, Result};
use crate::scan::component::{ComponentState, MCU_LINES};
use crate::scan::config::ScanConfig;
use crate::scan::predict::wrap_sample;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DriverState {
    RowPending,
    RowActive,
}

/// Decodes one scan; the dual of [`crate::ScanEncoder`].
pub struct ScanDecoder<R: Read> {
    config: ScanConfig,
    coder: QmDecoder<R>,
    components: Vec<ComponentState>,
    state: DriverState,
    row: u32,
    mcus_to_go: u32,
    restart_index: u8,
    neutral_line: bool,
}

impl<R: Read> ScanDecoder<R> {
    /// Validate the configuration, check the frame-type marker and set up
    /// all adaptive state.
    pub fn new(mut source: R, config: ScanConfig) -> Result<Self> {
        config.validate()?;
        let expected = 0xFF00 | u16::from(marker::frame_code(config.differential));
        let found = marker::read_marker(&mut source).map_err(CodecError::Source)?;
        if found != expected {
            return Err(CodecError::UnexpectedMarker { expected, found });
        }
        debug!(
            "parse scan: {}x{}, {} component(s), predictor {:?}{}, restart interval {}",
            config.width,
            config.height,
            config.components.len(),
            config.predictor,
            if config.differential { " (differential)" } else { "" },
            config.restart_interval,
        );
        let components = config
            .components
            .iter()
            .map(|&params| ComponentState::new(params, config.width))
            .collect();
        Ok(ScanDecoder {
            mcus_to_go: config.restart_interval,
            config,
            coder: QmDecoder::new(source),
            components,
            state: DriverState::RowPending,
            row: 0,
            restart_index: 0,
            neutral_line: true,
        })
    }

    /// Advance to the next MCU row. False once the frame is exhausted.
    pub fn start_mcu_row(&mut self) -> bool {
        if self.row >= self.config.height {
            return false;
        }
        self.state = DriverState::RowActive;
        true
    }

    /// Decode one MCU (a full row group) into the frame. Returns whether
    /// more MCUs remain in the current row.
    pub fn parse_mcu<F: SampleBuffer>(&mut self, frame: &mut F) -> Result<bool> {
        if self.state != DriverState::RowActive {
            return Err(CodecError::InvalidState("parse_mcu before start_mcu_row"));
        }
        if self.config.restart_interval > 0 && self.mcus_to_go == 0 {
            self.resync()?;
        }

        let lines = MCU_LINES.min(self.config.height - self.row);
        for l in 0..lines {
            let neutral = self.neutral_line;
            for ci in 0..self.components.len() {
                self.decode_line(frame, ci, l as usize, self.row + l, neutral)?;
            }
            self.neutral_line = false;
        }
        self.row += lines;
        if self.config.restart_interval > 0 {
            self.mcus_to_go -= 1;
        }
        self.state = DriverState::RowPending;
        Ok(false)
    }

    /// Terminate the scan and hand the source back.
    pub fn finish(self) -> Result<R> {
        Ok(self.coder.into_inner())
    }

    /// Restart boundary: consume RSTm (latched by the coder or found by
    /// scanning past leftover stuffed data), verify its index and reset
    /// the same state the encoder reset.
    fn resync(&mut self) -> Result<()> {
        let found = match self.coder.take_marker() {
            Some(code) => code,
            None => marker::next_marker(self.coder.source_mut())
                .map_err(CodecError::Source)?
                .ok_or(CodecError::MissingMarker)?,
        };
        let expected = marker::RST0 + self.restart_index;
        if found != expected {
            return Err(CodecError::UnexpectedMarker {
                expected: 0xFF00 | u16::from(expected),
                found: 0xFF00 | u16::from(found),
            });
        }
        trace!("restart boundary at line {}: RST{}", self.row, self.restart_index);
        self.restart_index = (self.restart_index + 1) & 7;
        self.coder.restart();
        for comp in &mut self.components {
            comp.reset();
        }
        self.neutral_line = true;
        self.mcus_to_go = self.config.restart_interval;
        Ok(())
    }

    fn decode_line<F: SampleBuffer>(
        &mut self,
        frame: &mut F,
        ci: usize,
        l: usize,
        y: u32,
        neutral: bool,
    ) -> Result<()> {
        let neutral_value = self.config.neutral();
        let comp = &mut self.components[ci];
        comp.da[l] = 0;

        for x in 0..self.config.width {
            let pred = if self.config.differential {
                0
            } else if neutral {
                if x == 0 {
                    neutral_value
                } else {
                    frame.get(ci, x - 1, y)
                }
            } else if x == 0 {
                frame.get(ci, x, y - 1)
            } else {
                self.config.predictor.predict(
                    frame.get(ci, x - 1, y),
                    frame.get(ci, x, y - 1),
                    frame.get(ci, x - 1, y - 1),
                )
            };

            let da = comp.da[l];
            let db = comp.db[x as usize];
            let zset = comp
                .contexts
                .sign_zero_mut(da, db, comp.params.small, comp.params.large);

            let diff = if !self.coder.decode_bit(&mut zset.s0)? {
                0
            } else {
                let negative = self.coder.decode_bit(&mut zset.ss)?;
                let first = if negative { &mut zset.sn } else { &mut zset.sp };
                let sz = if self.coder.decode_bit(first)? {
                    let mag = comp.contexts.magnitude_mut(db, comp.params.large);
                    let mut i = 0;
                    let mut m = 2;
                    while self.coder.decode_bit(&mut mag.x[i])? {
                        m <<= 1;
                        i += 1;
                        if i >= mag.x.len() {
                            return Err(CodecError::Corrupt("magnitude category overflow"));
                        }
                    }
                    let mut sz: i32 = m >> 1;
                    let mut bit = sz >> 1;
                    while bit > 0 {
                        if self.coder.decode_bit(&mut mag.m[i])? {
                            sz |= bit;
                        }
                        bit >>= 1;
                    }
                    sz
                } else {
                    0
                };
                if negative { -(sz + 1) } else { sz + 1 }
            };

            frame.set(ci, x, y, wrap_sample(pred + diff));
            comp.da[l] = diff;
            comp.db[x as usize] = diff;
        }
        Ok(())
    }
}
