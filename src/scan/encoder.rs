//! The encode half of the predictive scan driver.
//!
//! Walks the frame in MCU row groups, forms the spatial prediction
//! residual of every sample, classifies it on the neighbor differences
//! (Da, Db) and drives the arithmetic coder through the
//! zero / sign / magnitude symbol sequence. Restart intervals terminate
//! the entropy stream, emit RSTm and reset every piece of adaptive state.

use log::{debug, trace};
use std::io::Write;

use crate::buffer::frame::SampleBuffer;
use crate::codestream::marker;
use crate::coding::qm_coder::QmEncoder;
use crate::error::{CodecError, Result};
use crate::scan::component::{ComponentState, MCU_LINES};
use crate::scan::config::ScanConfig;
use crate::scan::predict::wrap_diff;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DriverState {
    RowPending,
    RowActive,
}

/// Encodes one scan. Constructing it starts the scan; consuming it with
/// [`finish`](Self::finish) flushes and ends it, so a flushed scan cannot
/// be driven again.
pub struct ScanEncoder<W: Write> {
    config: ScanConfig,
    coder: QmEncoder<W>,
    pub(crate) components: Vec<ComponentState>,
    state: DriverState,
    /// Next image line to code.
    row: u32,
    /// MCUs left before the next restart boundary; unused if the interval
    /// is zero.
    mcus_to_go: u32,
    /// Modulo-8 index of the next restart marker.
    restart_index: u8,
    /// The next line coded starts a restart segment and takes the
    /// neutral-prediction edge rules.
    neutral_line: bool,
}

impl<W: Write> ScanEncoder<W> {
    /// Validate the configuration, emit the frame-type marker and set up
    /// all adaptive state.
    pub fn new(mut sink: W, config: ScanConfig) -> Result<Self> {
        config.validate()?;
        marker::write_marker(&mut sink, marker::frame_code(config.differential))
            .map_err(CodecError::Sink)?;
        debug!(
            "write scan: {}x{}, {} component(s), predictor {:?}{}, restart interval {}",
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
        Ok(ScanEncoder {
            mcus_to_go: config.restart_interval,
            config,
            coder: QmEncoder::new(sink),
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

    /// Encode one MCU (a full row group). Returns whether more MCUs remain
    /// in the current row.
    pub fn write_mcu<F: SampleBuffer>(&mut self, frame: &F) -> Result<bool> {
        if self.state != DriverState::RowActive {
            return Err(CodecError::InvalidState("write_mcu before start_mcu_row"));
        }
        if self.config.restart_interval > 0 && self.mcus_to_go == 0 {
            self.restart()?;
        }

        let lines = MCU_LINES.min(self.config.height - self.row);
        for l in 0..lines {
            let neutral = self.neutral_line;
            for ci in 0..self.components.len() {
                self.encode_line(frame, ci, l as usize, self.row + l, neutral)?;
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

    /// Terminate the scan: flush the coder and hand the sink back.
    pub fn finish(mut self) -> Result<W> {
        self.coder.flush(true)?;
        Ok(self.coder.into_inner())
    }

    /// Restart boundary: flush to a byte boundary, emit RSTm, reset the
    /// coder registers, every context set and both differential buffers.
    fn restart(&mut self) -> Result<()> {
        self.coder.flush(false)?;
        marker::write_marker(self.coder.sink_mut(), marker::RST0 + self.restart_index)
            .map_err(CodecError::Sink)?;
        trace!("restart boundary at line {}: RST{}", self.row, self.restart_index);
        self.restart_index = (self.restart_index + 1) & 7;
        for comp in &mut self.components {
            comp.reset();
        }
        self.neutral_line = true;
        self.mcus_to_go = self.config.restart_interval;
        Ok(())
    }

    fn encode_line<F: SampleBuffer>(
        &mut self,
        frame: &F,
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
            let diff = wrap_diff(frame.get(ci, x, y) - pred);

            let da = comp.da[l];
            let db = comp.db[x as usize];
            let zset = comp
                .contexts
                .sign_zero_mut(da, db, comp.params.small, comp.params.large);

            if diff == 0 {
                self.coder.encode_bit(&mut zset.s0, false)?;
            } else {
                self.coder.encode_bit(&mut zset.s0, true)?;
                let negative = diff < 0;
                self.coder.encode_bit(&mut zset.ss, negative)?;
                let sz = if negative { -diff - 1 } else { diff - 1 };

                let first = if negative { &mut zset.sn } else { &mut zset.sp };
                self.coder.encode_bit(first, sz > 0)?;

                if sz > 0 {
                    let mag = comp.contexts.magnitude_mut(db, comp.params.large);
                    let mut i = 0;
                    let mut m = 2;
                    while sz >= m {
                        self.coder.encode_bit(&mut mag.x[i], true)?;
                        m <<= 1;
                        i += 1;
                    }
                    self.coder.encode_bit(&mut mag.x[i], false)?;
                    m >>= 1;
                    loop {
                        m >>= 1;
                        if m == 0 {
                            break;
                        }
                        self.coder.encode_bit(&mut mag.m[i], sz & m != 0)?;
                    }
                }
            }

            comp.da[l] = diff;
            comp.db[x as usize] = diff;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::frame::PlaneBuffer;
    use crate::scan::config::ComponentParams;
    use crate::scan::predict::Predictor;

    fn uniform_config() -> ScanConfig {
        ScanConfig {
            width: 4,
            height: 4,
            precision: 8,
            point_transform: 0,
            predictor: Predictor::Plane,
            differential: false,
            restart_interval: 0,
            components: vec![ComponentParams { small: 2, large: 6 }],
        }
    }

    #[test]
    fn write_mcu_requires_a_started_row() {
        let frame = PlaneBuffer::new(1, 4, 4);
        let mut enc = ScanEncoder::new(Vec::new(), uniform_config()).unwrap();
        assert!(matches!(
            enc.write_mcu(&frame),
            Err(CodecError::InvalidState(_))
        ));
    }

    #[test]
    fn uniform_block_exercises_only_the_zero_band_contexts() {
        // A block sitting exactly at the neutral prediction codes a zero
        // residual for every sample, so every (Da, Db) pair classifies to
        // band (0, 0) and only that cell's zero context may adapt.
        let mut frame = PlaneBuffer::new(1, 4, 4);
        for y in 0..4 {
            for x in 0..4 {
                frame.set(0, x, y, 128);
            }
        }
        let mut enc = ScanEncoder::new(Vec::new(), uniform_config()).unwrap();
        while enc.start_mcu_row() {
            while enc.write_mcu(&frame).unwrap() {}
        }

        let contexts = &enc.components[0].contexts;
        for (r, row) in contexts.sign_zero.iter().enumerate() {
            for (c, zset) in row.iter().enumerate() {
                if (r, c) == (2, 2) {
                    assert!(!zset.s0.is_initial(), "zero context never adapted");
                } else {
                    assert!(zset.s0.is_initial(), "grid cell ({r},{c}) adapted");
                }
                assert!(zset.ss.is_initial());
                assert!(zset.sp.is_initial());
                assert!(zset.sn.is_initial());
            }
        }
        assert!(contexts.magnitude_low.x.iter().all(|c| c.is_initial()));
        assert!(contexts.magnitude_high.x.iter().all(|c| c.is_initial()));

        let bytes = enc.finish().unwrap();
        let decoded = crate::decode_frame(&bytes[..], &uniform_config()).unwrap();
        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(decoded.get(0, x, y), 128);
            }
        }
    }
}
