//! The adaptive binary arithmetic coder engine.
//!
//! A 16-bit fixed-point interval coder with conditional MPS/LPS exchange,
//! driven per bit by the estimation table in [`crate::coding::table`]. The
//! encoder stuffs a zero byte after every 0xFF it emits so the compressed
//! stream can never alias a marker, and resolves carries by re-walking the
//! run of 0xFF bytes it has been holding back. The decoder tracks the
//! encoder bit-for-bit and substitutes zero data once the input runs out
//! or a marker shows up, which keeps truncated streams decodable.

use std::io::{self, Read, Write};

use crate::coding::context::QmContext;
use crate::coding::table::ESTIMATOR;
use crate::error::{CodecError, Result};

/// Renormalization threshold of the 16-bit interval register.
const HALF: u32 = 0x8000;
/// The full interval, 1.0 in the fixed-point convention.
const ONE: u32 = 0x1_0000;

/// Arithmetic encoder over an abstract byte sink.
///
/// Exactly one instance drives a scan; [`restart`](Self::restart) resets
/// the register state at restart boundaries, never the caller's contexts.
pub struct QmEncoder<W: Write> {
    sink: W,
    /// Code register; bits 19..27 hold the byte being assembled.
    c: u32,
    /// Interval register.
    a: u32,
    /// Shifts remaining until the next byte is ready.
    ct: i32,
    /// Last assembled byte, held back for carry resolution; -1 = none yet.
    buffer: i32,
    /// Run of assembled 0xFF bytes a carry could still walk through.
    stacked_ff: u32,
    /// Deferred 0x00 bytes; dropped if the scan ends before data follows.
    pending_zero: u32,
}

impl<W: Write> QmEncoder<W> {
    pub fn new(sink: W) -> Self {
        QmEncoder {
            sink,
            c: 0,
            a: ONE,
            ct: 11,
            buffer: -1,
            stacked_ff: 0,
            pending_zero: 0,
        }
    }

    /// Encode one bit in the given context and adapt the context.
    #[inline(always)]
    pub fn encode_bit(&mut self, ctx: &mut QmContext, bit: bool) -> Result<()> {
        let entry = &ESTIMATOR[ctx.index as usize];
        let qe = u32::from(entry.qe);

        self.a -= qe;
        if bit != ctx.mps {
            // LPS: take the upper subinterval unless the estimate outgrew
            // the MPS share, in which case the subintervals are exchanged.
            if self.a >= qe {
                self.c += self.a;
                self.a = qe;
            }
            if entry.switch {
                ctx.mps = !ctx.mps;
            }
            ctx.index = entry.nlps;
        } else {
            // MPS: the context only adapts when renormalization fires.
            if self.a >= HALF {
                return Ok(());
            }
            if self.a < qe {
                self.c += self.a;
                self.a = qe;
            }
            ctx.index = entry.nmps;
        }

        loop {
            self.a <<= 1;
            self.c <<= 1;
            self.ct -= 1;
            if self.ct == 0 {
                self.byte_out()?;
                self.c &= 0x7_FFFF;
                self.ct = 8;
            }
            if self.a >= HALF {
                break;
            }
        }
        Ok(())
    }

    /// Move the finished byte out of the code register, resolving carries
    /// through the held-back byte and any stacked 0xFF run.
    fn byte_out(&mut self) -> Result<()> {
        let t = self.c >> 19;
        if t > 0xFF {
            // Carry: bump the held byte, turn the stacked 0xFF run into
            // zeros, and stuff after the bumped byte if it became 0xFF.
            if self.buffer >= 0 {
                self.drain_zeros()?;
                self.emit((self.buffer + 1) as u8)?;
                if self.buffer + 1 == 0xFF {
                    self.emit(0x00)?;
                }
            }
            self.pending_zero += self.stacked_ff;
            self.stacked_ff = 0;
            self.buffer = (t & 0xFF) as i32;
        } else if t == 0xFF {
            // Cannot release yet; a later carry may still walk through it.
            self.stacked_ff += 1;
        } else {
            // The new byte seals everything held so far against carries.
            if self.buffer == 0 {
                self.pending_zero += 1;
            } else if self.buffer >= 0 {
                self.drain_zeros()?;
                self.emit(self.buffer as u8)?;
            }
            if self.stacked_ff > 0 {
                self.drain_zeros()?;
                for _ in 0..self.stacked_ff {
                    self.emit(0xFF)?;
                    self.emit(0x00)?;
                }
                self.stacked_ff = 0;
            }
            self.buffer = t as i32;
        }
        Ok(())
    }

    /// Terminate the interval and push out whatever the decoder will need;
    /// trailing zero bytes are dropped because the decoder regenerates
    /// them as padding. With `last == false` the registers come back
    /// primed for the next restart segment.
    pub fn flush(&mut self, last: bool) -> Result<()> {
        // Pick the codeword in the final interval with the most trailing
        // zero bits.
        let t = self.a.wrapping_sub(1).wrapping_add(self.c) & 0xFFFF_0000;
        self.c = if t < self.c { t + HALF } else { t };
        self.c <<= self.ct;

        if self.c & 0xF800_0000 != 0 {
            // The alignment shift produced one final carry.
            if self.buffer >= 0 {
                self.drain_zeros()?;
                self.emit((self.buffer + 1) as u8)?;
                if self.buffer + 1 == 0xFF {
                    self.emit(0x00)?;
                }
            }
            self.pending_zero += self.stacked_ff;
            self.stacked_ff = 0;
        } else {
            if self.buffer == 0 {
                self.pending_zero += 1;
            } else if self.buffer >= 0 {
                self.drain_zeros()?;
                self.emit(self.buffer as u8)?;
            }
            if self.stacked_ff > 0 {
                self.drain_zeros()?;
                for _ in 0..self.stacked_ff {
                    self.emit(0xFF)?;
                    self.emit(0x00)?;
                }
                self.stacked_ff = 0;
            }
        }

        // Up to two data bytes remain in the register; emit them only if
        // they carry set bits.
        if self.c & 0x7FF_F800 != 0 {
            self.drain_zeros()?;
            self.emit(((self.c >> 19) & 0xFF) as u8)?;
            if (self.c >> 19) & 0xFF == 0xFF {
                self.emit(0x00)?;
            }
            if self.c & 0x7_F800 != 0 {
                self.emit(((self.c >> 11) & 0xFF) as u8)?;
                if (self.c >> 11) & 0xFF == 0xFF {
                    self.emit(0x00)?;
                }
            }
        }

        if !last {
            self.restart();
        }
        Ok(())
    }

    /// Reset the register state for the next restart segment. Contexts are
    /// owned by the caller and are reset separately.
    pub fn restart(&mut self) {
        self.c = 0;
        self.a = ONE;
        self.ct = 11;
        self.buffer = -1;
        self.stacked_ff = 0;
        self.pending_zero = 0;
    }

    pub fn sink_mut(&mut self) -> &mut W {
        &mut self.sink
    }

    pub fn into_inner(self) -> W {
        self.sink
    }

    fn drain_zeros(&mut self) -> Result<()> {
        while self.pending_zero > 0 {
            self.emit(0x00)?;
            self.pending_zero -= 1;
        }
        Ok(())
    }

    fn emit(&mut self, byte: u8) -> Result<()> {
        self.sink.write_all(&[byte]).map_err(CodecError::Sink)
    }
}

/// Arithmetic decoder over an abstract byte source.
///
/// Mirrors the encoder's interval split exactly. Past end of data, or once
/// a marker turns up in the stream, it feeds itself zero bytes; decoding
/// stays deterministic and the marker is latched for the scan driver.
pub struct QmDecoder<R: Read> {
    source: R,
    /// Code register: the received code prefix, `ct` bits beyond alignment.
    c: u32,
    /// Interval register.
    a: u32,
    /// Bits of `c` below the current interval alignment; starts at -16 to
    /// request the two priming bytes.
    ct: i32,
    /// Marker code seen while fetching; data is zero-padded from there on.
    marker: Option<u8>,
    exhausted: bool,
}

impl<R: Read> QmDecoder<R> {
    pub fn new(source: R) -> Self {
        QmDecoder {
            source,
            c: 0,
            a: 0,
            ct: -16,
            marker: None,
            exhausted: false,
        }
    }

    /// Decode one bit in the given context and adapt the context. The
    /// adaptation path is identical to the encoder's, which is what keeps
    /// the two state machines in lockstep.
    #[inline(always)]
    pub fn decode_bit(&mut self, ctx: &mut QmContext) -> Result<bool> {
        while self.a < HALF {
            self.ct -= 1;
            if self.ct < 0 {
                let data = self.byte_in()?;
                self.c = (self.c << 8) | u32::from(data);
                self.ct += 8;
                if self.ct < 0 {
                    self.ct += 1;
                    if self.ct == 0 {
                        // Both priming bytes are in; open at the full
                        // interval (doubled on loop exit).
                        self.a = HALF;
                    }
                }
            }
            self.a <<= 1;
        }

        let entry = &ESTIMATOR[ctx.index as usize];
        let qe = u32::from(entry.qe);

        self.a -= qe;
        let bound = self.a << self.ct;
        let bit;
        if self.c >= bound {
            // Upper subinterval: the LPS side, unless exchanged.
            self.c -= bound;
            if self.a < qe {
                bit = ctx.mps;
                ctx.index = entry.nmps;
            } else {
                bit = !ctx.mps;
                if entry.switch {
                    ctx.mps = !ctx.mps;
                }
                ctx.index = entry.nlps;
            }
            self.a = qe;
        } else if self.a < HALF {
            // Lower subinterval with renormalization due: the MPS side,
            // unless exchanged.
            if self.a < qe {
                bit = !ctx.mps;
                if entry.switch {
                    ctx.mps = !ctx.mps;
                }
                ctx.index = entry.nlps;
            } else {
                bit = ctx.mps;
                ctx.index = entry.nmps;
            }
        } else {
            bit = ctx.mps;
        }
        Ok(bit)
    }

    /// Take the marker latched during fetching, if any.
    pub fn take_marker(&mut self) -> Option<u8> {
        self.marker.take()
    }

    /// True once the coder is running on substituted zero data.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Reset the register state for the next restart segment.
    pub fn restart(&mut self) {
        self.c = 0;
        self.a = 0;
        self.ct = -16;
        self.marker = None;
        self.exhausted = false;
    }

    pub fn source_mut(&mut self) -> &mut R {
        &mut self.source
    }

    pub fn into_inner(self) -> R {
        self.source
    }

    /// Fetch the next data byte, undoing byte stuffing. A marker or end of
    /// data switches the coder onto zero padding.
    fn byte_in(&mut self) -> Result<u8> {
        if self.exhausted || self.marker.is_some() {
            return Ok(0);
        }
        let byte = match self.read_byte()? {
            Some(b) => b,
            None => {
                self.exhausted = true;
                return Ok(0);
            }
        };
        if byte != 0xFF {
            return Ok(byte);
        }
        // 0xFF starts either a stuffed data byte or a marker; repeated
        // 0xFF bytes are fill.
        loop {
            match self.read_byte()? {
                None => {
                    self.exhausted = true;
                    return Ok(0);
                }
                Some(0x00) => return Ok(0xFF),
                Some(0xFF) => continue,
                Some(code) => {
                    self.marker = Some(code);
                    return Ok(0);
                }
            }
        }
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut buf = [0u8; 1];
        loop {
            match self.source.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(buf[0])),
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(CodecError::Source(e)),
            }
        }
    }
}
