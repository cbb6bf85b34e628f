//! Marker codes the scan core touches: the frame-type code written at scan
//! start and the restart markers between restart intervals. Everything else
//! about the container lives outside this crate.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

/// Frame-type code for the arithmetic-coded lossless process (SOF11).
pub const SOF_AC_LOSSLESS: u8 = 0xCB;
/// Frame-type code for the differential arithmetic-coded lossless process (SOF15).
pub const SOF_AC_LOSSLESS_DIFF: u8 = 0xCF;
/// First restart marker code; RSTm is `RST0 + (m & 7)`.
pub const RST0: u8 = 0xD0;

/// The frame-type code fitting the scan kind.
pub fn frame_code(differential: bool) -> u8 {
    if differential {
        SOF_AC_LOSSLESS_DIFF
    } else {
        SOF_AC_LOSSLESS
    }
}

/// Write a bare marker: 0xFF followed by the code.
pub fn write_marker<W: Write>(sink: &mut W, code: u8) -> io::Result<()> {
    sink.write_u16::<BigEndian>(0xFF00 | u16::from(code))
}

/// Read the two-byte marker expected at the current position.
pub fn read_marker<R: Read>(source: &mut R) -> io::Result<u16> {
    source.read_u16::<BigEndian>()
}

/// Skip entropy-coded bytes, stuffed 0xFF 0x00 pairs included, up to the
/// next marker code. `None` if the data ends first.
pub fn next_marker<R: Read>(source: &mut R) -> io::Result<Option<u8>> {
    loop {
        match read_byte(source)? {
            None => return Ok(None),
            Some(0xFF) => {}
            Some(_) => continue,
        }
        loop {
            match read_byte(source)? {
                None => return Ok(None),
                Some(0x00) => break,
                Some(0xFF) => continue,
                Some(code) => return Ok(Some(code)),
            }
        }
    }
}

fn read_byte<R: Read>(source: &mut R) -> io::Result<Option<u8>> {
    let mut buf = [0u8; 1];
    loop {
        match source.read(&mut buf) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(buf[0])),
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}
