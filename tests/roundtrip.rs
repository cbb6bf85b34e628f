//! End-to-end scan tests: encode a frame, decode the stream, compare.

use jpeg_arith::{
    ComponentParams, PlaneBuffer, Predictor, SampleBuffer, ScanConfig, ScanDecoder, decode_frame,
    encode_frame,
};
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::io::{Seek, SeekFrom, Write};

fn config(width: u32, height: u32, components: usize) -> ScanConfig {
    ScanConfig {
        width,
        height,
        precision: 8,
        point_transform: 0,
        predictor: Predictor::Plane,
        differential: false,
        restart_interval: 0,
        components: vec![ComponentParams { small: 2, large: 6 }; components],
    }
}

fn random_frame(cfg: &ScanConfig, seed: u64) -> PlaneBuffer {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut frame = PlaneBuffer::new(cfg.components.len(), cfg.width, cfg.height);
    let limit = 1i32 << (cfg.precision - cfg.point_transform);
    for c in 0..cfg.components.len() {
        for y in 0..cfg.height {
            for x in 0..cfg.width {
                frame.set(c, x, y, rng.gen_range(0..limit));
            }
        }
    }
    frame
}

fn assert_frames_equal(a: &PlaneBuffer, b: &PlaneBuffer, cfg: &ScanConfig, rows: u32) {
    for c in 0..cfg.components.len() {
        for y in 0..rows {
            for x in 0..cfg.width {
                assert_eq!(
                    a.get(c, x, y),
                    b.get(c, x, y),
                    "component {c} differs at ({x},{y})"
                );
            }
        }
    }
}

/// Every 0xFF in the stream must be followed by a stuffed zero or a
/// marker code; a bare 0xFF would alias a marker.
fn assert_no_bare_marker(bytes: &[u8]) {
    assert_eq!(bytes[0], 0xFF);
    assert!(bytes[1] == 0xCB || bytes[1] == 0xCF, "missing frame marker");
    for (i, win) in bytes[2..].windows(2).enumerate() {
        if win[0] == 0xFF {
            let next = win[1];
            assert!(
                next == 0x00 || (0xD0..=0xD7).contains(&next),
                "bare 0xFF at offset {}",
                i + 2
            );
        }
    }
    assert_ne!(bytes.last().copied(), Some(0xFF));
}

#[test]
fn roundtrip_across_predictors_and_restart_intervals() {
    for selection in 1..=7u8 {
        for &interval in &[0u32, 1, 8, 64] {
            let mut cfg = config(13, 70, 1);
            cfg.predictor = Predictor::from_selection(selection).unwrap();
            cfg.restart_interval = interval;

            let frame = random_frame(&cfg, u64::from(selection) * 100 + u64::from(interval));
            let bytes = encode_frame(&frame, &cfg).unwrap();
            assert_no_bare_marker(&bytes);

            let decoded = decode_frame(&bytes[..], &cfg).unwrap();
            assert_frames_equal(&frame, &decoded, &cfg, cfg.height);
        }
    }
}

#[test]
fn roundtrip_differential_scan() {
    let mut cfg = config(16, 24, 1);
    cfg.differential = true;
    cfg.restart_interval = 1;

    let frame = random_frame(&cfg, 7);
    let bytes = encode_frame(&frame, &cfg).unwrap();
    assert_eq!(&bytes[..2], &[0xFF, 0xCF]);
    assert_no_bare_marker(&bytes);

    let decoded = decode_frame(&bytes[..], &cfg).unwrap();
    assert_frames_equal(&frame, &decoded, &cfg, cfg.height);
}

#[test]
fn roundtrip_multiple_components_with_distinct_thresholds() {
    let mut cfg = config(11, 18, 3);
    cfg.components = vec![
        ComponentParams { small: 0, large: 1 },
        ComponentParams { small: 2, large: 6 },
        ComponentParams { small: 3, large: 8 },
    ];
    cfg.restart_interval = 1;

    let frame = random_frame(&cfg, 21);
    let bytes = encode_frame(&frame, &cfg).unwrap();
    let decoded = decode_frame(&bytes[..], &cfg).unwrap();
    assert_frames_equal(&frame, &decoded, &cfg, cfg.height);
}

#[test]
fn roundtrip_high_precision_samples() {
    let mut cfg = config(9, 17, 1);
    cfg.precision = 12;
    cfg.predictor = Predictor::LeftSlope;

    let frame = random_frame(&cfg, 33);
    let bytes = encode_frame(&frame, &cfg).unwrap();
    let decoded = decode_frame(&bytes[..], &cfg).unwrap();
    assert_frames_equal(&frame, &decoded, &cfg, cfg.height);
}

#[test]
fn roundtrip_with_point_transform() {
    let mut cfg = config(12, 10, 1);
    cfg.point_transform = 2;

    let frame = random_frame(&cfg, 5);
    let bytes = encode_frame(&frame, &cfg).unwrap();
    let decoded = decode_frame(&bytes[..], &cfg).unwrap();
    assert_frames_equal(&frame, &decoded, &cfg, cfg.height);
}

/// Restart resets must not leak state across the boundary: two frames
/// sharing their first restart segment's content must produce identical
/// bytes up to the first restart marker.
#[test]
fn restart_segments_are_independent() {
    let mut cfg = config(10, 16, 1);
    cfg.restart_interval = 1;

    let frame_a = random_frame(&cfg, 42);
    let mut frame_b = random_frame(&cfg, 43);
    for y in 0..8 {
        for x in 0..cfg.width {
            frame_b.set(0, x, y, frame_a.get(0, x, y));
        }
    }

    let bytes_a = encode_frame(&frame_a, &cfg).unwrap();
    let bytes_b = encode_frame(&frame_b, &cfg).unwrap();

    let rst_a = find_rst0(&bytes_a);
    let rst_b = find_rst0(&bytes_b);
    assert_eq!(rst_a, rst_b, "first segments have different lengths");
    assert_eq!(bytes_a[..rst_a], bytes_b[..rst_b]);

    // The first segment alone, truncated right before its restart marker,
    // still reconstructs its rows.
    let mut decoded = PlaneBuffer::new(1, cfg.width, cfg.height);
    let mut dec = ScanDecoder::new(&bytes_a[..rst_a], cfg.clone()).unwrap();
    assert!(dec.start_mcu_row());
    while dec.parse_mcu(&mut decoded).unwrap() {}
    assert_frames_equal(&frame_a, &decoded, &cfg, 8);
}

fn find_rst0(bytes: &[u8]) -> usize {
    bytes
        .windows(2)
        .position(|w| w == [0xFF, 0xD0])
        .expect("stream has no RST0")
}

/// A truncated stream must decode without error to a deterministic tail.
#[test]
fn truncated_stream_decodes_deterministically() {
    let cfg = config(16, 16, 1);
    let frame = random_frame(&cfg, 99);
    let bytes = encode_frame(&frame, &cfg).unwrap();

    let cut = &bytes[..bytes.len() - 2];
    let once = decode_frame(cut, &cfg).unwrap();
    let twice = decode_frame(cut, &cfg).unwrap();
    assert_frames_equal(&once, &twice, &cfg, cfg.height);
}

/// A stream with no entropy-coded data at all still decodes: the coder
/// runs entirely on substituted zero bytes and the result is reproducible.
#[test]
fn empty_stream_decodes_deterministically() {
    let cfg = config(8, 8, 1);
    let once = decode_frame(&[0xFF, 0xCB][..], &cfg).unwrap();
    let twice = decode_frame(&[0xFF, 0xCB][..], &cfg).unwrap();
    assert_frames_equal(&once, &twice, &cfg, cfg.height);
}

#[test]
fn roundtrip_through_a_real_file() {
    let cfg = config(15, 22, 2);
    let frame = random_frame(&cfg, 64);

    let mut file = tempfile::tempfile().unwrap();
    let bytes = encode_frame(&frame, &cfg).unwrap();
    file.write_all(&bytes).unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();

    let decoded = decode_frame(file, &cfg).unwrap();
    assert_frames_equal(&frame, &decoded, &cfg, cfg.height);
}

/// A flat frame compresses to almost nothing: the zero context soaks up
/// every residual after the first.
#[test]
fn uniform_frame_compresses_hard() {
    let cfg = config(64, 64, 1);
    let mut frame = PlaneBuffer::new(1, 64, 64);
    for y in 0..64 {
        for x in 0..64 {
            frame.set(0, x, y, 200);
        }
    }
    let bytes = encode_frame(&frame, &cfg).unwrap();
    assert!(bytes.len() < 64, "4096 flat samples took {} bytes", bytes.len());

    let decoded = decode_frame(&bytes[..], &cfg).unwrap();
    assert_frames_equal(&frame, &decoded, &cfg, cfg.height);
}
