//! The probability-estimation state table driving context adaptation.
//!
//! One row per estimator state: the LPS probability estimate `qe`, the
//! successor states after coding the more/less probable symbol, and the
//! flag that flips the MPS sense on an LPS at the bottom of a ladder.
//! The 113 rows are ITU-T T.81 Table D.3, reproduced bit for bit; a single
//! wrong entry desynchronizes against every other compliant coder.

/// One probability-estimation state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    /// LPS probability estimate (16-bit fixed point).
    pub qe: u16,
    /// Next state after coding the MPS (applied on renormalization only).
    pub nmps: u8,
    /// Next state after coding the LPS.
    pub nlps: u8,
    /// Toggle the MPS sense after coding an LPS in this state.
    pub switch: bool,
}

#[rustfmt::skip]
macro_rules! s { ( $qe:expr , $nmps:expr , $nlps:expr , $sw:expr ) =>
    { Transition { qe: $qe, nmps: $nmps, nlps: $nlps, switch: $sw != 0 } } }

/// The full estimator, indices 0..=112. Index 0 with MPS 0 is the reset
/// state of every context.
#[rustfmt::skip]
pub static ESTIMATOR: [Transition; 113] = [
    s!(0x5A1D,   1,   1, 1),
    s!(0x2586,   2,  14, 0),
    s!(0x1114,   3,  16, 0),
    s!(0x080B,   4,  18, 0),
    s!(0x03D8,   5,  20, 0),
    s!(0x01DA,   6,  23, 0),
    s!(0x00E5,   7,  25, 0),
    s!(0x006F,   8,  28, 0),
    s!(0x0036,   9,  30, 0),
    s!(0x001A,  10,  33, 0),
    s!(0x000D,  11,  35, 0),
    s!(0x0006,  12,   9, 0),
    s!(0x0003,  13,  10, 0),
    s!(0x0001,  13,  12, 0),
    s!(0x5A7F,  15,  15, 1),
    s!(0x3F25,  16,  36, 0),
    s!(0x2CF2,  17,  38, 0),
    s!(0x207C,  18,  39, 0),
    s!(0x17B9,  19,  40, 0),
    s!(0x1182,  20,  42, 0),
    s!(0x0CEF,  21,  43, 0),
    s!(0x09A1,  22,  45, 0),
    s!(0x072F,  23,  46, 0),
    s!(0x055C,  24,  48, 0),
    s!(0x0406,  25,  49, 0),
    s!(0x0303,  26,  51, 0),
    s!(0x0240,  27,  52, 0),
    s!(0x01B1,  28,  54, 0),
    s!(0x0144,  29,  56, 0),
    s!(0x00F5,  30,  57, 0),
    s!(0x00B7,  31,  59, 0),
    s!(0x008A,  32,  60, 0),
    s!(0x0068,  33,  62, 0),
    s!(0x004E,  34,  63, 0),
    s!(0x003B,  35,  32, 0),
    s!(0x002C,   9,  33, 0),
    s!(0x5AE1,  37,  37, 1),
    s!(0x484C,  38,  64, 0),
    s!(0x3A0D,  39,  65, 0),
    s!(0x2EF1,  40,  67, 0),
    s!(0x261F,  41,  68, 0),
    s!(0x1F33,  42,  69, 0),
    s!(0x19A8,  43,  70, 0),
    s!(0x1518,  44,  72, 0),
    s!(0x1177,  45,  73, 0),
    s!(0x0E74,  46,  74, 0),
    s!(0x0BFB,  47,  75, 0),
    s!(0x09F8,  48,  77, 0),
    s!(0x0861,  49,  78, 0),
    s!(0x0706,  50,  79, 0),
    s!(0x05CD,  51,  48, 0),
    s!(0x04DE,  52,  50, 0),
    s!(0x040F,  53,  50, 0),
    s!(0x0363,  54,  51, 0),
    s!(0x02D4,  55,  52, 0),
    s!(0x025C,  56,  53, 0),
    s!(0x01F8,  57,  54, 0),
    s!(0x01A4,  58,  55, 0),
    s!(0x0160,  59,  56, 0),
    s!(0x0125,  60,  57, 0),
    s!(0x00F6,  61,  58, 0),
    s!(0x00CB,  62,  59, 0),
    s!(0x00AB,  63,  61, 0),
    s!(0x008F,  32,  61, 0),
    s!(0x5B12,  65,  65, 1),
    s!(0x4D04,  66,  80, 0),
    s!(0x412C,  67,  81, 0),
    s!(0x37D8,  68,  82, 0),
    s!(0x2FE8,  69,  83, 0),
    s!(0x293C,  70,  84, 0),
    s!(0x2379,  71,  86, 0),
    s!(0x1EDF,  72,  87, 0),
    s!(0x1AA9,  73,  87, 0),
    s!(0x174E,  74,  72, 0),
    s!(0x1424,  75,  72, 0),
    s!(0x119C,  76,  74, 0),
    s!(0x0F6B,  77,  74, 0),
    s!(0x0D51,  78,  75, 0),
    s!(0x0BB6,  79,  77, 0),
    s!(0x0A40,  48,  77, 0),
    s!(0x5832,  81,  80, 1),
    s!(0x4D1C,  82,  88, 0),
    s!(0x438E,  83,  89, 0),
    s!(0x3BDD,  84,  90, 0),
    s!(0x34EE,  85,  91, 0),
    s!(0x2EAE,  86,  92, 0),
    s!(0x299A,  87,  93, 0),
    s!(0x2516,  71,  86, 0),
    s!(0x5570,  89,  88, 1),
    s!(0x4CA9,  90,  95, 0),
    s!(0x44D9,  91,  96, 0),
    s!(0x3E22,  92,  97, 0),
    s!(0x3824,  93,  99, 0),
    s!(0x32B4,  94,  99, 0),
    s!(0x2E17,  86,  93, 0),
    s!(0x56A8,  96,  95, 1),
    s!(0x4F46,  97, 101, 0),
    s!(0x47E5,  98, 102, 0),
    s!(0x41CF,  99, 103, 0),
    s!(0x3C3D, 100, 104, 0),
    s!(0x375E,  93,  99, 0),
    s!(0x5231, 102, 105, 0),
    s!(0x4C0F, 103, 106, 0),
    s!(0x4639, 104, 107, 0),
    s!(0x415E,  99, 103, 0),
    s!(0x5627, 106, 105, 1),
    s!(0x50E7, 107, 108, 0),
    s!(0x4B85, 103, 109, 0),
    s!(0x5597, 109, 110, 0),
    s!(0x504F, 107, 111, 0),
    s!(0x5A10, 111, 110, 1),
    s!(0x5522, 109, 112, 0),
    s!(0x59EB, 111, 112, 1),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_closed() {
        // Every successor must stay inside the table; an escape here would
        // be undetectable codestream corruption at run time.
        for (i, t) in ESTIMATOR.iter().enumerate() {
            assert!((t.nmps as usize) < ESTIMATOR.len(), "nmps escapes at {i}");
            assert!((t.nlps as usize) < ESTIMATOR.len(), "nlps escapes at {i}");
        }
    }

    #[test]
    fn reset_state_is_the_fast_attack_state() {
        let t = &ESTIMATOR[0];
        assert_eq!(t.qe, 0x5A1D);
        assert!(t.switch);
        assert_eq!(t.nmps, 1);
        assert_eq!(t.nlps, 1);
    }

    #[test]
    fn estimates_stay_below_half() {
        // Qe is an LPS estimate; it can never reach the midpoint of the
        // 16-bit interval.
        for (i, t) in ESTIMATOR.iter().enumerate() {
            assert!(t.qe < 0x8000, "qe at {i} is not a valid LPS estimate");
            assert!(t.qe > 0, "qe at {i} is zero");
        }
    }

    #[test]
    fn switch_states_sit_at_ladder_bottoms() {
        // MPS flips only happen where the estimate says both symbols are
        // close to equiprobable.
        for t in ESTIMATOR.iter().filter(|t| t.switch) {
            assert!(t.qe > 0x5000);
        }
    }
}
