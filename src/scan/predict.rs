//! Spatial prediction for the lossless scan.

/// Predictor selection values 1..7 of the lossless process. `Ra` is the
/// sample to the left, `Rb` the sample above, `Rc` the sample above-left.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Predictor {
    /// Ra
    Left = 1,
    /// Rb
    Above = 2,
    /// Rc
    AboveLeft = 3,
    /// Ra + Rb - Rc
    Plane = 4,
    /// Ra + ((Rb - Rc) >> 1)
    LeftSlope = 5,
    /// Rb + ((Ra - Rc) >> 1)
    AboveSlope = 6,
    /// (Ra + Rb) >> 1
    Average = 7,
}

impl Predictor {
    /// Map a selection byte from the scan header onto a predictor.
    pub fn from_selection(selection: u8) -> Option<Self> {
        match selection {
            1 => Some(Predictor::Left),
            2 => Some(Predictor::Above),
            3 => Some(Predictor::AboveLeft),
            4 => Some(Predictor::Plane),
            5 => Some(Predictor::LeftSlope),
            6 => Some(Predictor::AboveSlope),
            7 => Some(Predictor::Average),
            _ => None,
        }
    }

    /// The prediction from the three causal neighbors. Only applies away
    /// from the first line and first column of a segment; the driver owns
    /// those edge rules.
    #[inline]
    pub fn predict(self, ra: i32, rb: i32, rc: i32) -> i32 {
        match self {
            Predictor::Left => ra,
            Predictor::Above => rb,
            Predictor::AboveLeft => rc,
            Predictor::Plane => ra + rb - rc,
            Predictor::LeftSlope => ra + ((rb - rc) >> 1),
            Predictor::AboveSlope => rb + ((ra - rc) >> 1),
            Predictor::Average => (ra + rb) >> 1,
        }
    }
}

/// Reduce a residual into the signed 16-bit ring the magnitude coder
/// expects; differences are taken modulo 65536.
#[inline]
pub(crate) fn wrap_diff(v: i32) -> i32 {
    i32::from((v & 0xFFFF) as u16 as i16)
}

/// Fold a reconstructed sample back into the 16-bit sample ring.
#[inline]
pub(crate) fn wrap_sample(v: i32) -> i32 {
    v & 0xFFFF
}
