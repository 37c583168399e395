use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Handedness {
    Left,
    Right,
}

impl Handedness {
    pub(crate) fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

impl fmt::Display for Handedness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Left => "Left",
            Self::Right => "Right",
        })
    }
}

/// Anatomical hand landmarks, in the order the detector reports them.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(not(feature = "gui"), allow(dead_code))]
pub(crate) enum HandLandmark {
    Wrist,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexFingerMcp,
    IndexFingerPip,
    IndexFingerDip,
    IndexFingerTip,
    MiddleFingerMcp,
    MiddleFingerPip,
    MiddleFingerDip,
    MiddleFingerTip,
    RingFingerMcp,
    RingFingerPip,
    RingFingerDip,
    RingFingerTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

impl HandLandmark {
    pub(crate) const fn idx(self) -> usize {
        self as usize
    }
}

pub(crate) const NUM_LANDMARKS: usize = HandLandmark::PinkyTip.idx() + 1;

/// A landmark position in pixels; `z` is depth scaled by the frame width.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub(crate) struct Landmark {
    pub(crate) x: i32,
    pub(crate) y: i32,
    pub(crate) z: i32,
}

impl Landmark {
    pub(crate) const ZERO: Self = Self::new(0, 0, 0);

    pub(crate) const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for Landmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

pub(crate) type Landmarks = [Landmark; NUM_LANDMARKS];

/// Sent in place of a hand that is not in view.
pub(crate) const DEFAULT_RECORD: Landmarks = [Landmark::ZERO; NUM_LANDMARKS];

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct Hand {
    pub(crate) handedness: Handedness,
    pub(crate) landmarks: Landmarks,
}

impl Hand {
    #[cfg_attr(not(feature = "gui"), allow(dead_code))]
    pub(crate) fn landmark(&self, which: HandLandmark) -> Landmark {
        self.landmarks[which.idx()]
    }
}

#[cfg(feature = "gui")]
pub(crate) mod constants {
    use super::HandLandmark::{self, *};

    pub(crate) const CONNECTIONS: [(HandLandmark, HandLandmark); 21] = [
        // palm
        (Wrist, ThumbCmc),
        (ThumbCmc, IndexFingerMcp),
        (IndexFingerMcp, MiddleFingerMcp),
        (MiddleFingerMcp, RingFingerMcp),
        (RingFingerMcp, PinkyMcp),
        (PinkyMcp, Wrist),
        // fingers
        (ThumbCmc, ThumbMcp),
        (ThumbMcp, ThumbIp),
        (ThumbIp, ThumbTip),
        (IndexFingerMcp, IndexFingerPip),
        (IndexFingerPip, IndexFingerDip),
        (IndexFingerDip, IndexFingerTip),
        (MiddleFingerMcp, MiddleFingerPip),
        (MiddleFingerPip, MiddleFingerDip),
        (MiddleFingerDip, MiddleFingerTip),
        (RingFingerMcp, RingFingerPip),
        (RingFingerPip, RingFingerDip),
        (RingFingerDip, RingFingerTip),
        (PinkyMcp, PinkyPip),
        (PinkyPip, PinkyDip),
        (PinkyDip, PinkyTip),
    ];
}
