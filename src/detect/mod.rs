use crate::{error::Error, hand::Hand};
use opencv::core::Mat;

pub(crate) trait HandDetector<F> {
    /// Find up to two hands in `frame`, with landmarks in the frame's own pixel
    /// coordinates (origin top-left, y down).
    fn detect(&mut self, frame: &F) -> Result<Vec<Hand>, Error>;
}

mod blank;
#[cfg(feature = "tflite")]
mod input;
#[cfg(feature = "tflite")]
pub(crate) mod landmark;
#[cfg(feature = "tflite")]
mod palm;

pub(crate) enum Detect {
    /// Report no hands at all.
    Blank(blank::Detector),
    /// Find palms, then run a hand landmark model around each one.
    #[cfg(feature = "tflite")]
    Landmark(landmark::Detector),
}

impl Default for Detect {
    fn default() -> Self {
        Self::Blank(blank::Detector)
    }
}

impl HandDetector<Mat> for Detect {
    fn detect(&mut self, frame: &Mat) -> Result<Vec<Hand>, Error> {
        match self {
            Self::Blank(d) => d.detect(frame),
            #[cfg(feature = "tflite")]
            Self::Landmark(d) => d.detect(frame),
        }
    }
}
