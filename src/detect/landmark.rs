//! Two stage hand tracking with MediaPipe-style models.
//!
//! The palm model finds up to `--max-hands` hands in the letterboxed frame. The
//! landmark model then runs on a square crop around each one. Its outputs, in
//! order: 21 landmarks (x, y, z in model input pixels of the crop), hand
//! presence in `[0, 1]`, and handedness in `[0, 1]`.

use super::{
    input::{self, Preprocess},
    palm::{Crop, PalmDetector},
};
use crate::{
    error::Error,
    hand::{Hand, Handedness, Landmark, Landmarks, DEFAULT_RECORD, NUM_LANDMARKS},
    tflite,
};
use num_traits::ToPrimitive;
use opencv::{
    core::{copy_make_border, Mat, Scalar, Size, BORDER_CONSTANT},
    prelude::*,
};
use std::{
    path::{Path, PathBuf},
    time::Instant,
};
use tracing::{debug, trace};

const DEFAULT_DETECTION_CONFIDENCE: &str = "0.8";
const DEFAULT_PRESENCE_CONFIDENCE: &str = "0.5";
const DEFAULT_MAX_HANDS: &str = "2";
const DEFAULT_NUM_THREADS: &str = "2";

const LANDMARKS_OUTPUT: usize = 0;
const PRESENCE_OUTPUT: usize = 1;
const HANDEDNESS_OUTPUT: usize = 2;

#[derive(Debug, Clone, structopt::StructOpt)]
pub(crate) struct Options {
    /// Path to a TensorFlow Lite palm detection model.
    #[structopt(long)]
    pub(crate) palm_model: Option<PathBuf>,

    /// Path to a TensorFlow Lite hand landmark model.
    #[structopt(long)]
    pub(crate) landmark_model: Option<PathBuf>,

    /// Minimum palm score for a hand to be tracked.
    #[structopt(short = "-c", long, default_value = DEFAULT_DETECTION_CONFIDENCE)]
    pub(crate) detection_confidence: f32,

    /// Minimum hand presence score for tracked landmarks to be reported.
    #[structopt(long, default_value = DEFAULT_PRESENCE_CONFIDENCE)]
    pub(crate) presence_confidence: f32,

    #[structopt(long, default_value = DEFAULT_MAX_HANDS)]
    pub(crate) max_hands: usize,

    #[structopt(short = "-j", long, default_value = DEFAULT_NUM_THREADS)]
    pub(crate) num_threads: i32,
}

/// The model scores right hands above 0.5 as seen in a mirrored image.
pub(crate) fn classify_handedness(raw: f32, mirrored: bool) -> Handedness {
    let handedness = if raw > 0.5 {
        Handedness::Right
    } else {
        Handedness::Left
    };
    if mirrored {
        handedness
    } else {
        handedness.opposite()
    }
}

/// Map landmarks from model input pixels of `crop` back onto the frame. Depth
/// is scaled like x.
fn to_frame_pixels(raw: &[f32], input_size: Size, crop: Crop) -> Result<Landmarks, Error> {
    if raw.len() != NUM_LANDMARKS * 3 {
        return Err(Error::TensorSize("landmarks", raw.len(), NUM_LANDMARKS * 3));
    }
    let side = crop.side as f32;
    let (x_scale, y_scale) = (
        side / input_size.width as f32,
        side / input_size.height as f32,
    );
    let (left, top) = (crop.left as f32, crop.top as f32);
    let pixel = |v: f32| v.trunc().to_i32().ok_or(Error::ConvertCoordinate(v));

    let mut landmarks = DEFAULT_RECORD;
    for (landmark, xyz) in landmarks.iter_mut().zip(raw.chunks_exact(3)) {
        *landmark = Landmark::new(
            pixel(left + xyz[0] * x_scale)?,
            pixel(top + xyz[1] * y_scale)?,
            pixel(xyz[2] * x_scale)?,
        );
    }
    Ok(landmarks)
}

/// Raw landmark model outputs for one crop.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LandmarkOutput {
    pub(crate) landmarks: Vec<f32>,
    pub(crate) presence: f32,
    pub(crate) handedness: f32,
}

/// Hands from per-crop landmark outputs, dropping those the model doesn't see
/// a hand in.
fn assemble(
    estimates: Vec<(Crop, LandmarkOutput)>,
    input_size: Size,
    presence_confidence: f32,
    mirrored: bool,
) -> Result<Vec<Hand>, Error> {
    let mut hands = Vec::with_capacity(estimates.len());
    for (crop, output) in estimates {
        if output.presence < presence_confidence {
            trace!(message = "hand lost", presence = output.presence, ?crop);
            continue;
        }
        hands.push(Hand {
            handedness: classify_handedness(output.handedness, mirrored),
            landmarks: to_frame_pixels(&output.landmarks, input_size, crop)?,
        });
    }
    Ok(hands)
}

struct LandmarkModel {
    interpreter: tflite::Interpreter,
    preprocess: Preprocess,
    input_size: Size,
    cropped: Mat,
}

impl LandmarkModel {
    fn new(model: &Path, num_threads: i32) -> Result<Self, Error> {
        let mut interpreter = tflite::Interpreter::new(model, num_threads)?;
        let input_size = input::input_size(&mut interpreter)?;
        debug!(
            message = "loaded hand landmark model",
            input_width = input_size.width,
            input_height = input_size.height,
        );
        Ok(Self {
            interpreter,
            preprocess: Preprocess::new(input_size)?,
            cropped: input::blank(input_size)?,
            input_size,
        })
    }

    /// `None` when the crop lies outside the frame.
    fn estimate(&mut self, frame: &Mat, crop: Crop) -> Result<Option<LandmarkOutput>, Error> {
        let Size { width, height } = frame.size().map_err(Error::GetFrameSize)?;
        let clip = match crop.clip(width, height) {
            Some(clip) => clip,
            None => return Ok(None),
        };
        let region = Mat::roi(frame, clip.roi).map_err(Error::CropHand)?;
        copy_make_border(
            &region,
            &mut self.cropped,
            clip.top,
            clip.bottom,
            clip.left,
            clip.right,
            BORDER_CONSTANT,
            Scalar::all(0.0),
        )
        .map_err(Error::CropHand)?;

        let input = self.preprocess.prepare(&self.cropped)?;
        self.interpreter.get_input_tensor(0)?.copy_from_f32(input)?;

        let start = Instant::now();
        self.interpreter.invoke()?;
        trace!(message = "landmark inference", elapsed = ?start.elapsed());

        Ok(Some(LandmarkOutput {
            landmarks: self
                .interpreter
                .get_output_tensor(LANDMARKS_OUTPUT)?
                .as_f32_slice()?
                .to_vec(),
            presence: self
                .interpreter
                .get_output_tensor(PRESENCE_OUTPUT)?
                .as_ndarray(1)?[0],
            handedness: self
                .interpreter
                .get_output_tensor(HANDEDNESS_OUTPUT)?
                .as_ndarray(1)?[0],
        }))
    }
}

pub(crate) struct Detector {
    palms: PalmDetector,
    landmarks: LandmarkModel,
    presence_confidence: f32,
    mirrored: bool,
}

impl Detector {
    pub(crate) fn new(
        palm_model: &Path,
        landmark_model: &Path,
        options: &Options,
        mirrored: bool,
    ) -> Result<Self, Error> {
        Ok(Self {
            palms: PalmDetector::new(
                palm_model,
                options.num_threads,
                options.detection_confidence,
                options.max_hands,
            )?,
            landmarks: LandmarkModel::new(landmark_model, options.num_threads)?,
            presence_confidence: options.presence_confidence,
            mirrored,
        })
    }
}

impl super::HandDetector<Mat> for Detector {
    fn detect(&mut self, frame: &Mat) -> Result<Vec<Hand>, Error> {
        let crops = self.palms.detect(frame)?;

        let mut estimates = Vec::with_capacity(crops.len());
        for crop in crops {
            if let Some(output) = self.landmarks.estimate(frame, crop)? {
                estimates.push((crop, output));
            }
        }
        assemble(
            estimates,
            self.landmarks.input_size,
            self.presence_confidence,
            self.mirrored,
        )
    }
}
