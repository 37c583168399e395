//! Palm detection: finds where hands are so the landmark model can be run on
//! a crop around each one.
//!
//! The model is a single shot detector over a square input (192×192 for the
//! MediaPipe palm models). Output 0 holds 18 regressors per anchor (box center,
//! box size, then 7 keypoints, all as pixel offsets from the anchor), output 1
//! one raw score per anchor.

use super::input::{self, Preprocess};
use crate::{error::Error, tflite};
use opencv::{
    core::{copy_make_border, Mat, Scalar, Size, BORDER_CONSTANT},
    prelude::*,
};
use std::convert::TryFrom;
use tracing::trace;

const BOXES_OUTPUT: usize = 0;
const SCORES_OUTPUT: usize = 1;
const VALUES_PER_ANCHOR: usize = 18;

/// (stride in input pixels, anchors per feature map cell)
const LAYERS: [(usize, usize); 2] = [(8, 2), (16, 6)];

const WRIST_KEYPOINT: usize = 0;
const MIDDLE_FINGER_MCP_KEYPOINT: usize = 2;

/// Overlap above which two palms are taken to be the same hand.
const IOU_THRESHOLD: f32 = 0.3;

/// Hand crop size relative to the palm box, and how far the crop is pushed
/// from the wrist toward the fingers, relative to the palm box.
const HAND_SCALE: f32 = 2.6;
const FINGER_SHIFT: f32 = 0.5;

#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct Anchor {
    x_center: f32,
    y_center: f32,
}

/// Anchor centers, normalized to `[0, 1]`, for a square input `input_side`
/// pixels wide.
pub(crate) fn anchors(input_side: usize) -> Vec<Anchor> {
    let mut anchors = Vec::new();
    for &(stride, per_cell) in LAYERS.iter() {
        let cells = (input_side + stride - 1) / stride;
        for y in 0..cells {
            for x in 0..cells {
                let anchor = Anchor {
                    x_center: (x as f32 + 0.5) / cells as f32,
                    y_center: (y as f32 + 0.5) / cells as f32,
                };
                anchors.extend(std::iter::repeat(anchor).take(per_cell));
            }
        }
    }
    anchors
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct Rect {
    pub(crate) x_center: f32,
    pub(crate) y_center: f32,
    pub(crate) width: f32,
    pub(crate) height: f32,
}

impl Rect {
    fn left(&self) -> f32 {
        self.x_center - self.width / 2.0
    }

    fn right(&self) -> f32 {
        self.x_center + self.width / 2.0
    }

    fn top(&self) -> f32 {
        self.y_center - self.height / 2.0
    }

    fn bottom(&self) -> f32 {
        self.y_center + self.height / 2.0
    }

    fn area(&self) -> f32 {
        self.width * self.height
    }

    pub(crate) fn iou(&self, other: &Rect) -> f32 {
        let width = (self.right().min(other.right()) - self.left().max(other.left())).max(0.0);
        let height = (self.bottom().min(other.bottom()) - self.top().max(other.top())).max(0.0);
        let intersection = width * height;
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct Palm {
    pub(crate) score: f32,
    pub(crate) rect: Rect,
    pub(crate) wrist: (f32, f32),
    pub(crate) middle_finger_mcp: (f32, f32),
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Turn raw model outputs into palms scoring at least `threshold`, in model
/// input pixels.
pub(crate) fn decode(
    anchors: &[Anchor],
    boxes: &[f32],
    scores: &[f32],
    input_side: f32,
    threshold: f32,
) -> Result<Vec<Palm>, Error> {
    if scores.len() != anchors.len() {
        return Err(Error::TensorSize("palm scores", scores.len(), anchors.len()));
    }
    if boxes.len() != anchors.len() * VALUES_PER_ANCHOR {
        return Err(Error::TensorSize(
            "palm boxes",
            boxes.len(),
            anchors.len() * VALUES_PER_ANCHOR,
        ));
    }

    let palms = anchors
        .iter()
        .zip(scores)
        .zip(boxes.chunks_exact(VALUES_PER_ANCHOR))
        .filter_map(|((anchor, &raw), values)| {
            let score = sigmoid(raw);
            if score < threshold {
                return None;
            }
            let (ax, ay) = (anchor.x_center * input_side, anchor.y_center * input_side);
            let keypoint = |k: usize| (values[4 + 2 * k] + ax, values[5 + 2 * k] + ay);
            Some(Palm {
                score,
                rect: Rect {
                    x_center: values[0] + ax,
                    y_center: values[1] + ay,
                    width: values[2],
                    height: values[3],
                },
                wrist: keypoint(WRIST_KEYPOINT),
                middle_finger_mcp: keypoint(MIDDLE_FINGER_MCP_KEYPOINT),
            })
        })
        .collect();
    Ok(palms)
}

/// Keep the best scoring palm of every overlapping group, at most `max` of them.
pub(crate) fn suppress(mut palms: Vec<Palm>, max: usize) -> Vec<Palm> {
    palms.sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal));

    let mut kept: Vec<Palm> = Vec::with_capacity(max);
    while let Some(best) = palms.pop() {
        if kept.len() == max {
            break;
        }
        palms.retain(|other| best.rect.iou(&other.rect) < IOU_THRESHOLD);
        kept.push(best);
    }
    kept
}

/// Square padding that keeps the frame's aspect ratio when it is squeezed into
/// the model input.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct Letterbox {
    pub(crate) side: i32,
    pub(crate) left: i32,
    pub(crate) top: i32,
}

impl Letterbox {
    pub(crate) fn new(cols: i32, rows: i32) -> Self {
        let side = cols.max(rows);
        Self {
            side,
            left: (side - cols) / 2,
            top: (side - rows) / 2,
        }
    }

    /// Map a palm from model input pixels to frame pixels.
    pub(crate) fn to_frame(&self, palm: Palm, input_side: f32) -> Palm {
        let scale = self.side as f32 / input_side;
        let (left, top) = (self.left as f32, self.top as f32);
        let point = |(x, y): (f32, f32)| (x * scale - left, y * scale - top);
        Palm {
            score: palm.score,
            rect: Rect {
                x_center: palm.rect.x_center * scale - left,
                y_center: palm.rect.y_center * scale - top,
                width: palm.rect.width * scale,
                height: palm.rect.height * scale,
            },
            wrist: point(palm.wrist),
            middle_finger_mcp: point(palm.middle_finger_mcp),
        }
    }
}

/// A square region of the frame, which may extend past its edges.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct Crop {
    pub(crate) left: i32,
    pub(crate) top: i32,
    pub(crate) side: i32,
}

/// The part of a [`Crop`] inside the frame, and the padding that makes up the
/// rest of it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct Clip {
    pub(crate) roi: opencv::core::Rect,
    pub(crate) top: i32,
    pub(crate) bottom: i32,
    pub(crate) left: i32,
    pub(crate) right: i32,
}

impl Crop {
    /// Square region around the whole hand: the palm box enlarged, centered
    /// further along the wrist to middle finger direction.
    pub(crate) fn around(palm: &Palm) -> Self {
        let size = palm.rect.width.max(palm.rect.height);
        let (dx, dy) = (
            palm.middle_finger_mcp.0 - palm.wrist.0,
            palm.middle_finger_mcp.1 - palm.wrist.1,
        );
        let norm = dx.hypot(dy);
        // fingers up when the keypoints coincide
        let (ux, uy) = if norm > f32::EPSILON {
            (dx / norm, dy / norm)
        } else {
            (0.0, -1.0)
        };

        let x_center = palm.rect.x_center + ux * FINGER_SHIFT * size;
        let y_center = palm.rect.y_center + uy * FINGER_SHIFT * size;
        let side = size * HAND_SCALE;
        Self {
            left: (x_center - side / 2.0).round() as i32,
            top: (y_center - side / 2.0).round() as i32,
            side: side.round() as i32,
        }
    }

    /// `None` when the crop misses a `cols` × `rows` frame entirely.
    pub(crate) fn clip(&self, cols: i32, rows: i32) -> Option<Clip> {
        let (x0, y0) = (self.left.max(0), self.top.max(0));
        let (x1, y1) = (
            (self.left + self.side).min(cols),
            (self.top + self.side).min(rows),
        );
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Clip {
            roi: opencv::core::Rect::new(x0, y0, x1 - x0, y1 - y0),
            top: y0 - self.top,
            bottom: self.top + self.side - y1,
            left: x0 - self.left,
            right: self.left + self.side - x1,
        })
    }
}

pub(crate) struct PalmDetector {
    interpreter: tflite::Interpreter,
    preprocess: Preprocess,
    anchors: Vec<Anchor>,
    input_side: f32,
    padded: Mat,
    threshold: f32,
    max_hands: usize,
}

impl PalmDetector {
    pub(crate) fn new(
        model: &std::path::Path,
        num_threads: i32,
        threshold: f32,
        max_hands: usize,
    ) -> Result<Self, Error> {
        let mut interpreter = tflite::Interpreter::new(model, num_threads)?;
        let input_size = input::input_size(&mut interpreter)?;
        let side = usize::try_from(input_size.width).map_err(Error::ConvertDimI32ToUSize)?;

        Ok(Self {
            interpreter,
            preprocess: Preprocess::new(input_size)?,
            anchors: anchors(side),
            input_side: input_size.width as f32,
            padded: input::blank(input_size)?,
            threshold,
            max_hands,
        })
    }

    /// Regions of `frame` likely to hold a whole hand, best first.
    pub(crate) fn detect(&mut self, frame: &Mat) -> Result<Vec<Crop>, Error> {
        let Size { width, height } = frame.size().map_err(Error::GetFrameSize)?;
        let letterbox = Letterbox::new(width, height);
        copy_make_border(
            frame,
            &mut self.padded,
            letterbox.top,
            letterbox.side - height - letterbox.top,
            letterbox.left,
            letterbox.side - width - letterbox.left,
            BORDER_CONSTANT,
            Scalar::all(0.0),
        )
        .map_err(Error::PrepareInput)?;

        let input = self.preprocess.prepare(&self.padded)?;
        self.interpreter.get_input_tensor(0)?.copy_from_f32(input)?;
        self.interpreter.invoke()?;

        let palms = decode(
            &self.anchors,
            self.interpreter.get_output_tensor(BOXES_OUTPUT)?.as_f32_slice()?,
            self.interpreter.get_output_tensor(SCORES_OUTPUT)?.as_f32_slice()?,
            self.input_side,
            self.threshold,
        )?;
        trace!(message = "palm candidates", count = palms.len());

        Ok(suppress(palms, self.max_hands)
            .into_iter()
            .map(|palm| Crop::around(&letterbox.to_frame(palm, self.input_side)))
            .collect())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    pub(crate) const INPUT_SIDE: f32 = 192.0;

    /// Raw outputs with one palm per `(anchor, logit, box)` entry; every other
    /// anchor scores far below any threshold.
    pub(crate) fn fake_outputs(
        anchors: &[Anchor],
        palms: &[(usize, f32, [f32; VALUES_PER_ANCHOR])],
    ) -> (Vec<f32>, Vec<f32>) {
        let mut boxes = vec![0.0; anchors.len() * VALUES_PER_ANCHOR];
        let mut scores = vec![-20.0; anchors.len()];
        for &(index, logit, values) in palms {
            scores[index] = logit;
            boxes[index * VALUES_PER_ANCHOR..(index + 1) * VALUES_PER_ANCHOR]
                .copy_from_slice(&values);
        }
        (boxes, scores)
    }

    /// A `size` pixel palm box centered on its anchor, fingers pointing up.
    pub(crate) fn upright(size: f32) -> [f32; VALUES_PER_ANCHOR] {
        let mut values = [0.0; VALUES_PER_ANCHOR];
        values[2] = size;
        values[3] = size;
        // wrist below the center, middle finger knuckle above it
        values[4 + 2 * WRIST_KEYPOINT + 1] = size / 2.0;
        values[4 + 2 * MIDDLE_FINGER_MCP_KEYPOINT + 1] = -size / 2.0;
        values
    }

    mod anchors_tests {
        use super::*;

        #[test]
        fn palm_model_layout() {
            let anchors = anchors(192);
            assert_eq!(anchors.len(), 24 * 24 * 2 + 12 * 12 * 6);
            assert_approx_eq!(anchors[0].x_center, 0.5 / 24.0);
            assert_eq!(anchors[0], anchors[1]);
            assert_approx_eq!(anchors[2].x_center, 1.5 / 24.0);
            let last = anchors[anchors.len() - 1];
            assert_approx_eq!(last.x_center, 11.5 / 12.0);
            assert_approx_eq!(last.y_center, 11.5 / 12.0);
        }
    }

    mod decode_tests {
        use super::*;

        #[test]
        fn offsets_are_relative_to_anchor() {
            let anchors = anchors(192);
            let (boxes, scores) = fake_outputs(&anchors, &[(0, 5.0, upright(20.0))]);
            let palms = decode(&anchors, &boxes, &scores, INPUT_SIDE, 0.5).unwrap();

            assert_eq!(palms.len(), 1);
            let palm = palms[0];
            assert_approx_eq!(palm.score, sigmoid(5.0));
            assert_approx_eq!(palm.rect.x_center, 4.0);
            assert_approx_eq!(palm.rect.y_center, 4.0);
            assert_approx_eq!(palm.rect.width, 20.0);
            assert_approx_eq!(palm.wrist.1, 14.0);
            assert_approx_eq!(palm.middle_finger_mcp.1, -6.0);
        }

        #[test]
        fn low_scores_are_dropped() {
            let anchors = anchors(192);
            let (boxes, scores) = fake_outputs(&anchors, &[(7, 0.0, upright(20.0))]);
            // sigmoid(0) is exactly 0.5
            assert!(decode(&anchors, &boxes, &scores, INPUT_SIDE, 0.8)
                .unwrap()
                .is_empty());
            assert_eq!(
                decode(&anchors, &boxes, &scores, INPUT_SIDE, 0.5)
                    .unwrap()
                    .len(),
                1
            );
        }

        #[test]
        fn rejects_mismatched_outputs() {
            let anchors = anchors(192);
            assert!(matches!(
                decode(&anchors, &[0.0; 18], &[0.0], INPUT_SIDE, 0.5),
                Err(Error::TensorSize("palm scores", 1, 2016))
            ));
        }
    }

    mod suppress_tests {
        use super::*;

        fn palm(score: f32, x_center: f32) -> Palm {
            Palm {
                score,
                rect: Rect {
                    x_center,
                    y_center: 0.0,
                    width: 10.0,
                    height: 10.0,
                },
                wrist: (x_center, 5.0),
                middle_finger_mcp: (x_center, -5.0),
            }
        }

        #[test]
        fn overlapping_keeps_best() {
            let kept = suppress(vec![palm(0.6, 0.0), palm(0.9, 1.0)], 2);
            assert_eq!(kept, vec![palm(0.9, 1.0)]);
        }

        #[test]
        fn separate_palms_survive() {
            let kept = suppress(vec![palm(0.6, 0.0), palm(0.9, 50.0)], 2);
            assert_eq!(kept, vec![palm(0.9, 50.0), palm(0.6, 0.0)]);
        }

        #[test]
        fn caps_hand_count() {
            let kept = suppress(
                vec![palm(0.7, 0.0), palm(0.9, 50.0), palm(0.8, 100.0)],
                2,
            );
            assert_eq!(kept, vec![palm(0.9, 50.0), palm(0.8, 100.0)]);
        }

        #[test]
        fn iou_of_identical_and_disjoint() {
            let a = palm(1.0, 0.0).rect;
            assert_approx_eq!(a.iou(&a), 1.0);
            assert_approx_eq!(a.iou(&palm(1.0, 100.0).rect), 0.0);
            assert_approx_eq!(a.iou(&palm(1.0, 5.0).rect), 50.0 / 150.0);
        }
    }

    mod geometry_tests {
        use super::*;

        #[test]
        fn letterbox_pads_short_side() {
            let letterbox = Letterbox::new(1280, 720);
            assert_eq!(
                letterbox,
                Letterbox {
                    side: 1280,
                    left: 0,
                    top: 280
                }
            );

            let palm = Palm {
                score: 1.0,
                rect: Rect {
                    x_center: 96.0,
                    y_center: 96.0,
                    width: 19.2,
                    height: 19.2,
                },
                wrist: (96.0, 105.6),
                middle_finger_mcp: (96.0, 86.4),
            };
            let mapped = letterbox.to_frame(palm, INPUT_SIDE);
            assert_approx_eq!(mapped.rect.x_center, 640.0, 1e-3);
            assert_approx_eq!(mapped.rect.y_center, 360.0, 1e-3);
            assert_approx_eq!(mapped.rect.width, 128.0, 1e-3);
            assert_approx_eq!(mapped.wrist.1, 424.0, 1e-3);
        }

        #[test]
        fn crop_reaches_toward_fingers() {
            let palm = Palm {
                score: 1.0,
                rect: Rect {
                    x_center: 640.0,
                    y_center: 360.0,
                    width: 100.0,
                    height: 80.0,
                },
                wrist: (640.0, 400.0),
                middle_finger_mcp: (640.0, 320.0),
            };
            // center moves up by half the box, side is 2.6 times the box
            assert_eq!(
                Crop::around(&palm),
                Crop {
                    left: 510,
                    top: 180,
                    side: 260
                }
            );
        }

        #[test]
        fn clip_pads_outside_frame() {
            let crop = Crop {
                left: -10,
                top: 600,
                side: 200,
            };
            assert_eq!(
                crop.clip(1280, 720),
                Some(Clip {
                    roi: opencv::core::Rect::new(0, 600, 190, 120),
                    top: 0,
                    bottom: 80,
                    left: 10,
                    right: 0,
                })
            );
        }

        #[test]
        fn clip_misses_frame() {
            let crop = Crop {
                left: 1300,
                top: 0,
                side: 100,
            };
            assert_eq!(crop.clip(1280, 720), None);
        }
    }
}
