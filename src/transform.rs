use crate::hand::{Hand, Landmarks};

/// Move landmarks from a top-left, y-down origin to a bottom-left, y-up origin.
///
/// `original_height` is the *requested* capture height, not whatever the device
/// actually delivered. Results below zero or above the height are kept as is.
pub(crate) fn flip_vertical(landmarks: &Landmarks, original_height: i32) -> Landmarks {
    let mut flipped = *landmarks;
    for landmark in flipped.iter_mut() {
        // wrapping keeps the flip its own inverse for any detector output
        landmark.y = original_height.wrapping_sub(landmark.y);
    }
    flipped
}

impl Hand {
    pub(crate) fn flip_vertical(&self, original_height: i32) -> Self {
        Self {
            handedness: self.handedness,
            landmarks: flip_vertical(&self.landmarks, original_height),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::flip_vertical;
    use crate::hand::{Hand, HandLandmark, Handedness, Landmark, Landmarks, DEFAULT_RECORD};

    fn ramp() -> Landmarks {
        let mut landmarks = DEFAULT_RECORD;
        for (i, landmark) in landmarks.iter_mut().enumerate() {
            let i = i as i32;
            *landmark = Landmark::new(10 * i, 30 * i, -i);
        }
        landmarks
    }

    #[test]
    fn only_y_changes() {
        let flipped = flip_vertical(&ramp(), 720);
        for (before, after) in ramp().iter().zip(flipped.iter()) {
            assert_eq!(after.x, before.x);
            assert_eq!(after.y, 720 - before.y);
            assert_eq!(after.z, before.z);
        }
    }

    #[test]
    fn is_its_own_inverse() {
        for &height in &[0, 1, 360, 720, 1080] {
            assert_eq!(flip_vertical(&flip_vertical(&ramp(), height), height), ramp());
        }
    }

    #[test]
    fn extreme_values_round_trip() {
        let mut landmarks = DEFAULT_RECORD;
        landmarks[0] = Landmark::new(0, i32::MIN, 0);
        landmarks[1] = Landmark::new(0, i32::MAX, 0);
        assert_eq!(flip_vertical(&flip_vertical(&landmarks, 720), 720), landmarks);
    }

    #[test]
    fn above_frame_goes_negative() {
        let mut landmarks = DEFAULT_RECORD;
        landmarks[0] = Landmark::new(5, 800, 0);
        assert_eq!(flip_vertical(&landmarks, 720)[0], Landmark::new(5, -80, 0));
    }

    #[test]
    fn wrist_at_top_left_area() {
        let mut landmarks = DEFAULT_RECORD;
        landmarks[0] = Landmark::new(100, 50, 0);
        let hand = Hand {
            handedness: Handedness::Left,
            landmarks,
        };
        let flipped = hand.flip_vertical(720);
        assert_eq!(flipped.handedness, Handedness::Left);
        assert_eq!(flipped.landmark(HandLandmark::Wrist), Landmark::new(100, 670, 0));
    }
}
