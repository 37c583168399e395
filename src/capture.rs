use crate::{config::Config, error::Error};
use opencv::{
    core::{flip, Mat, CV_8UC3},
    prelude::*,
    videoio::{VideoCapture, CAP_ANY, CAP_PROP_FRAME_HEIGHT, CAP_PROP_FRAME_WIDTH},
};
use tracing::{info, instrument};

/// A pull-based source of frames.
pub(crate) trait FrameSource {
    type Frame;

    /// Grab the next frame, valid until the next call. Any error ends the
    /// stream.
    fn acquire(&mut self) -> Result<&Self::Frame, Error>;

    /// Give the device back; called once when the stream ends.
    fn release(&mut self) -> Result<(), Error>;
}

/// Mirror around the vertical axis.
const FLIP_HORIZONTAL: i32 = 1;

pub(crate) struct Camera {
    capture: VideoCapture,
    frame: Mat,
    mirrored: Mat,
    mirror: bool,
}

impl Camera {
    #[instrument(name = "Camera::open", skip(config), fields(device = config.device))]
    pub(crate) fn open(config: &Config) -> Result<Self, Error> {
        let device = config.device;
        let mut capture =
            VideoCapture::new(device, CAP_ANY).map_err(|e| Error::OpenCamera(device, e))?;
        if !capture
            .is_opened()
            .map_err(|e| Error::OpenCamera(device, e))?
        {
            return Err(Error::CameraUnavailable(device));
        }

        capture
            .set(CAP_PROP_FRAME_WIDTH, f64::from(config.capture.width))
            .map_err(|e| Error::SetCaptureProperty(CAP_PROP_FRAME_WIDTH, e))?;
        capture
            .set(CAP_PROP_FRAME_HEIGHT, f64::from(config.capture.height))
            .map_err(|e| Error::SetCaptureProperty(CAP_PROP_FRAME_HEIGHT, e))?;

        // the device is free to ignore the request
        let delivered_width = capture.get(CAP_PROP_FRAME_WIDTH).unwrap_or_default();
        let delivered_height = capture.get(CAP_PROP_FRAME_HEIGHT).unwrap_or_default();
        info!(
            message = "opened video capture",
            requested_width = config.capture.width,
            requested_height = config.capture.height,
            delivered_width,
            delivered_height,
        );

        let blank = || {
            Mat::zeros(config.capture.height, config.capture.width, CV_8UC3)
                .and_then(|expr| expr.to_mat())
                .map_err(Error::AllocateFrame)
        };

        Ok(Self {
            capture,
            frame: blank()?,
            mirrored: blank()?,
            mirror: config.mirror,
        })
    }
}

impl FrameSource for Camera {
    type Frame = Mat;

    fn acquire(&mut self) -> Result<&Mat, Error> {
        // both buffers are reused; OpenCV reallocates only if the delivered size changes
        if !self.capture.read(&mut self.frame).map_err(Error::ReadFrame)? {
            return Err(Error::FrameUnavailable);
        }

        if !self.mirror {
            return Ok(&self.frame);
        }

        flip(&self.frame, &mut self.mirrored, FLIP_HORIZONTAL).map_err(Error::MirrorFrame)?;
        Ok(&self.mirrored)
    }

    fn release(&mut self) -> Result<(), Error> {
        self.capture.release().map_err(Error::ReleaseCamera)
    }
}
