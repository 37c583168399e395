use crate::{error::Error, route::Destinations};
use num_traits::ToPrimitive;
use std::{convert::TryFrom, net::IpAddr};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_RIGHT_PORT: &str = "5052";
const DEFAULT_LEFT_PORT: &str = "5053";

/// Where hand records are sent, shared by `stream` and `listen`.
#[derive(Debug, Clone, Copy, structopt::StructOpt)]
pub(crate) struct Endpoints {
    /// Address the hand records are sent to.
    #[structopt(long, default_value = DEFAULT_HOST)]
    pub(crate) host: IpAddr,

    /// Port receiving the right hand.
    #[structopt(long, default_value = DEFAULT_RIGHT_PORT)]
    pub(crate) right_port: u16,

    /// Port receiving the left hand.
    #[structopt(long, default_value = DEFAULT_LEFT_PORT)]
    pub(crate) left_port: u16,
}

impl Endpoints {
    pub(crate) fn destinations(&self) -> Result<Destinations, Error> {
        if self.right_port == self.left_port {
            return Err(Error::DuplicatePort(self.right_port));
        }
        Ok(Destinations {
            right: self.right_port,
            left: self.left_port,
        })
    }
}

#[derive(Debug, structopt::StructOpt)]
pub(crate) struct StreamOpt {
    /// Video capture device index.
    #[structopt(short, long, default_value = "0")]
    pub(crate) device: i32,

    /// Requested capture width.
    #[structopt(short, long, default_value = "1280")]
    pub(crate) width: u16,

    /// Requested capture height, also the height landmarks are flipped against.
    #[structopt(short = "-H", long, default_value = "720")]
    pub(crate) height: u16,

    /// Preview size relative to the capture size.
    #[structopt(short, long, default_value = "0.5")]
    pub(crate) scale: f64,

    /// Screen width used to place the preview window.
    #[structopt(long, default_value = "1920")]
    pub(crate) screen_width: u16,

    /// Screen height used to place the preview window.
    #[structopt(long, default_value = "1080")]
    pub(crate) screen_height: u16,

    /// Gap between the preview window and the bottom of the screen.
    #[structopt(long, default_value = "85")]
    pub(crate) window_offset: u16,

    /// Run without a preview window.
    #[structopt(long)]
    pub(crate) headless: bool,

    #[structopt(long, default_value = "Image")]
    pub(crate) window_title: String,

    /// Do not mirror the camera image before detection.
    #[structopt(long)]
    pub(crate) no_mirror: bool,

    #[structopt(short = "-W", long, default_value = "1")]
    pub(crate) wait_key_ms: i32,

    /// Key that stops streaming while the preview window has focus.
    #[structopt(short, long, default_value = "q")]
    pub(crate) quit_key: char,

    #[structopt(flatten)]
    pub(crate) endpoints: Endpoints,

    #[cfg(feature = "tflite")]
    #[structopt(flatten)]
    pub(crate) landmark: crate::detect::landmark::Options,

    #[structopt(long)]
    pub(crate) show_progress: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct Dimensions {
    pub(crate) width: i32,
    pub(crate) height: i32,
}

impl Dimensions {
    pub(crate) fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Scale both sides, truncating toward zero.
    fn scaled(self, scale: f64) -> Result<Self, Error> {
        let scale_side = |side: i32| {
            (f64::from(side) * scale)
                .trunc()
                .to_i32()
                .ok_or(Error::ScaleDimension(side, scale))
        };
        Ok(Self::new(scale_side(self.width)?, scale_side(self.height)?))
    }
}

/// Settings fixed for the whole run of the stream.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Config {
    pub(crate) device: i32,
    pub(crate) capture: Dimensions,
    pub(crate) display: Dimensions,
    pub(crate) screen: Dimensions,
    pub(crate) window_offset: i32,
    pub(crate) window_title: String,
    pub(crate) mirror: bool,
    pub(crate) wait_key_ms: i32,
    pub(crate) quit_key: u8,
    pub(crate) host: IpAddr,
    pub(crate) destinations: Destinations,
}

impl Config {
    /// Top-left corner of the preview window: centered horizontally, with its
    /// bottom edge `window_offset` pixels above the bottom of the screen.
    #[cfg_attr(not(feature = "gui"), allow(dead_code))]
    pub(crate) fn window_position(&self) -> (i32, i32) {
        let x = (self.screen.width - self.display.width).div_euclid(2);
        let y = self.screen.height - self.display.height - self.window_offset;
        (x, y)
    }

    /// The height landmarks are flipped against.
    pub(crate) fn original_height(&self) -> i32 {
        self.capture.height
    }
}

impl TryFrom<&StreamOpt> for Config {
    type Error = Error;

    fn try_from(opt: &StreamOpt) -> Result<Self, Self::Error> {
        if !opt.scale.is_finite() || opt.scale <= 0.0 {
            return Err(Error::InvalidScale(opt.scale));
        }
        if !opt.quit_key.is_ascii() {
            return Err(Error::InvalidQuitKey(opt.quit_key));
        }

        let capture = Dimensions::new(opt.width.into(), opt.height.into());
        Ok(Self {
            device: opt.device,
            capture,
            display: capture.scaled(opt.scale)?,
            screen: Dimensions::new(opt.screen_width.into(), opt.screen_height.into()),
            window_offset: opt.window_offset.into(),
            window_title: opt.window_title.clone(),
            mirror: !opt.no_mirror,
            wait_key_ms: opt.wait_key_ms,
            quit_key: opt.quit_key as u8,
            host: opt.endpoints.host,
            destinations: opt.endpoints.destinations()?,
        })
    }
}
