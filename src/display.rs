use crate::{error::Error, hand::Hand};

/// Visual feedback for the stream. Nothing shown here affects what is sent.
pub(crate) trait Display<F> {
    fn show(&mut self, frame: &F, hands: &[Hand]) -> Result<(), Error>;

    /// Wait up to `delay_ms` for a key press, returning its low byte.
    fn poll_key(&mut self, delay_ms: i32) -> Result<Option<u8>, Error>;

    fn close(&mut self) -> Result<(), Error>;
}

impl<F, D> Display<F> for Box<D>
where
    D: Display<F> + ?Sized,
{
    fn show(&mut self, frame: &F, hands: &[Hand]) -> Result<(), Error> {
        (**self).show(frame, hands)
    }

    fn poll_key(&mut self, delay_ms: i32) -> Result<Option<u8>, Error> {
        (**self).poll_key(delay_ms)
    }

    fn close(&mut self) -> Result<(), Error> {
        (**self).close()
    }
}

/// A display that shows nothing and never sees a key press.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Headless;

impl<F> Display<F> for Headless {
    fn show(&mut self, _frame: &F, _hands: &[Hand]) -> Result<(), Error> {
        Ok(())
    }

    fn poll_key(&mut self, _delay_ms: i32) -> Result<Option<u8>, Error> {
        Ok(None)
    }

    fn close(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

#[cfg(feature = "gui")]
pub(crate) use window::Window;

#[cfg(feature = "gui")]
mod window {
    use super::Display;
    use crate::{
        config::Config,
        error::Error,
        hand::{constants::CONNECTIONS, Hand, Landmark},
    };
    use opencv::{
        core::{Mat, Point, Scalar, Size, CV_8UC3},
        highgui::{
            destroy_all_windows, imshow, move_window, named_window, resize_window, wait_key,
            WINDOW_NORMAL,
        },
        imgproc::{circle, line, resize, FILLED, INTER_LINEAR, LINE_8},
        prelude::*,
    };
    use tracing::instrument;

    const GREEN: (f64, f64, f64) = (0.0, 255.0, 0.0);
    const MAGENTA: (f64, f64, f64) = (255.0, 0.0, 255.0);

    /// A resizable HighGUI window at the bottom center of the screen.
    pub(crate) struct Window {
        title: String,
        canvas: Mat,
        size: Size,
    }

    /// Factor taking frame pixels onto a canvas `canvas_width` wide. Uses the
    /// width of the frame actually delivered, which may differ from the one
    /// requested.
    pub(super) fn canvas_scale(canvas_width: i32, frame_width: i32) -> f64 {
        if frame_width <= 0 {
            return 1.0;
        }
        f64::from(canvas_width) / f64::from(frame_width)
    }

    pub(super) fn to_canvas(landmark: Landmark, scale: f64) -> Point {
        let scale = |v: i32| (f64::from(v) * scale).round() as i32;
        Point::new(scale(landmark.x), scale(landmark.y))
    }

    impl Window {
        #[instrument(name = "Window::open", skip(config), fields(title = %config.window_title))]
        pub(crate) fn open(config: &Config) -> Result<Self, Error> {
            let title = config.window_title.clone();
            let (x, y) = config.window_position();
            let create = |e: opencv::Error| Error::CreateWindow(title.clone(), e);

            named_window(&title, WINDOW_NORMAL).map_err(create)?;
            resize_window(&title, config.display.width, config.display.height).map_err(create)?;
            move_window(&title, x, y).map_err(create)?;

            let canvas = Mat::zeros(config.display.height, config.display.width, CV_8UC3)
                .and_then(|expr| expr.to_mat())
                .map_err(Error::AllocateFrame)?;

            Ok(Self {
                canvas,
                size: Size::new(config.display.width, config.display.height),
                title,
            })
        }

        fn draw_hand(&mut self, hand: &Hand, scale: f64) -> Result<(), Error> {
            for &(a, b) in CONNECTIONS.iter() {
                let (a, b) = (
                    to_canvas(hand.landmark(a), scale),
                    to_canvas(hand.landmark(b), scale),
                );
                line(
                    &mut self.canvas,
                    a,
                    b,
                    Scalar::from(GREEN),
                    1,      // thickness
                    LINE_8, // line_type
                    0,      // shift
                )
                .map_err(Error::DrawLine)?;
            }

            for &landmark in hand.landmarks.iter() {
                let center = to_canvas(landmark, scale);
                circle(
                    &mut self.canvas,
                    center,
                    3,
                    Scalar::from(MAGENTA),
                    FILLED, // thickness
                    LINE_8, // line_type
                    0,      // shift
                )
                .map_err(Error::DrawCircle)?;
            }
            Ok(())
        }
    }

    impl Display<Mat> for Window {
        fn show(&mut self, frame: &Mat, hands: &[Hand]) -> Result<(), Error> {
            resize(frame, &mut self.canvas, self.size, 0.0, 0.0, INTER_LINEAR)
                .map_err(Error::ResizeFrame)?;
            let scale = canvas_scale(self.size.width, frame.cols());
            for hand in hands {
                self.draw_hand(hand, scale)?;
            }
            imshow(&self.title, &self.canvas).map_err(Error::ImShow)
        }

        fn poll_key(&mut self, delay_ms: i32) -> Result<Option<u8>, Error> {
            let key = wait_key(delay_ms).map_err(Error::WaitKey)?;
            Ok(if key < 0 { None } else { Some((key & 0xff) as u8) })
        }

        fn close(&mut self) -> Result<(), Error> {
            destroy_all_windows().map_err(Error::DestroyWindows)
        }
    }
}

#[cfg(all(test, feature = "gui"))]
mod tests {
    use super::window::{canvas_scale, to_canvas};
    use crate::hand::Landmark;
    use assert_approx_eq::assert_approx_eq;
    use opencv::core::Point;

    #[test]
    fn scale_follows_delivered_frame() {
        assert_approx_eq!(canvas_scale(640, 1280), 0.5);
        // device ignored the 1280x720 request and delivered 640x480
        assert_approx_eq!(canvas_scale(640, 640), 1.0);
        assert_approx_eq!(canvas_scale(640, 960), 2.0 / 3.0);
    }

    #[test]
    fn empty_frame_keeps_coordinates() {
        assert_approx_eq!(canvas_scale(640, 0), 1.0);
    }

    #[test]
    fn landmarks_land_on_canvas() {
        let scale = canvas_scale(640, 640);
        assert_eq!(to_canvas(Landmark::new(600, 400, 0), scale), Point::new(600, 400));
        let scale = canvas_scale(640, 1280);
        assert_eq!(to_canvas(Landmark::new(601, 400, -3), scale), Point::new(301, 200));
    }
}
