use crate::{
    capture::FrameSource,
    detect::HandDetector,
    display::Display,
    error::Error,
    route::{route, Destinations},
    transport::{DatagramSink, Delivery, Transport},
};
use indicatif::ProgressBar;
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};
use tracing::{error, info, warn};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Reason {
    CaptureFailed,
    QuitRequested,
    Interrupted,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum State {
    Running,
    Terminated(Reason),
}

/// Per-frame settings taken from the configuration.
#[derive(Debug, Copy, Clone)]
pub(crate) struct Settings {
    pub(crate) original_height: i32,
    pub(crate) destinations: Destinations,
    pub(crate) wait_key_ms: i32,
    pub(crate) quit_key: u8,
}

/// capture → detect → flip → route → send → display, once per step.
pub(crate) struct Pipeline<S, D, K, T> {
    source: S,
    detector: D,
    display: K,
    transport: Transport<T>,
    settings: Settings,
    running: Arc<AtomicBool>,
    progress: Option<ProgressBar>,
    frames: usize,
    delivery: Delivery,
}

impl<S, D, K, T> Pipeline<S, D, K, T>
where
    S: FrameSource,
    D: HandDetector<S::Frame>,
    K: Display<S::Frame>,
    T: DatagramSink,
{
    pub(crate) fn new(
        source: S,
        detector: D,
        display: K,
        transport: Transport<T>,
        settings: Settings,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            source,
            detector,
            display,
            transport,
            settings,
            running,
            progress: None,
            frames: 0,
            delivery: Delivery::default(),
        }
    }

    pub(crate) fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Process a single frame and decide whether to keep going.
    ///
    /// Capture failures end the stream. Detector and display errors are
    /// returned to the caller.
    pub(crate) fn step(&mut self) -> Result<State, Error> {
        if !self.running.load(Ordering::SeqCst) {
            return Ok(State::Terminated(Reason::Interrupted));
        }

        let frame = match self.source.acquire() {
            Ok(frame) => frame,
            Err(error) => {
                error!(message = "failed to grab frame", %error);
                return Ok(State::Terminated(Reason::CaptureFailed));
            }
        };

        let hands = self.detector.detect(frame)?;
        let original_height = self.settings.original_height;
        let flipped = hands
            .iter()
            .map(|hand| hand.flip_vertical(original_height))
            .collect::<Vec<_>>();
        let delivery = self
            .transport
            .send(&route(&self.settings.destinations, &flipped));

        self.frames += 1;
        self.delivery += delivery;
        if let Some(progress) = self.progress.as_ref() {
            progress.set_message(format!(
                "frames: {}, hands: {}, sent: {}, failed: {}",
                self.frames,
                hands.len(),
                self.delivery.sent,
                self.delivery.failed,
            ));
            progress.inc(1);
        }

        self.display.show(frame, &hands)?;

        match self.display.poll_key(self.settings.wait_key_ms)? {
            Some(key) if key == self.settings.quit_key => {
                Ok(State::Terminated(Reason::QuitRequested))
            }
            _ => Ok(State::Running),
        }
    }

    /// Step until terminated, then release the camera and close the display.
    /// Cleanup also runs when a step fails.
    pub(crate) fn run(&mut self) -> Result<Reason, Error> {
        let start = Instant::now();
        let outcome = loop {
            match self.step() {
                Ok(State::Running) => {}
                Ok(State::Terminated(reason)) => break Ok(reason),
                Err(error) => break Err(error),
            }
        };
        self.shutdown();

        let elapsed = start.elapsed().as_secs_f64();
        info!(
            message = "stream stopped",
            reason = ?outcome.as_ref().ok(),
            frames = self.frames,
            sent = self.delivery.sent,
            failed = self.delivery.failed,
            fps = if elapsed > 0.0 { self.frames as f64 / elapsed } else { 0.0 },
        );
        outcome
    }

    fn shutdown(&mut self) {
        if let Err(error) = self.source.release() {
            warn!(message = "failed to release frame source", %error);
        }
        if let Err(error) = self.display.close() {
            warn!(message = "failed to close display", %error);
        }
        if let Some(progress) = self.progress.take() {
            progress.finish_and_clear();
        }
    }

    #[cfg(test)]
    pub(crate) fn delivery(&self) -> Delivery {
        self.delivery
    }
}
