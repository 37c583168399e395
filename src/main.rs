use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use opencv::core::Mat;
use std::{
    convert::TryFrom,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use structopt::StructOpt;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;

mod capture;
mod config;
mod detect;
mod display;
mod error;
mod hand;
mod listen;
mod pipeline;
mod route;
mod transform;
mod transport;
mod wire;

#[cfg(feature = "tflite")]
mod tflite;
#[cfg(feature = "tflite")]
mod tflite_sys;

#[derive(structopt::StructOpt)]
enum Command {
    /// Stream hand landmarks from a camera over UDP.
    Stream(config::StreamOpt),
    /// Log hand records arriving on the stream ports.
    Listen(listen::ListenOpt),
}

#[derive(structopt::StructOpt)]
struct Opt {
    #[structopt(short, long, default_value = "info", env = "RUST_LOG")]
    log_level: tracing_subscriber::filter::EnvFilter,

    #[structopt(subcommand)]
    command: Command,
}

fn detector(opt: &config::StreamOpt, config: &config::Config) -> Result<detect::Detect> {
    #[cfg(feature = "tflite")]
    {
        match (&opt.landmark.palm_model, &opt.landmark.landmark_model) {
            (Some(palm), Some(landmark)) => {
                let detector =
                    detect::landmark::Detector::new(palm, landmark, &opt.landmark, config.mirror)
                        .with_context(|| {
                            format!(
                                "failed to load hand models {} and {}",
                                palm.display(),
                                landmark.display()
                            )
                        })?;
                return Ok(detect::Detect::Landmark(detector));
            }
            (None, None) => {}
            _ => anyhow::bail!("--palm-model and --landmark-model must be given together"),
        }
    }
    #[cfg(not(feature = "tflite"))]
    let _ = (opt, config);

    warn!(message = "no hand model configured, streaming empty records");
    Ok(detect::Detect::default())
}

fn display(
    opt: &config::StreamOpt,
    config: &config::Config,
) -> Result<Box<dyn display::Display<Mat>>> {
    #[cfg(feature = "gui")]
    {
        if !opt.headless {
            return Ok(Box::new(
                display::Window::open(config).context("failed to open preview window")?,
            ));
        }
    }
    #[cfg(not(feature = "gui"))]
    let _ = (opt, config);

    Ok(Box::new(display::Headless))
}

fn stream(opt: config::StreamOpt, running: Arc<AtomicBool>) -> Result<()> {
    let config = config::Config::try_from(&opt).context("invalid stream options")?;

    let camera = capture::Camera::open(&config).context("failed to open camera")?;
    let detector = detector(&opt, &config)?;
    let display = display(&opt, &config)?;
    let transport =
        transport::Transport::bind(config.host).context("failed to create UDP socket")?;

    let settings = pipeline::Settings {
        original_height: config.original_height(),
        destinations: config.destinations,
        wait_key_ms: config.wait_key_ms,
        quit_key: config.quit_key,
    };
    let mut pipeline =
        pipeline::Pipeline::new(camera, detector, display, transport, settings, running);

    if opt.show_progress {
        pipeline = pipeline.with_progress(
            ProgressBar::new_spinner().with_style(
                ProgressStyle::default_spinner()
                    .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
                    .template("{prefix:.bold.dim} {spinner} {per_sec} {wide_msg}"),
            ),
        );
    }

    info!(
        message = "streaming",
        host = %config.host,
        right_port = config.destinations.right,
        left_port = config.destinations.left,
    );
    let reason = pipeline.run().context("stream failed")?;
    info!(message = "stream ended", ?reason);
    Ok(())
}

fn listen(opt: listen::ListenOpt, running: Arc<AtomicBool>) -> Result<()> {
    listen::Listener::bind(&opt.endpoints)
        .context("failed to bind listener")?
        .run(&running)
        .context("listener failed")
}

fn main() -> Result<()> {
    let opt = Opt::from_args();

    tracing::subscriber::set_global_default(
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer())
            .with(opt.log_level),
    )?;

    let running = Arc::new(AtomicBool::new(true));
    let running_ctrl_c = running.clone();

    ctrlc::set_handler(move || {
        running_ctrl_c.store(false, Ordering::SeqCst);
    })
    .context("failed setting Ctrl-C handler")?;

    match opt.command {
        Command::Stream(opt) => stream(opt, running),
        Command::Listen(opt) => listen(opt, running),
    }
}
