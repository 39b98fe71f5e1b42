use log::*;
use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;
use structopt::StructOpt;
use tokio::sync::mpsc;
use tokio::task;
use tokio_stream::{wrappers::UnboundedReceiverStream, StreamExt};

use streamwalk::{ParameterName, Parameters, Pipeline, PipelineConfig, Trigger};

#[derive(StructOpt)]
#[structopt(name = "streamwalk", about = "random walk fed through a bounded channel")]
struct Cli {
    /// Channel capacity
    #[structopt(long, default_value = "2")]
    capacity: usize,

    /// Data window length
    #[structopt(long, default_value = "20")]
    window: usize,

    /// Memory window length
    #[structopt(long, default_value = "400")]
    memory_window: usize,

    /// Seconds between generated samples
    #[structopt(long, default_value = "2")]
    tick: f64,

    /// Seconds between memory samples, aligned to the wall clock
    #[structopt(long, default_value = "10")]
    memory_every: f64,

    #[structopt(long)]
    seed: Option<u64>,

    #[structopt(long, default_value = "0", allow_hyphen_values = true)]
    shift: f64,

    #[structopt(long, default_value = "1")]
    variance: f64,

    /// Stop after this many seconds instead of waiting for ctrl-c
    #[structopt(long)]
    run_for: Option<f64>,
}

impl Cli {
    fn config(&self) -> Result<PipelineConfig, failure::Error> {
        let secs = |name: &str, v: f64| {
            if v.is_finite() && v > 0.0 {
                Ok(Duration::from_secs_f64(v))
            } else {
                Err(failure::format_err!("--{} must be a positive number of seconds", name))
            }
        };
        Ok(PipelineConfig {
            channel_capacity: self.capacity,
            window_len: self.window,
            memory_window_len: self.memory_window,
            tick_interval: secs("tick", self.tick)?,
            memory_sample_interval: secs("memory-every", self.memory_every)?,
            seed: self.seed,
            initial: Parameters {
                shift: self.shift,
                variance: self.variance,
            },
        })
    }
}

// `<name> <value>` sets a parameter, `pause`/`resume` toggle memory sampling,
// `stop` shuts the pipeline down.
fn handle_command(pipeline: &Pipeline, line: &str) {
    let mut words = line.split_whitespace();
    match (words.next(), words.next()) {
        (None, _) => {}
        (Some("stop"), None) => pipeline.request_stop(),
        (Some("pause"), None) => pipeline.pause_memory_sampling(),
        (Some("resume"), None) => pipeline.resume_memory_sampling(),
        (Some(name), Some(value)) => {
            let res = name.parse::<ParameterName>().and_then(|name| {
                let value = value
                    .parse::<f64>()
                    .map_err(|_| streamwalk::Error::InvalidParameter {
                        name,
                        value: f64::NAN,
                    })?;
                if !name.presets().contains(&value) {
                    debug!("{} = {} is off the slider presets {:?}", name, value, name.presets());
                }
                pipeline.set_parameter(name, value)
            });
            match res {
                Ok(()) => info!("parameters now {:?}", pipeline.parameters()),
                Err(e) => warn!("{}", e),
            }
        }
        _ => warn!("unrecognised command: {}", line),
    }
}

#[tokio::main]
async fn main() -> Result<(), failure::Error> {
    pretty_env_logger::init();
    let args = Cli::from_args();

    let pipeline = Arc::new(Pipeline::start(args.config()?)?);

    let aggregating = pipeline.clone();
    let consumer = task::spawn_blocking(move || {
        while !aggregating.is_stopped() {
            let snapshot = aggregating.on_sample_available();
            info!("window: {}", snapshot);
            if let (Some(min), Some(max), Some(mean)) =
                (snapshot.min(), snapshot.max(), snapshot.mean())
            {
                debug!("window range [{:.3}, {:.3}], mean {:.3}", min, max, mean);
            }
        }
        trace!("consumer loop ended");
    });

    let sampling = pipeline.clone();
    let memory = tokio::spawn(async move {
        while !sampling.is_stopped() {
            tokio::time::sleep(sampling.next_memory_tick()).await;
            let snapshot = sampling.on_timer_tick();
            if let Some(mb) = snapshot.last() {
                info!("memory: {:.2} MB ({} samples)", mb, snapshot.len());
            }
        }
    });

    // stdin gets its own thread so a pending read never holds up runtime shutdown
    let (line_tx, line_rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if line_tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    error!("stdin: {}", e);
                    break;
                }
            }
        }
    });

    let commands = pipeline.clone();
    tokio::spawn(async move {
        let mut lines = UnboundedReceiverStream::new(line_rx);
        while let Some(line) = lines.next().await {
            handle_command(&commands, &line);
        }
    });

    match args.run_for.filter(|s| s.is_finite() && *s >= 0.0) {
        Some(secs) => tokio::time::sleep(Duration::from_secs_f64(secs)).await,
        None => {
            tokio::select! {
                res = tokio::signal::ctrl_c() => res?,
                _ = async {
                    while !pipeline.is_stopped() {
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                } => {}
            }
        }
    }

    pipeline.request_stop();
    consumer.await?;
    memory.abort();

    let stats = pipeline.stats();
    info!(
        "stopped: produced {}, consumed {}, pending {}",
        stats.produced, stats.consumed, stats.pending
    );
    println!("{}", pipeline.window());

    Ok(())
}
