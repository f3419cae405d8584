use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use neurovex_core::analysis::{BrainState, ClassificationResult};
use neurovex_core::config::AppConfig;
use neurovex_core::engine::{EngineHandle, ParamPatch, PipelineEvent, SignalPipeline};
use neurovex_core::safety::{SafetyVerdict, VerdictMode};
use neurovex_core::signal::Sample;
use neurovex_core::source::{InvalidSamplePolicy, Pacing, ReplaySource, SourceProfile, SyntheticSource};
use neurovex_core::telemetry::{TelemetryHub, TelemetryObserver};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;

#[derive(Parser, Debug)]
#[command(
    name = "neurovex_cli",
    about = "Run the EEG brain-state pipeline on synthetic or recorded samples"
)]
struct Cli {
    /// Configuration file (defaults to $NEUROVEX_CONFIG or config/neurovex.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Override the safety gate quality threshold
    #[arg(long, global = true)]
    quality_threshold: Option<f32>,
    /// Emit one merged verdict listing every active unsafe reason
    #[arg(long, global = true)]
    merged: bool,
    /// Debug-level logging on stderr
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify synthetic samples and print events as JSON lines
    Run {
        #[arg(long, default_value = "demo")]
        profile: SourceProfile,
        #[arg(long, default_value_t = 256)]
        samples: usize,
        #[arg(long)]
        seed: Option<u64>,
        /// Print only the final summary
        #[arg(long)]
        summary_only: bool,
    },
    /// Classify a JSON-lines recording
    Replay {
        path: PathBuf,
        /// Fail on the first malformed line instead of skipping it
        #[arg(long)]
        abort_on_invalid: bool,
        #[arg(long)]
        summary_only: bool,
    },
    /// Stream a real-time synthetic source through the threaded engine
    Live {
        #[arg(long, default_value = "demo")]
        profile: SourceProfile,
        #[arg(long, default_value_t = 2000)]
        duration_ms: u64,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Print the effective configuration
    Config,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    neurovex_core::init_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path),
        None => AppConfig::load(),
    };
    ParamPatch {
        quality_threshold: cli.quality_threshold,
        verdict_mode: cli.merged.then_some(VerdictMode::Merged),
        ..ParamPatch::default()
    }
    .apply_to(&mut config);

    match cli.command {
        Commands::Run {
            profile,
            samples,
            seed,
            summary_only,
        } => {
            let mut source_config = config.source.clone();
            source_config.profile = profile;
            source_config.seed = seed.or(source_config.seed);
            let source = SyntheticSource::from_config(&source_config).take(samples);
            run_batch(&config, source, 0, summary_only)
        }
        Commands::Replay {
            path,
            abort_on_invalid,
            summary_only,
        } => {
            let policy = if abort_on_invalid {
                InvalidSamplePolicy::Abort
            } else {
                InvalidSamplePolicy::Skip
            };
            let source = ReplaySource::load(&path, policy)?;
            let skipped = source.skipped() as u64;
            run_batch(&config, source, skipped, summary_only)
        }
        Commands::Live {
            profile,
            duration_ms,
            seed,
        } => run_live(config, profile, seed, duration_ms),
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(ExitCode::from(0))
        }
    }
}

#[derive(Debug, Serialize)]
struct BatchSummary {
    event: &'static str,
    samples: u64,
    rejected: u64,
    final_state: Option<BrainState>,
    final_confidence: Option<f32>,
    last_verdict: Option<SafetyVerdict>,
    actuation_permitted: bool,
    state_counts: BTreeMap<String, u64>,
    unsafe_transitions: u64,
    unsafe_verdicts: BTreeMap<String, u64>,
}

fn run_batch(
    config: &AppConfig,
    samples: impl Iterator<Item = Sample>,
    rejected_at_load: u64,
    summary_only: bool,
) -> Result<ExitCode> {
    let hub = Arc::new(TelemetryHub::default());
    let mut pipeline =
        SignalPipeline::new(config).with_observer(Box::new(TelemetryObserver::new(Arc::clone(&hub))));

    let mut state_counts: BTreeMap<String, u64> = BTreeMap::new();
    let mut last: Option<ClassificationResult> = None;

    for sample in samples {
        let Ok(output) = pipeline.on_sample(sample) else {
            continue;
        };
        if !summary_only {
            for event in output.events() {
                println!("{}", serde_json::to_string(&event)?);
            }
        }
        *state_counts
            .entry(output.classification.state.to_string())
            .or_insert(0) += 1;
        last = Some(output.classification);
    }

    let summary = BatchSummary {
        event: "summary",
        samples: pipeline.processed(),
        rejected: pipeline.rejected() + rejected_at_load,
        final_state: last.as_ref().map(|result| result.state),
        final_confidence: last.as_ref().map(|result| result.confidence),
        last_verdict: pipeline.latch().last().cloned(),
        actuation_permitted: pipeline.actuation_permitted(),
        state_counts,
        unsafe_transitions: pipeline.latch().unsafe_transitions(),
        unsafe_verdicts: hub.snapshot().unsafe_verdicts,
    };
    println!("{}", serde_json::to_string(&summary)?);
    Ok(ExitCode::from(0))
}

fn run_live(
    config: AppConfig,
    profile: SourceProfile,
    seed: Option<u64>,
    duration_ms: u64,
) -> Result<ExitCode> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    let mut source_config = config.source.clone();
    source_config.profile = profile;
    source_config.seed = seed.or(source_config.seed);

    let hub = Arc::new(TelemetryHub::default());
    let engine = EngineHandle::with_telemetry(config, Arc::clone(&hub));
    let mut classifications = engine.subscribe_classifications();
    let mut verdicts = engine.subscribe_verdicts();

    engine
        .start_stream(
            Box::new(SyntheticSource::from_config(&source_config)),
            Pacing::RealTime,
        )
        .context("failed to start stream")?;

    runtime.block_on(async {
        let deadline = tokio::time::sleep(Duration::from_millis(duration_ms));
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                _ = &mut deadline => break,
                result = classifications.recv() => match result {
                    Ok(result) => print_event(&PipelineEvent::Classification(result)),
                    Err(RecvError::Lagged(skipped)) => {
                        log::warn!("[neurovex_cli] Classification output lagged by {}", skipped)
                    }
                    Err(RecvError::Closed) => break,
                },
                verdict = verdicts.recv() => match verdict {
                    Ok(verdict) => print_event(&PipelineEvent::SafetyVerdict(verdict)),
                    Err(RecvError::Lagged(skipped)) => {
                        log::warn!("[neurovex_cli] Verdict output lagged by {}", skipped)
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
    });

    let stream = engine.stop_stream().context("failed to stop stream")?;
    let snapshot = hub.snapshot();
    let summary = serde_json::json!({
        "event": "summary",
        "stream": stream,
        "actuation_permitted": engine.actuation_permitted()?,
        "last_verdict": engine.last_verdict()?,
        "unsafe_verdicts": snapshot.unsafe_verdicts,
        "telemetry_events": snapshot.total_events,
    });
    println!("{}", serde_json::to_string(&summary)?);
    Ok(ExitCode::from(0))
}

fn print_event(event: &PipelineEvent) {
    match serde_json::to_string(event) {
        Ok(line) => println!("{}", line),
        Err(err) => log::warn!("[neurovex_cli] Failed to encode event: {}", err),
    }
}
