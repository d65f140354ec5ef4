mod scan_worker;

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::time::{Duration, Instant};

use base64::{engine::general_purpose::STANDARD, Engine};
use clap::{Parser, Subcommand};

use moodcam_core::analysis::domain::mood::{Mood, MoodResult};
use moodcam_core::analysis::infrastructure::endpoint_transport::EndpointTransport;
use moodcam_core::analysis::mood_analysis_client::MoodAnalysisClient;
use moodcam_core::capture::infrastructure::capture_encoder::CaptureEncoder;
use moodcam_core::capture::infrastructure::image_sequence_source::ImageSequenceSource;
use moodcam_core::detection::domain::detection_smoother::DetectionSmoother;
use moodcam_core::detection::infrastructure::replay_detector::ReplayDetector;
use moodcam_core::feedback::domain::feedback_store::FeedbackStore;
use moodcam_core::feedback::domain::fingerprint::content_fingerprint;
use moodcam_core::feedback::infrastructure::endpoint_feedback_sink::{
    EndpointFeedbackSink, FeedbackSink,
};
use moodcam_core::pipeline::detection_loop::{DetectionLoop, TickOutcome};
use moodcam_core::pipeline::pipeline_logger::LogPipelineLogger;
use moodcam_core::pipeline::scan_mood_use_case::{AnalysisJob, ScanError, ScanMoodUseCase};
use moodcam_core::shared::constants::{new_session_id, IMAGE_EXTENSIONS};
use moodcam_core::shared::settings::Settings;

use scan_worker::{ScanMessage, ScanWorker};

/// Stabilized pet and person mood scanning over recorded camera frames.
#[derive(Parser)]
#[command(name = "moodcam", version)]
struct Cli {
    /// Settings file (defaults to the user config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Server root for the analyze and feedback endpoints, e.g. http://localhost:3000.
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Session id sent with every request (generated when omitted).
    #[arg(long, global = true)]
    session_id: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a frame directory through the detection loop and scan moods.
    Track(TrackArgs),
    /// Post a single feedback record.
    Feedback(FeedbackArgs),
}

#[derive(clap::Args)]
struct TrackArgs {
    /// Directory of frames, played in file name order.
    frames: PathBuf,

    /// Recorded detections (JSON lines, one record per frame index).
    #[arg(long)]
    detections: PathBuf,

    /// Playback rate in frames per second.
    #[arg(long, default_value = "30")]
    fps: f64,

    /// Frame indices at which to trigger a scan (comma-separated or repeated).
    #[arg(long, value_delimiter = ',')]
    scan_at: Vec<usize>,

    /// Give up on an analysis after this long.
    #[arg(long, default_value = "30000")]
    scan_timeout_ms: u64,

    /// Record every result as a correction to this mood.
    #[arg(long)]
    correct_to: Option<Mood>,

    /// Save each captured face as scan_<n>.jpg in this directory.
    #[arg(long)]
    save_crops: Option<PathBuf>,
}

#[derive(clap::Args)]
struct FeedbackArgs {
    #[arg(long)]
    predicted: Mood,

    #[arg(long)]
    actual: Mood,

    /// Confidence of the original prediction (1-100).
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
    confidence: u8,

    /// The image that was classified; only its fingerprint is sent.
    #[arg(long)]
    image: PathBuf,

    #[arg(long)]
    notes: Option<String>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load(),
    };
    if let Some(base) = &cli.endpoint {
        settings.classifier = settings.classifier.with_base(base);
    }
    let session_id = cli.session_id.clone().unwrap_or_else(new_session_id);

    match cli.command {
        Command::Track(args) => {
            validate_track(&args)?;
            run_track(&args, settings, session_id)
        }
        Command::Feedback(args) => run_feedback(&args, &settings, session_id),
    }
}

fn validate_track(args: &TrackArgs) -> Result<(), Box<dyn std::error::Error>> {
    if !(args.fps.is_finite() && args.fps > 0.0) {
        return Err(format!("--fps must be positive, got {}", args.fps).into());
    }
    if !args.frames.is_dir() {
        return Err(format!("{} is not a directory", args.frames.display()).into());
    }
    if !args.detections.is_file() {
        return Err(format!("{} does not exist", args.detections.display()).into());
    }
    if args.scan_timeout_ms == 0 {
        return Err("--scan-timeout-ms must be positive".into());
    }
    Ok(())
}

/// Replay state that outlives a single frame.
struct Replay {
    use_case: ScanMoodUseCase,
    correct_to: Option<Mood>,
    pending_deadline: Option<Duration>,
    results: Vec<MoodResult>,
}

impl Replay {
    fn handle(&mut self, msg: ScanMessage, now: Duration) {
        let Some(outcome) = self.use_case.complete_scan(msg.sequence, msg.outcome, now) else {
            return;
        };
        self.pending_deadline = None;
        match outcome {
            Ok(result) => {
                print_result(msg.sequence, &result);
                if let Some(actual) = self.correct_to {
                    if let Some(record) = self
                        .use_case
                        .record_feedback(actual, Some("User correction".to_string()))
                    {
                        log::info!(
                            "Recorded {:?}: {} -> {}",
                            record.learning_type,
                            record.predicted_mood,
                            record.actual_mood
                        );
                    }
                }
                self.results.push(result);
            }
            Err(e) => eprintln!("Scan {} failed: {e}", msg.sequence),
        }
    }

    fn expire(&mut self, now: Duration) {
        if let Some(deadline) = self.pending_deadline {
            if now >= deadline {
                log::warn!("Analysis timed out; abandoning scan");
                self.use_case.abandon_scan(now);
                self.pending_deadline = None;
            }
        }
    }
}

fn run_track(
    args: &TrackArgs,
    settings: Settings,
    session_id: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut source = ImageSequenceSource::open(&args.frames)?;
    let detector = ReplayDetector::from_path(&args.detections)?;
    log::info!(
        "Replaying {} frames with detections for {} of them",
        source.len(),
        detector.frame_count()
    );

    let detection_loop = DetectionLoop::new(
        settings.detection.clone(),
        Box::new(detector),
        DetectionSmoother::new(settings.smoother.clone()),
        Box::new(LogPipelineLogger::new()),
    );
    let mut feedback = FeedbackStore::new(session_id.clone());
    if let Some(max) = settings.classifier.max_corrections {
        feedback = feedback.with_max_corrections(max);
    }
    let use_case = ScanMoodUseCase::new(
        detection_loop,
        CaptureEncoder::new(settings.capture.clone()),
        feedback,
    );

    let transport = EndpointTransport::new(
        settings.classifier.analyze_url.clone(),
        Duration::from_secs(settings.classifier.timeout_secs),
    )?;
    let client = MoodAnalysisClient::new(Box::new(transport)).with_session_id(session_id);
    let worker = ScanWorker::start(client);

    if let Some(dir) = &args.save_crops {
        fs::create_dir_all(dir)?;
    }

    let scan_at: BTreeSet<usize> = args.scan_at.iter().copied().collect();
    let frame_interval = Duration::from_secs_f64(1.0 / args.fps);
    let scan_timeout = Duration::from_millis(args.scan_timeout_ms);
    let mut replay = Replay {
        use_case,
        correct_to: args.correct_to,
        pending_deadline: None,
        results: Vec::new(),
    };

    let started = Instant::now();
    let mut shown = false;
    for index in 0..source.len() {
        let now = started.elapsed();
        replay.expire(now);

        match replay.use_case.tick(now, &mut source) {
            TickOutcome::Cycle(Some(d)) if !shown => {
                log::info!(
                    "Frame {index}: tracking {} at stability {:.1}",
                    d.class.display_label(),
                    d.stability
                );
                shown = true;
            }
            TickOutcome::Cycle(None) if shown => {
                log::info!("Frame {index}: subject lost");
                shown = false;
            }
            TickOutcome::Stopped => break,
            TickOutcome::Denied => {
                log::warn!("Frame {index}: frame access denied, retrying on the next frame");
                replay.use_case.retry_camera();
            }
            _ => {}
        }

        if scan_at.contains(&index) {
            match replay.use_case.begin_scan(now, &mut source) {
                Ok(job) => {
                    if let Some(dir) = &args.save_crops {
                        save_crop(dir, &job)?;
                    }
                    replay.pending_deadline = Some(now + scan_timeout);
                    worker.submit(job);
                }
                Err(ScanError::NoSubject) => {
                    eprintln!("Frame {index}: nothing stable to scan");
                }
                Err(e) => eprintln!("Frame {index}: {e}"),
            }
        }

        // Pace playback while collecting analysis results.
        let frame_deadline = started + frame_interval.mul_f64((index + 1) as f64);
        while let Some(msg) = worker.recv_until(frame_deadline) {
            replay.handle(msg, started.elapsed());
        }
        source.advance();
    }

    // Let an in-flight analysis finish before shutting down.
    if let Some(deadline) = replay.pending_deadline {
        let remaining = deadline.saturating_sub(started.elapsed());
        if let Some(msg) = worker.recv_until(Instant::now() + remaining) {
            replay.handle(msg, started.elapsed());
        }
        replay.expire(started.elapsed().max(deadline));
    }
    while let Some(msg) = worker.try_recv() {
        replay.handle(msg, started.elapsed());
    }
    replay.use_case.stop();

    log::info!(
        "{} scans completed, {} feedback records",
        replay.results.len(),
        replay.use_case.feedback().records().len()
    );
    Ok(())
}

fn print_result(sequence: u64, result: &MoodResult) {
    println!(
        "Scan {sequence}: {} ({}% confidence)",
        result.mood.title(),
        result.confidence
    );
    if let Some(reasoning) = &result.reasoning {
        println!("  {reasoning}");
    }
}

fn save_crop(dir: &Path, job: &AnalysisJob) -> Result<(), Box<dyn std::error::Error>> {
    let encoded = job
        .payload
        .data_uri
        .split_once(',')
        .map(|(_, data)| data)
        .ok_or("capture is not a data URI")?;
    let extension = match job.payload.mime_type() {
        Some("image/png") => "png",
        _ => "jpg",
    };
    let path = dir.join(format!("scan_{}.{extension}", job.sequence));
    fs::write(&path, STANDARD.decode(encoded)?)?;
    log::info!("Saved capture to {}", path.display());
    Ok(())
}

fn run_feedback(
    args: &FeedbackArgs,
    settings: &Settings,
    session_id: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let data_uri = image_data_uri(&args.image)?;
    let mut store = FeedbackStore::new(session_id);
    let record = store.record(
        args.predicted,
        args.actual,
        args.confidence,
        content_fingerprint(&data_uri),
        args.notes.clone(),
    );

    let mut sink = EndpointFeedbackSink::new(
        settings.classifier.feedback_url.clone(),
        Duration::from_secs(settings.classifier.timeout_secs),
    )?;
    let response = sink.submit(&record)?;
    println!(
        "{:?}: {}",
        response.learning_type,
        response.message.as_deref().unwrap_or("feedback recorded")
    );
    Ok(())
}

/// Reads an image file into the same data URI form a capture produces.
fn image_data_uri(path: &Path) -> Result<String, Box<dyn std::error::Error>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .filter(|e| IMAGE_EXTENSIONS.contains(&e.as_str()))
        .ok_or_else(|| format!("{} is not a supported image", path.display()))?;
    let mime = match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg".to_string(),
        "tif" => "image/tiff".to_string(),
        other => format!("image/{other}"),
    };
    Ok(format!("data:{mime};base64,{}", STANDARD.encode(fs::read(path)?)))
}
