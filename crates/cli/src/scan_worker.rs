use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use moodcam_core::analysis::domain::error::AnalysisError;
use moodcam_core::analysis::domain::mood::MoodResult;
use moodcam_core::analysis::mood_analysis_client::MoodAnalysisClient;
use moodcam_core::pipeline::scan_mood_use_case::AnalysisJob;

pub struct ScanMessage {
    pub sequence: u64,
    pub outcome: Result<MoodResult, AnalysisError>,
}

/// Runs classifier round trips off the replay thread.
///
/// Jobs are processed one at a time in submission order; every result is
/// tagged with its scan sequence so the replay loop can drop stale ones.
pub struct ScanWorker {
    jobs: Option<Sender<AnalysisJob>>,
    results: Receiver<ScanMessage>,
    handle: Option<JoinHandle<()>>,
}

impl ScanWorker {
    pub fn start(client: MoodAnalysisClient) -> Self {
        let (job_tx, job_rx) = crossbeam_channel::unbounded::<AnalysisJob>();
        let (result_tx, result_rx) = crossbeam_channel::unbounded::<ScanMessage>();

        let handle = thread::spawn(move || run(&client, &job_rx, &result_tx));

        Self {
            jobs: Some(job_tx),
            results: result_rx,
            handle: Some(handle),
        }
    }

    pub fn submit(&self, job: AnalysisJob) {
        if let Some(jobs) = &self.jobs {
            if jobs.send(job).is_err() {
                log::error!("Scan worker is gone; dropping job");
            }
        }
    }

    /// Next result, waiting no later than `deadline`.
    pub fn recv_until(&self, deadline: Instant) -> Option<ScanMessage> {
        match self.results.recv_deadline(deadline) {
            Ok(msg) => Some(msg),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn try_recv(&self) -> Option<ScanMessage> {
        self.results.try_recv().ok()
    }
}

impl Drop for ScanWorker {
    fn drop(&mut self) {
        // Closing the job channel ends the worker loop.
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run(client: &MoodAnalysisClient, jobs: &Receiver<AnalysisJob>, results: &Sender<ScanMessage>) {
    for job in jobs.iter() {
        let started = Instant::now();
        let outcome =
            client.analyze_for_session(&job.session_id, &job.payload, Some(&job.corrections));
        log::debug!(
            "Scan {} answered in {:.0}ms",
            job.sequence,
            started.elapsed().as_secs_f64() * 1000.0
        );
        if results
            .send(ScanMessage {
                sequence: job.sequence,
                outcome,
            })
            .is_err()
        {
            break;
        }
    }
}
