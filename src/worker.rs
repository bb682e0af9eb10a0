//! The worker: a blocking consume loop driving jobs through the pipeline.
//!
//! Each worker owns its broker connections and its loaded models, consumes
//! one job at a time, and is the only writer of that job's record while the
//! delivery is in flight. A crashed worker's unacknowledged job is requeued
//! and another worker runs it from the start; the article cache makes that
//! rerun cheap for anything already synthesized.

use crate::audio::codec::Codec;
use crate::cache::ArticleCache;
use crate::error::{ArticastError, Result};
use crate::extract::ArticleExtractor;
use crate::job::{Job, JobStatus};
use crate::podcast::PodcastAssembler;
use crate::queue::{Delivery, JobQueue};
use crate::store::JobStore;
use crate::synth::UtteranceSynthesizer;
use crate::tts::model::ModelBank;
use chrono::Utc;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// One consume loop's resources, built once at startup and injected.
pub struct Worker {
    pub store: Arc<dyn JobStore>,
    pub queue: Arc<dyn JobQueue>,
    pub extractor: Arc<dyn ArticleExtractor>,
    pub models: Arc<ModelBank>,
    pub cache: ArticleCache,
    pub assembler: PodcastAssembler,
    pub codec: Arc<dyn Codec>,
    pub podcasts_dir: PathBuf,
    pub consume_timeout: Duration,
    pub quiet: bool,
    pub verbose: u8,
}

impl Worker {
    /// Run the consume loop until `shutdown` is set.
    ///
    /// Unacknowledged deliveries from a previous run of this consumer are
    /// requeued first. The loop wakes every [`Worker::consume_timeout`] to
    /// re-check the shutdown flag; an in-flight job always finishes and acks
    /// before the loop exits. Pipeline failures are recorded on the job;
    /// only store/queue errors abort the loop.
    pub fn run(&self, shutdown: &AtomicBool) -> Result<()> {
        let requeued = self.queue.recover()?;
        if requeued > 0 && !self.quiet {
            eprintln!("articast: requeued {requeued} unacknowledged job(s) from a previous run");
        }
        if !self.quiet {
            let voices: Vec<&str> = self.models.voices().map(|v| v.as_str()).collect();
            eprintln!("articast: worker ready (voices: {})", voices.join(", "));
        }

        while !shutdown.load(Ordering::SeqCst) {
            self.run_once(self.consume_timeout)?;
        }

        if !self.quiet {
            eprintln!("articast: worker stopped");
        }
        Ok(())
    }

    /// Consume and handle at most one delivery. Returns whether one arrived.
    pub fn run_once(&self, timeout: Duration) -> Result<bool> {
        match self.queue.consume(timeout)? {
            Some(delivery) => {
                self.handle_delivery(&delivery)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Drive one delivery through the job state machine.
    ///
    /// `NotStarted → Running` happens before any article work; the terminal
    /// transition is written before the delivery is acknowledged, never
    /// after. A redelivered job that already reached a terminal state is
    /// acknowledged without rework.
    fn handle_delivery(&self, delivery: &Delivery) -> Result<()> {
        let id = &delivery.job_id;
        let Some(job) = self.store.fetch(id)? else {
            // A queued id without a record; nothing to run.
            eprintln!("articast: dropping delivery for unknown job {id}");
            return self.queue.ack(delivery);
        };

        if job.status.is_terminal() {
            // Redelivered after a crash between the terminal write and the
            // ack; the result already stands.
            return self.queue.ack(delivery);
        }

        self.store.set_status(id, JobStatus::Running)?;
        if !self.quiet {
            eprintln!(
                "articast: job {id} running ({} article(s), voice {})",
                job.article_urls.len(),
                job.voice
            );
        }

        match self.process_job(&job) {
            Ok(result_path) => {
                self.store.mark_succeeded(id, &result_path, Utc::now())?;
                if !self.quiet {
                    eprintln!("articast: job {id} succeeded -> {}", result_path.display());
                }
            }
            Err(e) => {
                self.store.set_status(id, JobStatus::Failed)?;
                eprintln!("articast: job {id} failed: {e}");
            }
        }

        self.queue.ack(delivery)
    }

    /// The per-job pipeline: article artifacts, then podcast assembly.
    ///
    /// Articles are processed strictly in `article_urls` order; any article
    /// failure aborts the job with no partial podcast.
    fn process_job(&self, job: &Job) -> Result<PathBuf> {
        let model = self
            .models
            .get(job.voice)
            .ok_or_else(|| ArticastError::VoiceUnavailable {
                voice: job.voice.to_string(),
            })?;
        let synthesizer = UtteranceSynthesizer::new(Arc::clone(model));

        let mut article_paths = Vec::with_capacity(job.article_urls.len());
        for url in &job.article_urls {
            let hit = self.cache.contains(url, job.voice);
            let path =
                self.cache
                    .get_or_create(url, job.voice, self.extractor.as_ref(), &synthesizer)?;
            if !self.quiet && self.verbose >= 1 {
                let source = if hit { "cached" } else { "synthesized" };
                eprintln!("articast:   {url} ({source})");
            }
            article_paths.push(path);
        }

        let mut waveforms = Vec::with_capacity(article_paths.len());
        for path in &article_paths {
            waveforms.push(self.codec.decode(path)?);
        }
        let podcast = self.assembler.assemble(&waveforms);

        fs::create_dir_all(&self.podcasts_dir)?;
        let result_path = self
            .podcasts_dir
            .join(format!("{}.{}", job.id, self.codec.extension()));
        let staging = tempfile::Builder::new()
            .prefix(".articast-podcast-")
            .tempfile_in(&self.podcasts_dir)
            .map_err(|e| ArticastError::Audio {
                message: format!(
                    "Failed to create staging file in {}: {}",
                    self.podcasts_dir.display(),
                    e
                ),
            })?;
        self.codec.encode(&podcast, staging.path())?;
        staging
            .persist(&result_path)
            .map_err(|e| ArticastError::Audio {
                message: format!(
                    "Failed to publish podcast {}: {}",
                    result_path.display(),
                    e.error
                ),
            })?;
        Ok(result_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::codec::WavCodec;
    use crate::extract::MockArticleExtractor;
    use crate::gateway;
    use crate::job::Voice;
    use crate::queue::MemoryJobQueue;
    use crate::store::MemoryJobStore;
    use crate::tts::model::MockSpeechModel;
    use crate::tts::SpeechModel;
    use tempfile::TempDir;

    fn test_worker(
        dir: &TempDir,
        extractor: MockArticleExtractor,
    ) -> (Worker, Arc<MockArticleExtractor>) {
        let codec: Arc<dyn Codec> = Arc::new(WavCodec);
        let extractor = Arc::new(extractor);
        let mut models = ModelBank::empty();
        models.insert(
            Voice::Female1,
            Arc::new(MockSpeechModel::new("female1")) as Arc<dyn SpeechModel>,
        );

        let worker = Worker {
            store: Arc::new(MemoryJobStore::new()),
            queue: Arc::new(MemoryJobQueue::new()),
            extractor: Arc::clone(&extractor) as Arc<dyn ArticleExtractor>,
            models: Arc::new(models),
            cache: ArticleCache::new(dir.path().join("articles"), Arc::clone(&codec)).unwrap(),
            assembler: PodcastAssembler::new(vec![1000i16; 400]),
            codec,
            podcasts_dir: dir.path().join("podcasts"),
            consume_timeout: Duration::from_millis(20),
            quiet: true,
            verbose: 0,
        };
        (worker, extractor)
    }

    #[test]
    fn run_once_with_empty_queue_returns_false() {
        let dir = tempfile::tempdir().unwrap();
        let (worker, _) = test_worker(&dir, MockArticleExtractor::new());
        assert!(!worker.run_once(Duration::from_millis(20)).unwrap());
    }

    #[test]
    fn delivery_for_unknown_job_is_acked_and_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let (worker, _) = test_worker(&dir, MockArticleExtractor::new());

        let ghost = crate::job::JobId::new();
        worker.queue.publish(&ghost).unwrap();
        assert!(worker.run_once(Duration::from_millis(20)).unwrap());

        // The delivery is gone, not redelivered forever.
        assert_eq!(worker.queue.recover().unwrap(), 0);
    }

    #[test]
    fn missing_voice_model_fails_the_job() {
        let dir = tempfile::tempdir().unwrap();
        let (worker, _) = test_worker(&dir, MockArticleExtractor::new());

        // The bank only serves Female1.
        let id = gateway::submit(
            worker.store.as_ref(),
            worker.queue.as_ref(),
            vec!["https://example.com/a1".to_string()],
            Voice::Male1,
        )
        .unwrap();

        worker.run_once(Duration::from_millis(20)).unwrap();
        let job = worker.store.fetch(&id).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.result_path.is_none());
    }

    #[test]
    fn terminal_job_redelivery_is_acked_without_rework() {
        let dir = tempfile::tempdir().unwrap();
        let (worker, _) = test_worker(&dir, MockArticleExtractor::new());

        let id = gateway::submit(
            worker.store.as_ref(),
            worker.queue.as_ref(),
            vec!["https://example.com/a1".to_string()],
            Voice::Female1,
        )
        .unwrap();
        worker.run_once(Duration::from_millis(20)).unwrap();

        let before = worker.store.fetch(&id).unwrap().unwrap();
        assert_eq!(before.status, JobStatus::Succeeded);

        // Simulate a crash between the terminal write and the ack: the same
        // id arrives again.
        worker.queue.publish(&id).unwrap();
        worker.run_once(Duration::from_millis(20)).unwrap();

        let after = worker.store.fetch(&id).unwrap().unwrap();
        assert_eq!(after.status, JobStatus::Succeeded);
        assert_eq!(after.result_path, before.result_path);
        assert_eq!(after.created_at, before.created_at);
    }

    #[test]
    fn articles_are_processed_in_submission_order() {
        let dir = tempfile::tempdir().unwrap();
        let (worker, extractor) = test_worker(&dir, MockArticleExtractor::new());

        let urls = vec![
            "https://example.com/first".to_string(),
            "https://example.com/second".to_string(),
            "https://example.com/third".to_string(),
        ];
        let id = gateway::submit(
            worker.store.as_ref(),
            worker.queue.as_ref(),
            urls.clone(),
            Voice::Female1,
        )
        .unwrap();
        worker.run_once(Duration::from_millis(20)).unwrap();

        assert_eq!(extractor.calls(), urls);
        let job = worker.store.fetch(&id).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Succeeded);
    }

    #[test]
    fn failed_job_leaves_no_podcast_file() {
        let dir = tempfile::tempdir().unwrap();
        let (worker, _) = test_worker(
            &dir,
            MockArticleExtractor::new().with_failure("https://example.com/bad"),
        );

        let id = gateway::submit(
            worker.store.as_ref(),
            worker.queue.as_ref(),
            vec![
                "https://example.com/good".to_string(),
                "https://example.com/bad".to_string(),
            ],
            Voice::Female1,
        )
        .unwrap();
        worker.run_once(Duration::from_millis(20)).unwrap();

        let job = worker.store.fetch(&id).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.result_path.is_none());
        assert!(job.created_at.is_none());
        // No partial podcast was published.
        let podcasts: Vec<_> = std::fs::read_dir(&worker.podcasts_dir)
            .map(|entries| entries.flatten().collect())
            .unwrap_or_default();
        assert!(podcasts.is_empty(), "unexpected podcast files: {podcasts:?}");
    }
}
