use anyhow::Result;
use articast::audio::codec::{Codec, Mp3Codec, WavCodec};
use articast::cache::ArticleCache;
use articast::cli::{Cli, Commands, ConfigAction};
use articast::config::Config;
use articast::diagnostics::check_dependencies;
use articast::extract::HttpArticleExtractor;
use articast::gateway;
use articast::job::{JobId, Voice};
use articast::podcast::PodcastAssembler;
use articast::queue::RedisJobQueue;
use articast::store::RedisJobStore;
use articast::synth::UtteranceSynthesizer;
use articast::tts::{ModelBank, PiperModel, SpeechModel};
use articast::worker::Worker;
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Worker { workers, voices } => {
            run_workers(config, workers, voices, cli.quiet, cli.verbose).await?;
        }
        Commands::Submit { urls, voice } => {
            handle_submit(&config, urls, voice)?;
        }
        Commands::Status { job_id } => {
            handle_status(&config, job_id)?;
        }
        Commands::Fetch { job_id, output } => {
            handle_fetch(&config, job_id, output.as_deref(), cli.quiet)?;
        }
        Commands::Speak {
            input,
            output,
            voice,
        } => {
            handle_speak(&config, &input, &output, voice, cli.quiet)?;
        }
        Commands::Check => {
            check_dependencies(&config);
        }
        Commands::Config { action } => {
            handle_config(&config, action, cli.config.as_deref())?;
        }
    }

    Ok(())
}

/// Load configuration from file or use defaults.
///
/// Priority order:
/// 1. Custom config path from CLI (--config)
/// 2. Default config path (~/.config/articast/config.toml)
/// 3. Built-in defaults with environment variable overrides
fn load_config(custom_path: Option<&Path>) -> Result<Config> {
    let config = if let Some(path) = custom_path {
        Config::load(path)?
    } else {
        Config::load_or_default(&Config::default_path())?
    };
    Ok(config.with_env_overrides())
}

/// Run `count` consume loops until SIGINT/SIGTERM.
///
/// Every loop is share-nothing: its own broker connections, its own model
/// bank, its own consumer name — interchangeable with a loop in any other
/// worker process. On shutdown each loop finishes and acknowledges its
/// in-flight job before exiting.
async fn run_workers(
    mut config: Config,
    workers_override: Option<usize>,
    voices: Vec<Voice>,
    quiet: bool,
    verbose: u8,
) -> Result<()> {
    if !voices.is_empty() {
        // Serve a subset of the configured voices; the model bank rejects
        // an empty result at startup.
        config.tts.voices.retain(|voice, _| voices.contains(voice));
    }
    let count = workers_override.unwrap_or(config.worker.workers).max(1);
    let shutdown = Arc::new(AtomicBool::new(false));

    if !quiet {
        eprintln!("articast: starting {count} worker loop(s)");
    }

    let mut handles = Vec::with_capacity(count);
    for index in 0..count {
        let config = config.clone();
        let shutdown = Arc::clone(&shutdown);
        handles.push(tokio::task::spawn_blocking(move || {
            let worker = build_worker(&config, index, quiet, verbose)?;
            worker.run(&shutdown)
        }));
    }

    wait_for_shutdown_signal(quiet).await;
    shutdown.store(true, Ordering::SeqCst);

    for handle in handles {
        handle.await??;
    }
    Ok(())
}

/// Build one worker loop's resources.
///
/// Model loading dominates startup time; everything here is constructed
/// once and injected, never reached for as a global.
fn build_worker(
    config: &Config,
    index: usize,
    quiet: bool,
    verbose: u8,
) -> articast::Result<Worker> {
    let consumer = format!("{}-{index}", config.broker.consumer);
    let store = RedisJobStore::connect(&config.broker.url)?;
    let queue = RedisJobQueue::connect(&config.broker.url, &config.broker.queue, &consumer)?;
    let extractor = HttpArticleExtractor::new()?;

    if !quiet {
        eprintln!(
            "articast: loading {} voice model(s)...",
            config.tts.voices.len()
        );
    }
    let models = ModelBank::from_config(&config.tts)?;

    let codec: Arc<dyn Codec> = Arc::new(Mp3Codec::new());
    let cache = ArticleCache::new(&config.files.articles_dir, Arc::clone(&codec))?;
    let assembler = PodcastAssembler::from_file(&config.files.jingle, codec.as_ref())?;

    Ok(Worker {
        store: Arc::new(store),
        queue: Arc::new(queue),
        extractor: Arc::new(extractor),
        models: Arc::new(models),
        cache,
        assembler,
        codec,
        podcasts_dir: config.files.podcasts_dir.clone(),
        consume_timeout: Duration::from_secs(config.worker.consume_timeout_secs),
        quiet,
        verbose,
    })
}

/// Wait for SIGINT or SIGTERM.
async fn wait_for_shutdown_signal(quiet: bool) {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            if !quiet {
                eprintln!("\narticast: received SIGINT, shutting down...");
            }
        }
        _ = wait_for_sigterm() => {
            if !quiet {
                eprintln!("\narticast: received SIGTERM, shutting down...");
            }
        }
    }
}

/// Wait for SIGTERM (used by systemd).
#[cfg(unix)]
async fn wait_for_sigterm() {
    use tokio::signal::unix::{SignalKind, signal};
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            eprintln!("articast: failed to register SIGTERM handler: {e}");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_sigterm() {
    // On non-Unix, just wait forever (Ctrl+C will still work)
    std::future::pending::<()>().await;
}

fn handle_submit(config: &Config, urls: Vec<String>, voice: Option<Voice>) -> Result<()> {
    let voice = voice.unwrap_or(config.tts.default_voice);
    let store = RedisJobStore::connect(&config.broker.url)?;
    let queue = RedisJobQueue::connect(&config.broker.url, &config.broker.queue, "gateway")?;

    let id = gateway::submit(&store, &queue, urls, voice)?;
    println!("{id}");
    Ok(())
}

fn handle_status(config: &Config, job_id: String) -> Result<()> {
    let store = RedisJobStore::connect(&config.broker.url)?;
    let info = gateway::status(&store, &JobId::from(job_id))?;

    println!("Job {}", info.id);
    println!("  status: {}", info.status);
    println!("  voice:  {}", info.voice);
    if let Some(created_at) = info.created_at {
        println!("  created: {}", created_at.to_rfc3339());
    }
    Ok(())
}

fn handle_fetch(
    config: &Config,
    job_id: String,
    output: Option<&Path>,
    quiet: bool,
) -> Result<()> {
    let store = RedisJobStore::connect(&config.broker.url)?;
    let path = gateway::result_file(&store, &JobId::from(job_id))?;

    match output {
        Some(destination) => {
            std::fs::copy(&path, destination)?;
            if !quiet {
                eprintln!("Saved podcast to {}", destination.display());
            }
        }
        None => println!("{}", path.display()),
    }
    Ok(())
}

/// One-shot file-to-speech, bypassing the queue entirely.
fn handle_speak(
    config: &Config,
    input: &Path,
    output: &Path,
    voice: Option<Voice>,
    quiet: bool,
) -> Result<()> {
    let voice = voice.unwrap_or(config.tts.default_voice);
    let model_path = config.tts.voices.get(&voice).ok_or_else(|| {
        articast::ArticastError::VoiceUnavailable {
            voice: voice.to_string(),
        }
    })?;

    if !quiet {
        eprintln!("Loading voice {voice}...");
    }
    let model = PiperModel::new(&config.tts.piper_bin, model_path)?;
    let synthesizer = UtteranceSynthesizer::new(Arc::new(model) as Arc<dyn SpeechModel>);

    let text = std::fs::read_to_string(input)?;
    let waveform = synthesizer.text_to_speech(&text)?;

    // Container follows the output extension; anything but .wav goes
    // through the compressed codec.
    let codec: Box<dyn Codec> = match output.extension().and_then(|e| e.to_str()) {
        Some("wav") => Box::new(WavCodec),
        _ => Box::new(Mp3Codec::new()),
    };
    codec.encode(&waveform, output)?;

    if !quiet {
        eprintln!("Wrote {}", output.display());
    }
    Ok(())
}

fn handle_config(config: &Config, action: ConfigAction, custom_path: Option<&Path>) -> Result<()> {
    match action {
        ConfigAction::Show => {
            print!("{}", toml::to_string_pretty(config)?);
        }
        ConfigAction::Path => {
            let path = custom_path
                .map(Path::to_path_buf)
                .unwrap_or_else(Config::default_path);
            println!("{}", path.display());
        }
    }
    Ok(())
}
