mod terminal;

use crate::terminal::TerminalDisplay;
use clap::Parser;
use karaoke_core::time::duration_from_secs;
use karaoke_core::{
    load_track, loader_for, AudioSource, ClockSource, CoreError, KaraokeConfig, LyricTrack,
    PlaybackController, PlayerConfig,
};
use karaoke_rodio::RodioSource;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "info,symphonia=warn";

/// Play a song with its lyrics shown in time
#[derive(Parser, Debug)]
#[command(name = "karaoke", version, about)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, env = "KARAOKE_CONFIG")]
    config: Option<PathBuf>,

    /// Audio file to play, overrides `audio.path`
    #[arg(short, long)]
    audio: Option<PathBuf>,

    /// Lyrics file or URL, overrides `lyrics.source`
    #[arg(short, long)]
    lyrics: Option<String>,

    /// Run without an audio device, pretending the track lasts this many seconds
    #[arg(long, value_name = "SECONDS", value_parser = parse_seconds)]
    silent: Option<Duration>,
}

impl Args {
    fn apply(&self, config: &mut KaraokeConfig) {
        if let Some(audio) = &self.audio {
            config.audio.path.clone_from(audio);
        }
        if let Some(lyrics) = &self.lyrics {
            config.lyrics.source.clone_from(lyrics);
        }
    }
}

fn parse_seconds(value: &str) -> Result<Duration, String> {
    let secs: f64 = value
        .parse()
        .map_err(|_| format!("`{value}` is not a number of seconds"))?;
    duration_from_secs(secs)
        .filter(|d| !d.is_zero())
        .ok_or_else(|| format!("`{value}` is not a positive length"))
}

fn main() {
    let args = Args::parse();
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(KaraokeConfig::config_path);

    // Check config for logging.enabled before full config load
    init_tracing(check_file_logging_enabled(&config_path));

    let mut config = match KaraokeConfig::load_or_create_at(&config_path) {
        Ok(config) => config,
        Err(CoreError::ConfigNotFound { path }) => {
            info!(
                "Created a config template at {}, continuing with defaults",
                path.display()
            );
            KaraokeConfig::default()
        }
        Err(e) => {
            error!("Failed to load {}: {e}", config_path.display());
            std::process::exit(1);
        }
    };
    args.apply(&mut config);

    // The rodio output stream stays on this thread, so everything runs on it
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {e}");
            std::process::exit(1);
        }
    };

    let cancel_token = CancellationToken::new();
    let ctrlc_token = cancel_token.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received Ctrl+C, shutting down gracefully...");
        ctrlc_token.cancel();
    }) {
        error!("Failed to set Ctrl+C handler: {}", e);
    }

    let ok = runtime.block_on(run(&config, args.silent, cancel_token));

    // Stdin reads cannot be interrupted, don't wait for them
    runtime.shutdown_background();

    if !ok {
        std::process::exit(1);
    }
}

async fn run(
    config: &KaraokeConfig,
    silent: Option<Duration>,
    cancel_token: CancellationToken,
) -> bool {
    let loader = match loader_for(&config.lyrics) {
        Ok(loader) => loader,
        Err(e) => {
            error!("Invalid lyrics source {}: {e}", config.lyrics.source);
            return false;
        }
    };
    let track = Arc::new(load_track(loader.as_ref()).await);

    if let Some(duration) = silent {
        info!("Silent mode, track length {:?}", duration);
        play(ClockSource::new(duration), track, &config.player, cancel_token).await;
        return true;
    }

    match RodioSource::open(&config.audio.path, config.audio.volume) {
        Ok(source) => {
            play(source, track, &config.player, cancel_token).await;
            true
        }
        Err(e) => {
            error!("{e}");
            false
        }
    }
}

async fn play<S: AudioSource>(
    source: S,
    track: Arc<LyricTrack>,
    config: &PlayerConfig,
    cancel_token: CancellationToken,
) {
    if track.is_empty() {
        warn!("No lyrics to show, playing audio only");
    }

    let (controller, handle) = PlaybackController::new(source, Arc::clone(&track), config);

    tokio::spawn(terminal::read_controls(handle, cancel_token.clone()));

    run_with_display(controller, track.song(), cancel_token, std::io::stdout()).await;
    info!("Player stopped");
}

/// Run the controller with a display task writing to `out`.
///
/// Returns once the display has printed everything the controller published,
/// including the events from the final stop.
async fn run_with_display<S, W>(
    controller: PlaybackController<S>,
    song: &str,
    cancel_token: CancellationToken,
    out: W,
) -> Option<W>
where
    S: AudioSource,
    W: Write + Send + 'static,
{
    let display = tokio::spawn(TerminalDisplay::new(song).run(controller.subscribe(), out));

    // Dropping the controller closes the event channel and ends the display
    controller.run(cancel_token).await;

    match display.await {
        Ok(out) => Some(out),
        Err(e) => {
            warn!("Display task failed: {}", e);
            None
        }
    }
}

/// Check if file logging is enabled by reading the config file.
/// This is done before full config loading to set up tracing first.
/// Returns `false` if config doesn't exist or can't be parsed.
fn check_file_logging_enabled(config_path: &Path) -> bool {
    // Minimal structs to parse just the logging.enabled field
    #[derive(serde::Deserialize)]
    struct PartialConfig {
        #[serde(default)]
        logging: PartialLoggingConfig,
    }
    #[derive(serde::Deserialize, Default)]
    struct PartialLoggingConfig {
        #[serde(default)]
        enabled: bool,
    }

    let Ok(content) = std::fs::read_to_string(config_path) else {
        return false;
    };

    toml::from_str::<PartialConfig>(&content)
        .map(|c| c.logging.enabled)
        .unwrap_or(false)
}

/// Log to stderr, and to the log file when enabled, keeping stdout for lyrics
fn init_tracing(file_logging_enabled: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    if file_logging_enabled {
        let log_path = karaoke_core::paths::log_file_path();

        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        match File::create(&log_path) {
            Ok(file) => {
                let file_layer = tracing_subscriber::fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt_layer)
                    .with(file_layer)
                    .init();

                return;
            }
            Err(e) => {
                eprintln!("Failed to create log file at {}: {e}", log_path.display());
            }
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use karaoke_core::LyricLine;

    #[tokio::test(start_paused = true)]
    async fn test_display_prints_final_stop_events() {
        let track = Arc::new(LyricTrack::new(
            "Short",
            vec![LyricLine::new(Duration::from_millis(200), "Only line")],
        ));
        let (controller, handle) = PlaybackController::new(
            ClockSource::new(Duration::from_secs(10)),
            Arc::clone(&track),
            &PlayerConfig::default(),
        );
        let cancel = CancellationToken::new();
        handle.toggle();

        let stopper = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            stopper.cancel();
        });

        let out = run_with_display(controller, track.song(), cancel, Vec::new())
            .await
            .unwrap();
        let printed = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = printed.lines().collect();

        assert_eq!(lines[2], "[idle] press t to start");
        assert!(lines.contains(&"♪ Only line"));
        assert_eq!(&lines[lines.len() - 2..], &["♪", "[idle] press t to start"]);
    }

    #[test]
    fn test_parse_seconds() {
        assert_eq!(parse_seconds("12.5"), Ok(Duration::from_millis(12_500)));
        assert!(parse_seconds("0").is_err());
        assert!(parse_seconds("-3").is_err());
        assert!(parse_seconds("soon").is_err());
    }

    #[test]
    fn test_args_override_config() {
        let args = Args::parse_from([
            "karaoke",
            "--audio",
            "/music/belair.mp3",
            "--lyrics",
            "https://example.com/belair.lrc",
        ]);
        let mut config = KaraokeConfig::default();
        args.apply(&mut config);

        assert_eq!(config.audio.path, PathBuf::from("/music/belair.mp3"));
        assert_eq!(config.lyrics.source, "https://example.com/belair.lrc");
    }

    #[test]
    fn test_args_silent() {
        let args = Args::parse_from(["karaoke", "--silent", "30"]);
        assert_eq!(args.silent, Some(Duration::from_secs(30)));
        assert!(Args::try_parse_from(["karaoke", "--silent", "0"]).is_err());
    }

    #[test]
    fn test_check_file_logging_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        assert!(!check_file_logging_enabled(&path));

        std::fs::write(&path, "[logging]\nenabled = true\n").unwrap();
        assert!(check_file_logging_enabled(&path));

        std::fs::write(&path, "not = [valid").unwrap();
        assert!(!check_file_logging_enabled(&path));
    }
}
