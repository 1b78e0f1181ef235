//! Main entry point for ryt-cipher CLI

use anyhow::{bail, Context};
use clap::Parser;
use ryt_cipher::cli::args::{Args, CipherInput, ScriptLocation, VerbosityLevel};
use ryt_cipher::cli::output::OutputFormatter;
use ryt_cipher::core::{SignatureCipher, SignatureResolver, VideoInfo};
use ryt_cipher::platform::cipher::{
    CipherConfig, Decipherer, EventSink, MemorySink, SessionCache, TracingSink,
};
use ryt_cipher::platform::player::{read_script_file, FetchConfig, PlayerFetcher};
use ryt_cipher::utils::url::extract_video_id;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbosity_level());
    debug!("Starting ryt-cipher with args: {:?}", args);

    let formatter = OutputFormatter::new(args.verbosity_level());
    let start_time = Instant::now();

    // Collect the decision trail in memory when it is going to be printed
    let trail = Arc::new(MemorySink::new());
    let sink: Arc<dyn EventSink> = if args.trace {
        trail.clone() as Arc<dyn EventSink>
    } else {
        Arc::new(TracingSink)
    };
    let cache = Arc::new(SessionCache::with_config(
        CipherConfig::new().with_sink(sink),
    ));

    let loaded = load_decipherer(&args, &formatter, cache).await;
    if args.trace {
        formatter.print_trace(&trail.take());
    }
    let (decipherer, video_id) = loaded?;
    formatter.debug(&format!(
        "Signature plan has {} steps over {} helpers",
        decipherer.plan().len(),
        decipherer.table().len()
    ));

    if args.has_no_inputs() {
        formatter.success(&format!(
            "Player script understood: {} steps over {} helpers",
            decipherer.plan().len(),
            decipherer.table().len()
        ));
        return Ok(());
    }

    let mut deciphered = 0;
    let mut failed = 0;

    for input in args.cipher_inputs() {
        let result = match &input {
            CipherInput::Query(field) => SignatureCipher::parse(field)
                .and_then(|cipher| cipher.signed_url(&decipherer)),
            CipherInput::Token(token) => decipherer.apply(token).map_err(Into::into),
        };
        match result {
            Ok(value) => {
                formatter.print_result(&value);
                deciphered += 1;
            }
            Err(err) => {
                formatter.error(&format!("{}: {}", input.as_str(), err));
                failed += 1;
            }
        }
    }

    if let Some(path) = &args.info {
        let json = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read player response {}", path.display()))?;
        let mut video_info: VideoInfo = serde_json::from_str(&json)
            .with_context(|| format!("failed to parse player response {}", path.display()))?;

        let report = video_info.decipher_all(&decipherer);
        let video_id = if video_info.video_details.video_id.is_empty() {
            video_id.unwrap_or_default()
        } else {
            video_info.video_details.video_id.clone()
        };
        for format in video_info.all_formats().filter(|f| !f.needs_deciphering()) {
            formatter.print_format(format, &video_id);
        }
        for (itag, err) in &report.failures {
            formatter.error(&format!("itag={}: {}", itag, err));
        }
        deciphered += report.deciphered;
        failed += report.failures.len();
    }

    if args.trace {
        formatter.print_trace(&trail.take());
    }
    formatter.print_summary(deciphered, failed, start_time.elapsed());

    if failed > 0 {
        bail!("{} of {} signatures could not be deciphered", failed, deciphered + failed);
    }
    Ok(())
}

/// Build the decipherer from whichever script source was selected
async fn load_decipherer(
    args: &Args,
    formatter: &OutputFormatter,
    cache: Arc<SessionCache>,
) -> anyhow::Result<(Arc<Decipherer>, Option<String>)> {
    let Some(location) = args.script_location() else {
        bail!("one of --script, --player-url or --video is required");
    };

    let (resolver, player_url, video_id) = match location {
        ScriptLocation::File(path) => {
            let script = read_script_file(&path)
                .await
                .with_context(|| format!("failed to read player script {}", path.display()))?;
            let decipherer = cache.get_or_build(&script).with_context(|| {
                format!("failed to understand player script {}", path.display())
            })?;
            return Ok((decipherer, None));
        }
        ScriptLocation::Url(url) => (http_resolver(args, cache)?, url, None),
        ScriptLocation::Video(video) => {
            let video_id = extract_video_id(&video)?;
            let resolver = http_resolver(args, cache)?;
            let player_url = resolver
                .player_url_for(&video_id)
                .await
                .with_context(|| format!("failed to locate player script for {}", video_id))?;
            (resolver, player_url, Some(video_id))
        }
    };

    formatter.info(&format!("Using player script {}", player_url));
    let decipherer = resolver
        .decipherer_for(&player_url)
        .await
        .with_context(|| format!("failed to understand player script {}", player_url))?;
    Ok((decipherer, video_id))
}

/// Resolver fetching scripts over HTTP with the CLI's network settings
fn http_resolver(
    args: &Args,
    cache: Arc<SessionCache>,
) -> anyhow::Result<SignatureResolver<PlayerFetcher>> {
    let defaults = FetchConfig::default();
    let fetcher = PlayerFetcher::with_config(FetchConfig {
        base_url: args.base_url.clone(),
        timeout: args.timeout_duration(),
        user_agent: args.user_agent.clone().unwrap_or(defaults.user_agent.clone()),
        ..defaults
    })
    .context("failed to create HTTP client")?;
    Ok(SignatureResolver::with_cache(fetcher, cache))
}

/// Initialize logging system
fn init_logging(verbosity: VerbosityLevel) {
    // RUST_LOG wins over the verbosity flags
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(verbosity.log_directive()));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}
