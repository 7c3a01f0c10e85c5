//! Quiz Arena binary entrypoint wiring configuration, storage, the generator and the terminal.

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod dao;
mod dto;
mod error;
mod services;
mod state;
mod terminal;

use config::AppConfig;
use dao::quiz_repository::json_file::JsonFileRepository;
use services::{
    generator::QuizGenerator,
    plot::SvgHistogramPlotter,
    session_service::{Session, SessionSettings},
};
use terminal::TerminalRenderer;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the key may come from the real environment.
    dotenv::dotenv().ok();
    init_tracing();

    let config = AppConfig::load();
    let generator = build_generator(&config)?;

    let repository = JsonFileRepository::new(&config.store_path);
    info!(store = %repository.path().display(), "using quiz store");

    let mut session = Session::start(
        Arc::new(repository),
        generator,
        Arc::new(SvgHistogramPlotter::new(&config.plot_dir)),
        Box::new(TerminalRenderer::stdout()),
        SessionSettings {
            generation_timeout: config.generator.timeout,
            retry: config.retry,
        },
    )
    .await
    .context("starting session")?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while !session.is_finished() {
        let Some(line) = lines.next_line().await.context("reading input")? else {
            break;
        };
        for event in terminal::parse_line(session.machine().stage(), &line) {
            if let Err(err) = session.handle(event).await {
                if err.is_fatal() {
                    return Err(err).context("session aborted");
                }
                error!(error = %err, "input could not be handled");
            }
        }
    }

    session
        .flush_pending()
        .await
        .context("saving the last result before exit")?;

    info!(session = %session.id(), "session closed");
    Ok(())
}

/// Build the Mistral-backed generator from the config and `MISTRAL_API_KEY`.
#[cfg(feature = "mistral")]
fn build_generator(config: &AppConfig) -> anyhow::Result<Arc<dyn QuizGenerator>> {
    use services::generator::{MistralConfig, MistralGenerator};

    let settings = MistralConfig::from_env()
        .context("configuring the quiz generator")?
        .with_base_url(&config.generator.base_url)
        .with_model(&config.generator.model);
    let generator = MistralGenerator::new(settings).context("building the quiz generator")?;
    Ok(Arc::new(generator))
}

#[cfg(not(feature = "mistral"))]
fn build_generator(_config: &AppConfig) -> anyhow::Result<Arc<dyn QuizGenerator>> {
    anyhow::bail!("no quiz generator backend compiled in; enable the `mistral` feature")
}

/// Configure tracing subscribers; logs go to stderr so they stay out of the game screen.
fn init_tracing() {
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
