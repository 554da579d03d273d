mod audio;
mod config;
mod controller;
mod date;
mod error;
mod orchestrator;
mod providers;
mod render;
mod review;
mod state_machine;

use std::sync::Arc;

use audio::OutputBackend;
use config::Config;
use controller::{AudioFormat, PlaybackController};
use error::Error;
use orchestrator::ReviewOrchestrator;
use providers::{GeminiClient, GeminiDigest, GeminiTts, HuggingFaceImage, SilentTts, TtsProvider};
use review::PageState;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;

#[cfg(feature = "alsa-output")]
fn output_backend(config: &Config) -> Arc<dyn OutputBackend> {
    Arc::new(audio::AlsaBackend::new(
        config.audio_playback_device,
        config.audio_period_size,
    ))
}

#[cfg(not(feature = "alsa-output"))]
fn output_backend(config: &Config) -> Arc<dyn OutputBackend> {
    log::warn!(
        "Built without alsa-output, playback on \"{}\" will be silent",
        config.audio_playback_device
    );
    Arc::new(audio::NullBackend::realtime())
}

fn show(page: &PageState, player: &PlaybackController, config: &Config) {
    println!(
        "{}",
        render::render(page, player.state(), config.app_version)
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 可选
    dotenv::dotenv().ok();
    env_logger::init();

    let config = Config::new()
        .map_err(|e| Error::Config(e.to_string()))?
        .with_env_credentials();
    config
        .validate()
        .map_err(|e| Error::Config(e.to_string()))?;
    log::info!("{} {} starting, config: {}", config.app_name, config.app_version, serde_json::to_string(&config)?);

    if config.gemini_api_key.is_none() {
        log::warn!("GEMINI_API_KEY not set, the review cannot be generated");
    }

    // 客户端在进程生命周期内只创建一次
    let gemini = GeminiClient::from_config(&config)?;
    let digest = Arc::new(GeminiDigest::new(gemini.clone(), config.gemini_model));
    let image = Arc::new(HuggingFaceImage::from_config(&config)?);
    let tts: Arc<dyn TtsProvider> = if config.audio_enabled && gemini.has_key() {
        Arc::new(GeminiTts::new(
            gemini,
            config.gemini_tts_model,
            config.gemini_tts_voice,
        ))
    } else {
        Arc::new(SilentTts)
    };

    let orchestrator = ReviewOrchestrator::new(digest, image);
    let (mut player, mut rx_playback) = PlaybackController::new(
        tts,
        output_backend(&config),
        AudioFormat {
            sample_rate: config.audio_sample_rate,
            channels: config.audio_channels as usize,
            period_frames: config.audio_period_size,
        },
        config.request_timeout(),
    );

    let mut page = PageState::Loading;
    show(&page, &player, &config);
    page = orchestrator.load(&date::today_label()).await;
    show(&page, &player, &config);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                log::info!("Received Ctrl+C, shutting down...");
                break;
            }

            Some(event) = rx_playback.recv() => {
                player.handle_event(event);
                log::debug!("Playback state: {:?}", player.state());
            }

            line = lines.next_line() => {
                let cmd = match line {
                    Ok(Some(cmd)) => cmd,
                    Ok(None) => break,
                    Err(e) => {
                        log::error!("Failed to read stdin: {}", e);
                        break;
                    }
                };

                match cmd.trim() {
                    "a" => {
                        if let PageState::Ready(p) = &page {
                            player.toggle(&p.review.narration()).await;
                            show(&page, &player, &config);
                        } else {
                            println!("Aucune revue chargée.");
                        }
                    }
                    "r" => {
                        player.stop();
                        page = PageState::Loading;
                        show(&page, &player, &config);
                        page = orchestrator.load(&date::today_label()).await;
                        show(&page, &player, &config);
                    }
                    "q" => break,
                    "" => {}
                    other => println!("Commande inconnue : {} (a, r, q)", other),
                }
            }
        }
    }

    player.stop();
    Ok(())
}
