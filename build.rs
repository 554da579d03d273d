use std::fs;
use std::path::Path;
use serde::Deserialize;

#[derive(Deserialize)]
struct Config {
    application: Application,
    gemini: Gemini,
    huggingface: HuggingFace,
    audio: Audio,
    network: Network,
}

#[derive(Deserialize)]
struct Application {
    name: String,
    version: String,
}

#[derive(Deserialize)]
struct Gemini {
    endpoint: String,
    model: String,
    tts_model: String,
    tts_voice: String,
}

#[derive(Deserialize)]
struct HuggingFace {
    model_url: String,
    steps: u32,
    guidance_scale: f32,
}

#[derive(Deserialize)]
struct Audio {
    enabled: bool,
    sample_rate: u32,
    channels: u16,
    playback_device: String,
    period_size: usize,
}

#[derive(Deserialize)]
struct Network {
    request_timeout_secs: u64,
}

// 在编译时读取 config.toml 并设置环境变量
fn main() {
    println!("cargo:rerun-if-changed=config.toml");

    let config_path = Path::new("config.toml");
    if !config_path.exists() {
        panic!("config.toml not found!");
    }

    let config_str = fs::read_to_string(config_path).expect("Failed to read config.toml");
    let config: Config = toml::from_str(&config_str).expect("Failed to parse config.toml");

    println!("cargo:rustc-env=APP_NAME={}", config.application.name);
    println!("cargo:rustc-env=APP_VERSION={}", config.application.version);

    // Gemini
    println!("cargo:rustc-env=GEMINI_ENDPOINT={}", config.gemini.endpoint);
    println!("cargo:rustc-env=GEMINI_MODEL={}", config.gemini.model);
    println!("cargo:rustc-env=GEMINI_TTS_MODEL={}", config.gemini.tts_model);
    println!("cargo:rustc-env=GEMINI_TTS_VOICE={}", config.gemini.tts_voice);

    // Hugging Face
    println!("cargo:rustc-env=HF_MODEL_URL={}", config.huggingface.model_url);
    println!("cargo:rustc-env=HF_STEPS={}", config.huggingface.steps);
    println!("cargo:rustc-env=HF_GUIDANCE_SCALE={}", config.huggingface.guidance_scale);

    // 音频配置
    println!("cargo:rustc-env=AUDIO_ENABLED={}", config.audio.enabled);
    println!("cargo:rustc-env=AUDIO_SAMPLE_RATE={}", config.audio.sample_rate);
    println!("cargo:rustc-env=AUDIO_CHANNELS={}", config.audio.channels);
    println!("cargo:rustc-env=AUDIO_PLAYBACK_DEVICE={}", config.audio.playback_device);
    println!("cargo:rustc-env=AUDIO_PERIOD_SIZE={}", config.audio.period_size);

    // 网络配置
    println!("cargo:rustc-env=REQUEST_TIMEOUT_SECS={}", config.network.request_timeout_secs);
}
