use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Serialize, Clone)]
pub struct Config {
    pub app_name: &'static str,
    pub app_version: &'static str,

    // Gemini 文本与语音
    pub gemini_endpoint: &'static str,
    pub gemini_model: &'static str,
    pub gemini_tts_model: &'static str,
    pub gemini_tts_voice: &'static str,

    // Hugging Face 图像生成
    pub hf_model_url: &'static str,
    pub hf_steps: u32,
    pub hf_guidance_scale: f32,

    // 音频
    pub audio_enabled: bool,
    pub audio_sample_rate: u32,
    pub audio_channels: u16,
    pub audio_playback_device: &'static str,
    pub audio_period_size: usize,

    pub request_timeout_secs: u64,

    // 运行时从环境变量读取，不经过 config.toml
    #[serde(skip_serializing)]
    pub gemini_api_key: Option<String>,
    #[serde(skip_serializing)]
    pub huggingface_api_key: Option<String>,
}

impl Config {
    /// Build the configuration from the variables `build.rs` exported out of
    /// `config.toml`. API keys start empty; see [`Config::with_env_credentials`].
    pub fn new() -> Result<Self, &'static str> {
        Ok(Self {
            app_name: env!("APP_NAME"),
            app_version: env!("APP_VERSION"),

            gemini_endpoint: env!("GEMINI_ENDPOINT"),
            gemini_model: env!("GEMINI_MODEL"),
            gemini_tts_model: env!("GEMINI_TTS_MODEL"),
            gemini_tts_voice: env!("GEMINI_TTS_VOICE"),

            hf_model_url: env!("HF_MODEL_URL"),
            hf_steps: env!("HF_STEPS")
                .parse()
                .map_err(|_| "Failed to parse HF_STEPS")?,
            hf_guidance_scale: env!("HF_GUIDANCE_SCALE")
                .parse()
                .map_err(|_| "Failed to parse HF_GUIDANCE_SCALE")?,

            audio_enabled: env!("AUDIO_ENABLED")
                .parse()
                .map_err(|_| "Failed to parse AUDIO_ENABLED")?,
            audio_sample_rate: env!("AUDIO_SAMPLE_RATE")
                .parse()
                .map_err(|_| "Failed to parse AUDIO_SAMPLE_RATE")?,
            audio_channels: env!("AUDIO_CHANNELS")
                .parse()
                .map_err(|_| "Failed to parse AUDIO_CHANNELS")?,
            audio_playback_device: env!("AUDIO_PLAYBACK_DEVICE"),
            audio_period_size: env!("AUDIO_PERIOD_SIZE")
                .parse()
                .map_err(|_| "Failed to parse AUDIO_PERIOD_SIZE")?,

            request_timeout_secs: env!("REQUEST_TIMEOUT_SECS")
                .parse()
                .map_err(|_| "Failed to parse REQUEST_TIMEOUT_SECS")?,

            gemini_api_key: None,
            huggingface_api_key: None,
        })
    }

    /// Pick up `GEMINI_API_KEY` and `HUGGINGFACE_API_KEY` from the process
    /// environment. Empty values count as missing.
    pub fn with_env_credentials(mut self) -> Self {
        self.gemini_api_key = read_secret("GEMINI_API_KEY");
        self.huggingface_api_key = read_secret("HUGGINGFACE_API_KEY");
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if self.audio_channels == 0 {
            return Err("audio.channels must be at least 1");
        }
        if self.audio_sample_rate == 0 {
            return Err("audio.sample_rate must be positive");
        }
        if self.audio_period_size == 0 {
            return Err("audio.period_size must be positive");
        }
        Ok(())
    }
}

fn read_secret(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Default for Config {
    fn default() -> Self {
        Self::new().expect("Failed to create default Config from build-time environment variables")
    }
}
