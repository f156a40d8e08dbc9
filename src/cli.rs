use crate::assistant::AdvisorConfig;
use crate::cloak::DEFAULT_CAPTURE_DELAY;
use crate::matcher::{
    DEFAULT_HUE_TOLERANCE, DEFAULT_LIGHTNESS_FLOOR, DEFAULT_SATURATION_FLOOR, DEFAULT_TARGET_HUE,
    ThresholdConfig,
};
use clap::Parser;
use std::time::Duration;

/// Invisibility cloak: capture the empty room, then anything of the target colour
/// shows the room through it.
#[derive(Debug, Parser)]
#[command(name = "invisibility-cloak")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Camera index (0 = default webcam)
    #[arg(long, default_value_t = 0)]
    pub camera: u32,

    /// Requested frame width
    #[arg(long, default_value_t = 640)]
    pub width: u32,

    /// Requested frame height
    #[arg(long, default_value_t = 480)]
    pub height: u32,

    /// Requested camera frame rate
    #[arg(long, default_value_t = 30)]
    pub fps: u32,

    /// Hue to make invisible, in degrees (0 red, 120 green, 240 blue)
    #[arg(long, default_value_t = DEFAULT_TARGET_HUE, allow_negative_numbers = true)]
    pub target_hue: f64,

    /// How far (degrees) a hue may be from the target and still count
    #[arg(long, default_value_t = DEFAULT_HUE_TOLERANCE)]
    pub hue_tolerance: f64,

    /// Minimum saturation (percent) for a pixel to be keyed
    #[arg(long, default_value_t = DEFAULT_SATURATION_FLOOR)]
    pub saturation_floor: f64,

    /// Minimum lightness (percent) for a pixel to be keyed
    #[arg(long, default_value_t = DEFAULT_LIGHTNESS_FLOOR)]
    pub lightness_floor: f64,

    /// Pause between pressing capture and grabbing the background
    #[arg(long, default_value_t = DEFAULT_CAPTURE_DELAY.as_millis() as u64)]
    pub capture_delay_ms: u64,

    /// Show the camera image unflipped
    #[arg(long)]
    pub no_mirror: bool,

    /// Composite on one thread instead of splitting rows across cores
    #[arg(long)]
    pub sequential: bool,

    /// API key for the scene assistant
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    /// Model used by the scene assistant
    #[arg(long, default_value = "gemini-2.5-flash")]
    pub gemini_model: String,

    /// Base URL of the generative language API
    #[arg(long, default_value = "https://generativelanguage.googleapis.com/v1beta")]
    pub gemini_base_url: String,
}

impl Args {
    pub fn threshold_config(&self) -> ThresholdConfig {
        ThresholdConfig::new()
            .with_target_hue(self.target_hue)
            .with_hue_tolerance(self.hue_tolerance)
            .with_saturation_floor(self.saturation_floor)
            .with_lightness_floor(self.lightness_floor)
            .normalized()
    }

    pub fn capture_delay(&self) -> Duration {
        Duration::from_millis(self.capture_delay_ms)
    }

    pub fn advisor_config(&self) -> AdvisorConfig {
        let config = AdvisorConfig::default()
            .with_model(self.gemini_model.as_str())
            .with_base_url(self.gemini_base_url.as_str());
        match self.gemini_api_key.as_deref().filter(|k| !k.is_empty()) {
            Some(key) => config.with_api_key(key.to_string()),
            None => config,
        }
    }
}
