use clap::Parser;
use std::path::PathBuf;

use webtexture_config::{BridgeConfig, DEFAULT_HEIGHT, DEFAULT_WIDTH};

#[derive(Parser, Debug)]
#[command(name = "webtexture")]
#[command(version)]
#[command(about = "Drive an offscreen browser surface and save its last frame", long_about = None)]
pub struct Args {
    /// Surface width
    #[arg(long, default_value_t = DEFAULT_WIDTH)]
    pub width: u32,

    /// Surface height
    #[arg(long, default_value_t = DEFAULT_HEIGHT)]
    pub height: u32,

    /// Page to load
    #[arg(short, long, default_value = "https://example.com/")]
    pub url: String,

    /// How long to keep polling frames
    #[arg(short, long, default_value_t = 2.0)]
    pub seconds: f64,

    /// Where to write the last captured frame
    #[arg(short, long, default_value = "webtexture.png")]
    pub output: PathBuf,

    /// JSON bridge configuration; WEBTEXTURE_* variables apply when absent
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, action)]
    pub verbose: bool,
}

impl Args {
    pub fn load_config(&self) -> Result<BridgeConfig, Box<dyn std::error::Error>> {
        match &self.config {
            Some(path) => {
                let json = std::fs::read_to_string(path)?;
                Ok(BridgeConfig::from_json(&json)?)
            }
            None => Ok(BridgeConfig::from_env()),
        }
    }
}
