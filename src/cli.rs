use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tonesteer", about = "Content-aware adaptive equalizer")]
pub struct Cli {
    /// Audio file replayed as the loopback stream (WAV, MP3, FLAC, OGG)
    pub input: Option<PathBuf>,

    /// Config file (default: tonesteer.toml or the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Detection script (JSON) played back as classifier output
    #[arg(short, long)]
    pub detections: Option<PathBuf>,

    /// Write the EqualizerAPO config here on every EQ change
    #[arg(short = 'o', long)]
    pub eq_output: Option<PathBuf>,

    /// Starting EQ state (JSON); defaults to ten flat bands
    #[arg(long)]
    pub baseline: Option<PathBuf>,

    /// Profile catalog (TOML) replacing the built-in one
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Seconds to stay enabled before restoring the baseline
    #[arg(long, default_value_t = 30.0)]
    pub run_for: f32,

    /// Seconds of audio per classification
    #[arg(long, default_value_t = 4.0)]
    pub analysis_window: f32,

    /// Seconds a candidate profile must persist before switching
    #[arg(long, default_value_t = 10.0)]
    pub hysteresis: f64,

    /// Minimum seconds between profile switches
    #[arg(long, default_value_t = 12.0)]
    pub cooldown: f64,

    /// Classification poll interval in milliseconds
    #[arg(long, default_value_t = 100)]
    pub poll_ms: u64,

    /// Print the final EQ state as JSON on exit
    #[arg(long)]
    pub print_state: bool,

    /// List available profiles and exit
    #[arg(long)]
    pub list_profiles: bool,
}
