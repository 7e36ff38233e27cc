use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::commands::record::RecordOverrides;
use crate::config::Resolution;

#[derive(Parser)]
#[command(name = "metroflow")]
#[command(author, version, about)]
#[command(long_about = "An animated traffic diagram editor.\n\n\
    Draw shapes, connect them with metro-style routed links and watch\n\
    traffic signals flow along them.\n\n\
    Examples:\n  \
    metroflow                          Open the starter diagram (fullscreen)\n  \
    metroflow net.json --windowed      Edit a diagram in a window\n  \
    metroflow net.json --watch         Reload when the file changes on disk\n  \
    metroflow record net.json -o out   Render 1080p PNG frames of the animation\n  \
    metroflow paths net.json           Print the routed SVG path of every link")]
#[command(propagate_version = true)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Diagram file to open (JSON)
    pub file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Launch in a window instead of fullscreen
    #[arg(long, global = false)]
    pub windowed: bool,

    /// Reload the diagram when the file changes on disk
    #[arg(long, global = false)]
    pub watch: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Record the traffic animation as numbered PNG frames
    Record {
        /// Diagram file to record
        file: PathBuf,

        /// Output directory for PNG files
        #[arg(short, long, default_value = "frames")]
        output_dir: PathBuf,

        /// Frames per second of simulated time (10-60)
        #[arg(long)]
        fps: Option<u32>,

        /// Number of frames to capture
        #[arg(long)]
        frames: Option<u32>,

        /// Output resolution
        #[arg(long, value_enum)]
        resolution: Option<Resolution>,

        /// Seed for traffic spawning, for reproducible recordings
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Print the routed SVG path of every link in a diagram
    Paths {
        /// Diagram file to route
        file: PathBuf,

        /// Corner radius override (0-100)
        #[arg(long)]
        radius: Option<f32>,
    },

    /// View and modify configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Display the effective configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g. defaults.corner_radius, recording.fps, style.link.color)
        key: String,

        /// Value to set
        value: String,
    },
}

#[derive(Clone, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        match self.command {
            Some(Commands::Record {
                file,
                output_dir,
                fps,
                frames,
                resolution,
                seed,
            }) => {
                if !file.exists() {
                    anyhow::bail!("File not found: {}", file.display());
                }
                let overrides = RecordOverrides {
                    fps,
                    frames,
                    resolution,
                    seed,
                };
                crate::commands::record::run(file, output_dir, overrides)
            }
            Some(Commands::Paths { file, radius }) => {
                if !file.exists() {
                    anyhow::bail!("File not found: {}", file.display());
                }
                crate::commands::paths::run(file, radius)
            }
            Some(Commands::Config { command }) => crate::commands::config::run(command),
            Some(Commands::Completion { shell }) => {
                crate::commands::completion::run(shell);
                Ok(())
            }
            Some(Commands::Version) => {
                print_version();
                Ok(())
            }
            None => {
                if let Some(file) = &self.file {
                    if !file.exists() {
                        anyhow::bail!("File not found: {}", file.display());
                    }
                }
                crate::app::run(self.file, self.windowed, self.watch)
            }
        }
    }
}

fn print_version() {
    use colored::Colorize;
    println!(
        "{} {}",
        "metroflow".cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{}", env!("CARGO_PKG_DESCRIPTION").dimmed());
}
