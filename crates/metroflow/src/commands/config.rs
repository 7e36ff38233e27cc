use anyhow::Result;
use colored::Colorize;

use crate::cli::ConfigCommands;
use crate::config::{Config, VALID_KEYS};

pub fn run(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Show => show(),
        ConfigCommands::Set { key, value } => set(&key, &value),
    }
}

fn show() -> Result<()> {
    let path = Config::path()?;
    let config = if path.exists() {
        println!("{} {}", "Config file:".bold(), path.display());
        Config::load_from(&path)?
    } else {
        println!(
            "{} {} {}",
            "Config file:".bold(),
            path.display(),
            "(not created yet, showing defaults)".dimmed()
        );
        Config::default()
    };
    println!();

    let entries = effective_values(&config);
    let width = entries.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    for (key, value) in entries {
        println!("  {}  {value}", format!("{key:width$}").cyan());
    }
    Ok(())
}

fn set(key: &str, value: &str) -> Result<()> {
    let mut config = Config::load_or_default();
    config.set(key, value)?;
    let path = config.save()?;
    println!("{} {key} = {value}", "Set".green().bold());
    eprintln!("  {}", format!("Saved to {}", path.display()).dimmed());
    Ok(())
}

/// Every settable key with the value the application will actually use.
fn effective_values(config: &Config) -> Vec<(&'static str, String)> {
    let recording = config.recording();
    let node = config.node_defaults();
    let link = config.link_defaults();

    VALID_KEYS
        .iter()
        .map(|&key| {
            let value = match key {
                "defaults.corner_radius" => config.corner_radius().to_string(),
                "defaults.global_speed" => config.global_speed().to_string(),
                "defaults.start_mode" => config.start_mode().to_string(),
                "recording.fps" => recording.fps.to_string(),
                "recording.frames" => recording.frames.to_string(),
                "recording.seed" => recording.seed.to_string(),
                "recording.resolution" => recording.resolution.to_string(),
                "style.node.fill" => node.style.fill.clone(),
                "style.node.border_color" => node.style.border_color.clone(),
                "style.node.border_width" => node.style.border_width.to_string(),
                "style.node.width" => node.width.to_string(),
                "style.node.height" => node.height.to_string(),
                "style.node.font_size" => node.style.font_size.to_string(),
                "style.node.label_color" => node.style.label_color.clone(),
                "style.link.color" => link.style.color.clone(),
                "style.link.width" => link.style.width.to_string(),
                "style.link.traffic_speed" => link.traffic_speed.to_string(),
                "style.link.traffic_density" => link.traffic_density.to_string(),
                "style.link.label_size" => link.style.label_size.to_string(),
                _ => String::from("?"),
            };
            (key, value)
        })
        .collect()
}
