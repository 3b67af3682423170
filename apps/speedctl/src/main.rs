use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use client_core::{AudioUpload, ProcessingClient, DEFAULT_SERVER_URL};
use shared::{
    domain::{ControlId, ControlSet},
    error::ControlError,
    instruction,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

const NO_MODIFICATIONS: &str = "No modifications selected";

#[derive(Parser, Debug)]
#[command(name = "speedctl", about = "Speed up or slow down audio through a processing service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a file with the configured adjustments and save the result.
    Process {
        file: PathBuf,
        #[command(flatten)]
        server: ServerArgs,
        #[command(flatten)]
        controls: ControlArgs,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Print the instruction string for the configured adjustments.
    Encode {
        #[command(flatten)]
        controls: ControlArgs,
    },
    /// Parse an instruction string and print its adjustments as JSON.
    Decode { instruction: String },
    /// Check that the processing service is up.
    Health {
        #[command(flatten)]
        server: ServerArgs,
    },
}

#[derive(Args, Debug)]
struct ServerArgs {
    #[arg(long, env = "SPEEDCTL_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    server_url: String,
}

/// Controls 1 and 2 slow down, 3 and 4 speed up; all preserve pitch unless
/// listed in `--no-pitch`.
#[derive(Args, Debug, Default)]
struct ControlArgs {
    /// Set a control's percentage, e.g. `--set 2=25`.
    #[arg(long = "set", value_name = "ID=PCT", value_parser = parse_setting)]
    settings: Vec<ControlSetting>,
    /// Let control ID change pitch along with speed.
    #[arg(long = "no-pitch", value_name = "ID")]
    no_pitch: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ControlSetting {
    id: u32,
    value: u32,
}

fn parse_setting(raw: &str) -> Result<ControlSetting, String> {
    let (id, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected ID=PCT, got '{raw}'"))?;
    let id = id
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid control id '{id}'"))?;
    let value = value
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid percentage '{value}'"))?;
    Ok(ControlSetting { id, value })
}

impl ControlArgs {
    fn to_control_set(&self) -> Result<ControlSet, ControlError> {
        let mut set = ControlSet::default();
        for setting in &self.settings {
            set.set_value(ControlId(setting.id), setting.value)?;
        }
        for &id in &self.no_pitch {
            set.set_pitch(ControlId(id), false)?;
        }
        Ok(set)
    }
}

fn render_instructions(set: &ControlSet) -> String {
    let instructions = set.instructions();
    if instructions.is_empty() {
        NO_MODIFICATIONS.to_string()
    } else {
        instructions
    }
}

fn decode_to_json(raw: &str) -> Result<String> {
    let adjustments = instruction::decode(raw)?;
    Ok(serde_json::to_string_pretty(&adjustments)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    match cli.command {
        Command::Process {
            file,
            server,
            controls,
            out_dir,
        } => {
            let set = controls.to_control_set()?;
            let client = ProcessingClient::new(&server.server_url)?;
            let upload = AudioUpload::from_path(&file).await?;
            info!(file = %file.display(), instructions = %set.instructions(), "processing");
            let processed = client.process(upload, set.controls()).await?;
            let saved = processed
                .save_into(&out_dir)
                .await
                .with_context(|| format!("saving into '{}'", out_dir.display()))?;
            println!("{}", saved.display());
        }
        Command::Encode { controls } => {
            let set = controls.to_control_set()?;
            println!("{}", render_instructions(&set));
        }
        Command::Decode { instruction } => {
            println!("{}", decode_to_json(&instruction)?);
        }
        Command::Health { server } => {
            let client = ProcessingClient::new(&server.server_url)?;
            let health = client.health().await?;
            println!("{}", health.status);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controls_from(args: &[&str]) -> ControlArgs {
        let cli = Cli::try_parse_from(["speedctl", "encode"].iter().chain(args)).expect("parse");
        match cli.command {
            Command::Encode { controls } => controls,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn encode_without_settings_reports_no_modifications() {
        let set = controls_from(&[]).to_control_set().expect("set");
        assert_eq!(render_instructions(&set), NO_MODIFICATIONS);
    }

    #[test]
    fn settings_and_pitch_flags_map_onto_default_slots() {
        let set = controls_from(&["--set", "2=25", "--set", "4=80", "--no-pitch", "2"])
            .to_control_set()
            .expect("set");
        assert_eq!(render_instructions(&set), "SLOW:25:NOPITCH;SPEED:80:PITCH;");
    }

    #[test]
    fn out_of_range_percentage_is_rejected() {
        let err = controls_from(&["--set", "1=150"])
            .to_control_set()
            .expect_err("range");
        assert!(matches!(err, ControlError::ValueOutOfRange { value: 150, .. }));
    }

    #[test]
    fn unknown_slot_is_rejected() {
        let err = controls_from(&["--no-pitch", "7"])
            .to_control_set()
            .expect_err("unknown");
        assert_eq!(err, ControlError::UnknownControl(7));
    }

    #[test]
    fn malformed_setting_fails_to_parse() {
        assert!(Cli::try_parse_from(["speedctl", "encode", "--set", "2"]).is_err());
        assert!(Cli::try_parse_from(["speedctl", "encode", "--set", "x=5"]).is_err());
        assert!(Cli::try_parse_from(["speedctl", "encode", "--set", "1=-5"]).is_err());
    }

    #[test]
    fn process_defaults_server_url_and_out_dir() {
        let cli = Cli::try_parse_from(["speedctl", "process", "song.wav"]).expect("parse");
        match cli.command {
            Command::Process {
                file,
                server,
                out_dir,
                ..
            } => {
                assert_eq!(file, PathBuf::from("song.wav"));
                assert_eq!(out_dir, PathBuf::from("."));
                if std::env::var_os("SPEEDCTL_SERVER_URL").is_none() {
                    assert_eq!(server.server_url, DEFAULT_SERVER_URL);
                }
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn decode_prints_triples_as_json() {
        let json = decode_to_json("SLOW:25:NOPITCH;").expect("decode");
        let value: serde_json::Value = serde_json::from_str(&json).expect("json");
        assert_eq!(value[0]["type"], "SLOW");
        assert_eq!(value[0]["value"], 25);
        assert_eq!(value[0]["pitch_preserved"], false);
    }

    #[test]
    fn decode_rejects_malformed_instruction() {
        let err = decode_to_json("SLOW:10").expect_err("malformed");
        assert!(err.to_string().contains("malformed instruction"));
    }
}
