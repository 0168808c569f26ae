use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "sb3doc-rs",
    about = "Inspect and edit Scratch 3 (.sb3) project archives."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print targets, assets and data of an archive.
    Inspect {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },

    /// Load and save an archive without edits.
    Resave {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
    },

    /// Add an .svg or .png file as a costume.
    AddCostume {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
        #[arg(long, help = "Sprite name, or 'Stage' for a backdrop.")]
        target: String,
        #[arg(long, value_name = "FILE")]
        file: PathBuf,
        #[arg(long, help = "Costume name; defaults to the file stem.")]
        name: Option<String>,
    },

    /// Add a .wav file as a sound.
    AddSound {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
        #[arg(long, help = "Sprite name, or 'Stage'.")]
        target: String,
        #[arg(long, value_name = "FILE")]
        file: PathBuf,
        #[arg(long, help = "Sound name; defaults to the file stem.")]
        name: Option<String>,
    },

    /// Add an empty sprite on top of the existing layers.
    CreateSprite {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
        #[arg(long)]
        name: String,
    },
}
