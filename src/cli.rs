use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "timetable-ics")]
#[command(version)]
#[command(about = "Convert colour-coded timetable spreadsheets into ICS calendars", long_about = None)]
pub struct Cli {
    /// JSON settings file (environment variables take precedence)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the Telegram bot together with the health check endpoint
    Serve,

    /// Convert a local .xlsx timetable
    Convert {
        /// Timetable workbook
        input: PathBuf,

        /// Output path (defaults to `<timetable name>.ics`, or stdout with --json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the parsed timetable as JSON instead of ICS
        #[arg(long)]
        json: bool,
    },
}
