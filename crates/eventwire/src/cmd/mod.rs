use clap::{Args, Subcommand};
use eventwire_transport::Address;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod emit;
pub mod listen;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Listen for connections and print every received event.
    Listen(ListenArgs),
    /// Connect, emit one event and close.
    Emit(EmitArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Listen(args) => listen::run(args, format),
        Command::Emit(args) => emit::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Address to bind: a socket path, `unix:<path>`, `tcp://host:port` or a bare port.
    pub address: Address,
    /// Exit after printing N events.
    #[arg(long)]
    pub count: Option<usize>,
    /// Only print these events (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub event: Option<Vec<String>>,
}

#[derive(Args, Debug)]
pub struct EmitArgs {
    /// Address to connect to: a socket path, `unix:<path>`, `tcp://host:port` or a bare port.
    pub address: Address,
    /// Event name.
    pub event: String,
    /// All arguments as one JSON array.
    #[arg(long, value_name = "JSON_ARRAY", conflicts_with = "arg")]
    pub args: Option<String>,
    /// One JSON argument; repeat for more.
    #[arg(long, value_name = "JSON")]
    pub arg: Vec<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build information.
    #[arg(long)]
    pub extended: bool,
}
