//! rwlog CLI Client
//!
//! Command-line interface for reading and writing the rwlog message log.

use std::io::{self, BufRead, Write};
use std::process;

use clap::{Parser, Subcommand};
use rwlog::client::{read_snapshot, WriterClient};

/// rwlog CLI
#[derive(Parser, Debug)]
#[command(name = "rwlog-cli")]
#[command(about = "CLI for the rwlog message log")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print every message in the log
    Read,

    /// Interactive writer: each stdin line is sent as one command
    /// (`start`, `stop`, message text, `exit`)
    Write,

    /// Write messages in one locked session (start, messages, stop, exit)
    Send {
        /// Messages to append
        #[arg(required = true)]
        messages: Vec<String>,
    },
}

fn main() {
    let args = Args::parse();

    let result = match args.command {
        Commands::Read => read(&args.server),
        Commands::Write => interactive(&args.server),
        Commands::Send { messages } => send(&args.server, &messages),
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn read(server: &str) -> rwlog::Result<()> {
    let snapshot = read_snapshot(server)?;
    println!("--- Chat Messages ---");
    print!("{}", snapshot);
    Ok(())
}

fn interactive(server: &str) -> rwlog::Result<()> {
    let mut client = WriterClient::connect(server)?;
    println!("You are Writer. Type 'start' to lock, 'stop' to unlock, 'exit' to quit.");

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let command = line.trim_end_matches(['\r', '\n']);
        if command.is_empty() {
            continue;
        }
        if command == "exit" {
            break;
        }

        print!("{}", client.request(command)?);
    }

    client.exit()
}

fn send(server: &str, messages: &[String]) -> rwlog::Result<()> {
    let mut client = WriterClient::connect(server)?;
    print!("{}", client.start()?);
    for message in messages {
        print!("{}", client.send(message)?);
    }
    print!("{}", client.stop()?);
    client.exit()
}
