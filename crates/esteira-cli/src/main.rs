use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::process;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "esteira", about = "Esteira message broker CLI")]
struct Cli {
    /// Broker address
    #[arg(long, default_value = "localhost:3000", global = true)]
    addr: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Append a message to a (topic, partition)
    Produce {
        topic: String,

        /// Partition id (non-negative)
        partition: u32,

        /// Message body; multiple words are joined with single spaces
        #[arg(required = true)]
        message: Vec<String>,
    },

    /// Pull one message, print its body, and acknowledge it
    Consume {
        topic: String,

        /// Partition id (non-negative)
        partition: u32,
    },

    /// Acknowledge a message by id
    Ack {
        topic: String,

        /// Partition id (non-negative)
        partition: u32,

        /// Message id returned by consume
        id: String,
    },
}

fn main() {
    let cli = Cli::parse();
    let mut conn = Connection::open(&cli.addr);

    match cli.command {
        Commands::Produce {
            topic,
            partition,
            message,
        } => {
            let reply = conn.round_trip(&format!(
                "PRODUCE {topic} {partition} {}",
                message.join(" ")
            ));
            println!("{reply}");
            if reply != "OK" {
                process::exit(1);
            }
        }
        Commands::Consume { topic, partition } => {
            let reply = conn.round_trip(&format!("CONSUME {topic} {partition}"));
            if reply == "No messages in queue" {
                println!("{reply}");
                return;
            }
            if reply.starts_with("ERROR:") {
                eprintln!("{reply}");
                process::exit(1);
            }
            let Some((id, body)) = reply.split_once(' ') else {
                eprintln!("Error: invalid message format from server: {reply}");
                process::exit(1);
            };
            println!("{body}");

            let ack = conn.round_trip(&format!("ACK {topic} {partition} {id}"));
            if ack != "ACK_OK" {
                eprintln!("Error: did not receive ACK_OK, got: {ack}");
                process::exit(1);
            }
        }
        Commands::Ack {
            topic,
            partition,
            id,
        } => {
            let reply = conn.round_trip(&format!("ACK {topic} {partition} {id}"));
            println!("{reply}");
            if reply != "ACK_OK" {
                process::exit(1);
            }
        }
    }
}

/// One TCP connection to the broker, command out / reply line in.
struct Connection {
    writer: TcpStream,
    reader: BufReader<TcpStream>,
}

impl Connection {
    fn open(addr: &str) -> Self {
        let writer = match TcpStream::connect(addr) {
            Ok(stream) => stream,
            Err(e) => {
                eprintln!("Error: cannot connect to broker at {addr}: {e}");
                process::exit(1);
            }
        };
        let reader = match writer.try_clone() {
            Ok(stream) => BufReader::new(stream),
            Err(e) => {
                eprintln!("Error: failed to set up connection: {e}");
                process::exit(1);
            }
        };
        Self { writer, reader }
    }

    fn round_trip(&mut self, line: &str) -> String {
        if let Err(e) = writeln!(self.writer, "{line}") {
            eprintln!("Error: failed to send command: {e}");
            process::exit(1);
        }
        let mut reply = String::new();
        match self.reader.read_line(&mut reply) {
            Ok(0) => {
                eprintln!("Error: broker closed the connection");
                process::exit(1);
            }
            Ok(_) => reply.trim_end().to_string(),
            Err(e) => {
                eprintln!("Error: failed to read reply: {e}");
                process::exit(1);
            }
        }
    }
}
