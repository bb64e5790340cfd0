//! The line protocol: one ASCII command per newline-terminated line,
//! space-separated fields, one reply line per command.

/// A parsed client command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Produce {
        topic: String,
        partition: u32,
        body: Vec<u8>,
    },
    Consume {
        topic: String,
        partition: u32,
    },
    Ack {
        topic: String,
        partition: u32,
        id: String,
    },
}

/// Why a request line could not be parsed. The `Display` form is the reason
/// sent back to the client after `ERROR: `.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("PRODUCE command requires a topic, partition, and a message")]
    ProduceArity,

    #[error("CONSUME command requires a topic and partition")]
    ConsumeArity,

    #[error("ACK command requires a topic, partition, and a message ID")]
    AckArity,

    #[error("Invalid partition ID")]
    InvalidPartition,

    #[error("Unknown command '{0}'")]
    UnknownCommand(String),
}

/// Parse one request line (newline already stripped).
pub fn parse(line: &str) -> Result<Command, ParseError> {
    let line = line.trim();
    let command = line.split(' ').next().unwrap_or("");

    match command {
        "PRODUCE" => {
            // The body is everything after the third field, spaces preserved.
            let mut fields = line.splitn(4, ' ');
            fields.next();
            match (fields.next(), fields.next(), fields.next()) {
                (Some(topic), Some(partition), Some(body)) => Ok(Command::Produce {
                    topic: topic.to_string(),
                    partition: parse_partition(partition)?,
                    body: body.as_bytes().to_vec(),
                }),
                _ => Err(ParseError::ProduceArity),
            }
        }
        "CONSUME" => {
            let fields: Vec<&str> = line.split(' ').collect();
            if fields.len() < 3 {
                return Err(ParseError::ConsumeArity);
            }
            Ok(Command::Consume {
                topic: fields[1].to_string(),
                partition: parse_partition(fields[2])?,
            })
        }
        "ACK" => {
            let fields: Vec<&str> = line.split(' ').collect();
            if fields.len() < 4 {
                return Err(ParseError::AckArity);
            }
            Ok(Command::Ack {
                topic: fields[1].to_string(),
                partition: parse_partition(fields[2])?,
                id: fields[3].to_string(),
            })
        }
        other => Err(ParseError::UnknownCommand(other.to_string())),
    }
}

fn parse_partition(field: &str) -> Result<u32, ParseError> {
    field.parse().map_err(|_| ParseError::InvalidPartition)
}
