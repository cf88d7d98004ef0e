use std::io::Write as _;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use hie_hl7::{AdtCodec, AdtMessage};
use hie_xds::{select_transport, SubmissionRequest, TransportArtifact, XdsCodec};

#[derive(Parser)]
#[command(name = "hie")]
#[command(about = "HIE mapper CLI: convert between JSON, HL7 v2.5.1 and ITI-41 ebXML")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode an ADT JSON file to HL7
    JsonToHl7 {
        /// Path to the AdtMessage JSON file
        input: PathBuf,
    },
    /// Decode an HL7 message file to JSON
    Hl7ToJson {
        /// Path to the HL7 message file
        input: PathBuf,
    },
    /// Encode a submission JSON file to an ITI-41 envelope (or MTOM multipart)
    JsonToIti41 {
        /// Path to the SubmissionRequest JSON file
        input: PathBuf,
    },
    /// Decode an ITI-41 ebXML file to JSON
    Iti41ToJson {
        /// Path to the ebXML file
        input: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::JsonToHl7 { input } => {
            let message: AdtMessage = serde_json::from_str(&std::fs::read_to_string(input)?)?;
            let hl7 = AdtCodec::new().encode(&message)?;
            println!("{hl7}");
        }
        Commands::Hl7ToJson { input } => {
            let text = std::fs::read_to_string(input)?;
            let decoded = AdtCodec::new().decode(&text);
            println!("{}", serde_json::to_string_pretty(&decoded)?);
        }
        Commands::JsonToIti41 { input } => {
            let mut request: SubmissionRequest =
                serde_json::from_str(&std::fs::read_to_string(input)?)?;
            request.validate()?;
            let xml = XdsCodec::new().encode(&request)?;
            match select_transport(xml, &request) {
                TransportArtifact::Inline(xml) => println!("{xml}"),
                TransportArtifact::Multipart(package) => {
                    // Multipart bodies carry raw binary; write them without
                    // any text re-encoding.
                    eprintln!("Content-Type: {}", package.content_type);
                    std::io::stdout().write_all(&package.body)?;
                }
            }
        }
        Commands::Iti41ToJson { input } => {
            let xml = std::fs::read_to_string(input)?;
            let summary = XdsCodec::new().decode(&xml)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}
