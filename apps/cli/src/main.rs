use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use client_core::AnalysisClient;

#[derive(Parser, Debug)]
#[command(about = "Command-line client for the image analysis backend")]
struct Args {
    #[arg(long, default_value = "http://127.0.0.1:8001")]
    server_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the backend is reachable.
    Status,
    /// Upload an image file and print its analysis.
    Analyze { path: PathBuf },
    /// List recent analyses, newest first.
    History,
    /// Print one stored analysis as JSON.
    Show { id: String },
    /// Delete a stored analysis.
    Delete { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();
    let client = AnalysisClient::new(args.server_url);

    match args.command {
        Command::Status => {
            let status = client.service_status().await?;
            println!("{}", status.message);
        }
        Command::Analyze { path } => {
            let record = client.analyze_path(&path).await?;
            println!("id: {}", record.id);
            println!("description: {}", record.description());
            if !record.objects_detected.is_empty() {
                println!("objects: {}", record.objects_detected.join(", "));
            }
            if record.has_text_found() {
                println!("text: {}", record.text_found);
            }
            if !record.emotions.is_empty() {
                println!("emotions: {}", record.emotions.join(", "));
            }
            if !record.scene_description.is_empty() {
                println!("scene: {}", record.scene_description);
            }
            if !record.confidence.is_empty() {
                println!("confidence: {}", record.confidence);
            }
        }
        Command::History => {
            let history = client.history().await?;
            if history.is_empty() {
                println!("No analyses yet.");
            }
            for record in history {
                println!(
                    "{}  {}  {}",
                    record.id,
                    record.timestamp.to_rfc3339(),
                    record.filename
                );
            }
        }
        Command::Show { id } => {
            let record = client.get(&id).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::Delete { id } => {
            let ack = client.delete(&id).await?;
            println!("{}", ack.message);
        }
    }

    Ok(())
}
