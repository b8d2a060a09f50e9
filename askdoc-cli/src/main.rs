//! askdoc: command-line client for the askdoc HTTP API
//!
//! # Subcommands
//! - `upload <path>`             : upload a document for indexing
//! - `ask <pdf-id> <question>`   : ask a question about a document
//! - `list`                      : list uploaded documents
//! - `history <pdf-id>`          : show a document's Q/A history
//! - `delete <pdf-id>`           : remove a document and its history
//! - `status`                    : show server health

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Deserialize;

const DEFAULT_SERVER: &str = "http://127.0.0.1:8780";

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "askdoc",
    version,
    about = "Ask questions about uploaded documents"
)]
struct Cli {
    /// askdoc HTTP server URL (overrides ASKDOC_HTTP_URL env var)
    #[arg(long, env = "ASKDOC_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Upload a document and index it for questions
    Upload {
        /// Path to the document file
        path: PathBuf,
    },

    /// Ask a question about an uploaded document
    Ask {
        /// Document id returned by upload
        pdf_id: String,

        /// The question text
        question: String,
    },

    /// List uploaded documents
    List,

    /// Show the question/answer history for a document
    History {
        /// Document id returned by upload
        pdf_id: String,
    },

    /// Remove a document and its conversation history
    Delete {
        /// Document id returned by upload
        pdf_id: String,
    },

    /// Show askdoc server status
    Status,
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct UploadResponse {
    pdf_id: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct AskResponse {
    answer: String,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    pdfs: Vec<PdfEntry>,
}

#[derive(Debug, Deserialize)]
struct PdfEntry {
    pdf_id: String,
    filename: String,
    upload_date: String,
}

#[derive(Debug, Deserialize)]
struct ConversationResponse {
    conversation: Vec<ConversationEntry>,
}

#[derive(Debug, Deserialize)]
struct ConversationEntry {
    question: String,
    answer: String,
    timestamp: String,
}

// ============================================================================
// HTTP Client Calls
// ============================================================================

fn client(timeout_secs: u64) -> anyhow::Result<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()?)
}

fn fail_on_error_status(resp: reqwest::blocking::Response) -> reqwest::blocking::Response {
    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().unwrap_or_default();
        eprintln!("askdoc: server returned {}: {}", status, body);
        std::process::exit(1);
    }
    resp
}

fn do_upload(server: &str, path: &PathBuf) -> anyhow::Result<()> {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "untitled".to_string());
    let bytes = std::fs::read(path)?;

    let form = reqwest::blocking::multipart::Form::new().part(
        "file",
        reqwest::blocking::multipart::Part::bytes(bytes).file_name(filename.clone()),
    );

    // Whole-document embedding can take a while on large files
    let resp = client(300)?
        .post(format!("{}/upload_pdf", server))
        .multipart(form)
        .send()?;
    let resp = fail_on_error_status(resp);

    let upload: UploadResponse = resp.json()?;
    println!("{}", upload.message);
    println!("pdf_id: {}", upload.pdf_id);
    Ok(())
}

fn do_ask(server: &str, pdf_id: &str, question: &str) -> anyhow::Result<()> {
    let body = serde_json::json!({
        "pdf_id": pdf_id,
        "question": question,
    });

    let resp = client(120)?
        .post(format!("{}/ask_question", server))
        .json(&body)
        .send()?;
    let resp = fail_on_error_status(resp);

    let ask: AskResponse = resp.json()?;
    println!("{}", ask.answer);
    Ok(())
}

fn do_list(server: &str) -> anyhow::Result<()> {
    let resp = client(30)?
        .get(format!("{}/get_uploaded_pdfs", server))
        .send()?;
    let resp = fail_on_error_status(resp);

    let list: ListResponse = resp.json()?;
    if list.pdfs.is_empty() {
        println!("No documents uploaded yet.");
        return Ok(());
    }
    for pdf in &list.pdfs {
        println!("{}  {}  {}", pdf.pdf_id, pdf.upload_date, pdf.filename);
    }
    Ok(())
}

fn do_history(server: &str, pdf_id: &str) -> anyhow::Result<()> {
    let resp = client(30)?
        .get(format!("{}/get_conversation", server))
        .query(&[("pdf_id", pdf_id)])
        .send()?;
    let resp = fail_on_error_status(resp);

    let history: ConversationResponse = resp.json()?;
    if history.conversation.is_empty() {
        println!("No questions asked yet.");
        return Ok(());
    }
    for entry in &history.conversation {
        println!("[{}]", entry.timestamp);
        println!("Q: {}", entry.question);
        println!("A: {}\n", entry.answer);
    }
    Ok(())
}

fn do_delete(server: &str, pdf_id: &str) -> anyhow::Result<()> {
    let resp = client(30)?
        .delete(format!("{}/delete_pdf/{}", server, pdf_id))
        .send()?;
    fail_on_error_status(resp);
    println!("Deleted {}", pdf_id);
    Ok(())
}

fn do_status(server: &str) -> anyhow::Result<()> {
    let url = format!("{}/health", server);
    let resp = client(10)?.get(&url).send();

    match resp {
        Ok(r) if r.status().is_success() => {
            let body: serde_json::Value = r.json().unwrap_or_default();
            println!("askdoc server: {}", body["status"].as_str().unwrap_or("unknown"));
            println!("Version:       {}", body["version"].as_str().unwrap_or("?"));
            println!("SQLite:        {}", body["sqlite"].as_str().unwrap_or("?"));
        }
        Ok(r) => {
            eprintln!("askdoc: server unhealthy (HTTP {})", r.status());
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("askdoc: cannot reach {}: {}", url, e);
            std::process::exit(1);
        }
    }

    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    let cli = Cli::parse();
    let server = cli.server.trim_end_matches('/').to_string();

    let result = match cli.command {
        Commands::Upload { path } => do_upload(&server, &path),
        Commands::Ask { pdf_id, question } => do_ask(&server, &pdf_id, &question),
        Commands::List => do_list(&server),
        Commands::History { pdf_id } => do_history(&server, &pdf_id),
        Commands::Delete { pdf_id } => do_delete(&server, &pdf_id),
        Commands::Status => do_status(&server),
    };

    if let Err(e) = result {
        eprintln!("askdoc: {}", e);
        std::process::exit(1);
    }
}
