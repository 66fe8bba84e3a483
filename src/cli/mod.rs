// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Textbook RAG CLI
//!
//! Build-phase commands (`chunk`, `build-index`) and serving commands
//! (`ask`, `chat`, `show-page`) over one explicitly initialized context.

use std::io::{self, BufRead, Write};

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::chunker;
use crate::config::RagConfig;
use crate::context::RagContext;
use crate::errors::RagError;
use crate::pages;
use crate::retriever::RetrievalResult;

/// Textbook RAG CLI
#[derive(Parser, Debug)]
#[command(name = "textbook-rag")]
#[command(about = "Retrieval-augmented question answering over textbook pages", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Split pages into overlapping chunks and write the chunk manifest
    Chunk,

    /// Chunk, embed, and persist the vector index
    BuildIndex,

    /// Answer one question against the built index
    Ask {
        /// The question to answer
        query: String,
    },

    /// Interactive question loop (type 'exit' to quit)
    Chat,

    /// Print the full text of one page
    ShowPage {
        /// Page number, e.g. 74
        page_number: u32,
    },
}

/// Execute a CLI command
pub async fn execute(cli: Cli, config: RagConfig) -> Result<()> {
    match cli.command {
        Commands::Chunk => run_chunk(&config),
        Commands::BuildIndex => run_build_index(config).await,
        Commands::Ask { query } => run_ask(config, &query).await,
        Commands::Chat => run_chat(config).await,
        Commands::ShowPage { page_number } => run_show_page(&config, page_number),
    }
}

fn run_chunk(config: &RagConfig) -> Result<()> {
    let corpus = pages::load_pages(&config.pages_dir)?;
    let (texts, metas) =
        chunker::chunk_corpus(&corpus, config.chunk_size, config.chunk_overlap)?;
    chunker::write_chunks(&config.chunks_dir, &texts, &metas)?;

    println!(
        "Chunking complete: {} chunks from {} pages written to {}",
        texts.len(),
        corpus.len(),
        config.chunks_dir.display()
    );
    for meta in metas.iter().take(5) {
        println!(
            "  {} -> page {} (len: {})",
            meta.chunk_id, meta.page_number, meta.char_length
        );
    }
    Ok(())
}

async fn run_build_index(config: RagConfig) -> Result<()> {
    let mut ctx = RagContext::new(config)?;
    let manifest = ctx.build_index().await?;
    println!(
        "Built index: {} vectors ({}D, model {}) in {}",
        manifest.vector_count,
        manifest.dimension,
        manifest.model_id,
        ctx.config().vectorstore_dir.display()
    );
    Ok(())
}

async fn run_ask(config: RagConfig, query: &str) -> Result<()> {
    let mut ctx = RagContext::new(config)?;
    ctx.load_serving()?;

    let (answer, retrieved) = ctx.answer(query).await?;
    println!("\n{}\n", answer);
    print_sources(&retrieved);
    Ok(())
}

async fn run_chat(config: RagConfig) -> Result<()> {
    let mut ctx = RagContext::new(config)?;
    ctx.load_serving()?;

    println!("Chatbot ready! Type 'exit' to quit.\n");
    let stdin = io::stdin();
    loop {
        print!("You: ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if matches!(query.to_lowercase().as_str(), "exit" | "quit" | "bye") {
            println!("Exiting...");
            break;
        }

        // Per-query errors are reported and the loop keeps running.
        match ctx.answer(query).await {
            Ok((answer, retrieved)) => {
                println!("\nBot: {}\n", answer);
                print_sources(&retrieved);
                println!("\n{}\n", "-".repeat(50));
            }
            Err(e) => {
                eprintln!("\nQuery failed [{}]: {}\n", e.error_code(), e);
            }
        }
    }
    Ok(())
}

fn run_show_page(config: &RagConfig, page_number: u32) -> Result<()> {
    let ctx = RagContext::new(config.clone())?;
    match ctx.show_page(page_number) {
        Ok(text) => {
            println!("{}", text);
            Ok(())
        }
        // A missing page file is a lookup miss, not a session error.
        Err(RagError::MissingArtifact(msg)) => {
            println!("Full page file not found: {}", msg);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn print_sources(retrieved: &[RetrievalResult]) {
    println!("Sources:");
    for (i, r) in retrieved.iter().enumerate() {
        println!(
            "[{}] page: {} | chunk: {} | score: {:.4}",
            i + 1,
            r.page_number,
            r.chunk_id,
            r.score
        );
    }
}
