//! Quickstart Example
//!
//! Walks the basic workflow against a live Sens deployment:
//! - Upload a document
//! - Poll until it is processed
//! - Query it and inspect the context rail
//! - Clean up
//!
//! Run with: SENS_API_KEY=sens_sk_... cargo run --example quickstart

use std::time::Duration;

use sens_rs::{Client, DocumentStatus, QueryOptions, UploadOptions};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const MAX_WAIT: Duration = Duration::from_secs(60);
const POLL_INTERVAL: Duration = Duration::from_secs(2);

fn init_tracing() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("sens_rs=debug,quickstart=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init()?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    let client = Client::from_env()?;
    println!("✓ Initialized Sens client\n");

    // A small document to work with
    let path = std::env::temp_dir().join("sens_quickstart.txt");
    std::fs::write(
        &path,
        "Sens Prism: Sovereign AI Gateway\n\n\
         Pricing:\n\
         - Free Plan: $0/month, 10 requests/min, 5 documents/day\n\
         - Prism Plan: $29/month, 100 requests/min, 100 documents/day\n\n\
         Documents are encrypted and sanitized before any processing.\n",
    )?;

    // ===== Upload =====
    let doc = client
        .upload_document(
            &path,
            UploadOptions::new()
                .title("Sens Prism Overview")
                .tags(["product", "documentation"]),
        )
        .await?;
    println!("📝 Uploaded document: {} ({})", doc.id, doc.status);

    // ===== Wait for processing =====
    let started = tokio::time::Instant::now();
    let mut status = doc.status;
    while !status.is_terminal() && started.elapsed() < MAX_WAIT {
        tokio::time::sleep(POLL_INTERVAL).await;
        status = client.get_document(&doc.id).await?.status;
        println!("   Status: {}", status);
    }

    if status != DocumentStatus::Ready {
        println!("✗ Document not ready (status: {})", status);
        return Ok(());
    }

    // ===== Query =====
    let result = client
        .query(
            "How much does the Prism plan cost?",
            QueryOptions::new()
                .document_ids([doc.id.as_str()])
                .confidence_threshold(0.7),
        )
        .await?;

    println!("\n🔍 {}", result.query);
    println!("   Answer: {}", result.answer);
    println!(
        "   Confidence: {:.0}% in {:?}",
        result.confidence_score * 100.0,
        result.processing_time()
    );

    // ===== Context rail =====
    let rail = client.get_context_rail(&result.query_id).await?;
    println!("\n📚 {} sources", rail.sources.len());
    for (i, source) in rail.sources.iter().enumerate() {
        println!(
            "   {}. {} p.{} [{}]",
            i + 1,
            source.document_title.as_deref().unwrap_or(&source.document_id),
            source.page.map(|p| p.to_string()).unwrap_or_else(|| "-".into()),
            source
                .semantic_layer
                .as_ref()
                .map(|l| l.as_str())
                .unwrap_or("unknown"),
        );
        if let Some(excerpt) = &source.excerpt {
            println!("      {}", excerpt);
        }
    }

    // ===== Cleanup =====
    client.delete_document(&doc.id).await?;
    std::fs::remove_file(&path)?;
    println!("\n✓ Document deleted");

    Ok(())
}
