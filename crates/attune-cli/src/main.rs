//! `attune` — operator tool for the Attune audience API.
//!
//! The server processes exactly one page per maintenance request; this
//! tool owns the cursor loop, feeding each returned cursor back until the
//! job reports `done` and printing per-page counts as it goes.

mod client;

use anyhow::Result;
use attune_engine::jobs::RetagBatchResult;
use clap::{Parser, Subcommand};
use uuid::Uuid;

use client::{ApiClient, ApiConfig};

#[derive(Parser)]
#[command(author, version, about = "Attune audience operator tool")]
struct Cli {
  /// Base URL of the attune-api server.
  #[arg(long, default_value = "http://127.0.0.1:8080")]
  base_url: String,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Prebuilt segment management.
  Segments {
    #[command(subcommand)]
    action: SegmentsCommand,
  },
  /// Re-derive tags for every contact of a tenant.
  Retag {
    #[arg(long)]
    tenant: String,
    #[arg(long)]
    batch_size: Option<usize>,
  },
  /// Apply course tags to the contacts of all enrolled users.
  TagEnrolled {
    #[arg(long)]
    tenant: String,
    #[arg(long)]
    batch_size: Option<usize>,
  },
  /// Tag every buyer of one product.
  TagProductPurchasers {
    #[arg(long)]
    tenant: String,
    #[arg(long)]
    product_id: Uuid,
    #[arg(long)]
    batch_size: Option<usize>,
  },
}

#[derive(Subcommand)]
enum SegmentsCommand {
  /// Ensure the prebuilt segment tags exist (idempotent).
  Setup {
    #[arg(long)]
    tenant: String,
  },
  /// List every segment with its contact count.
  List {
    #[arg(long)]
    tenant: String,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();
  let client = ApiClient::new(ApiConfig { base_url: cli.base_url.clone() })?;

  match cli.command {
    Command::Segments { action } => match action {
      SegmentsCommand::Setup { tenant } => {
        let result = client.create_prebuilt_segments(&tenant).await?;
        println!(
          "segments: {} created, {} skipped",
          result.created, result.skipped
        );
        for segment in result.segments {
          println!("  {} → {}", segment.name, segment.tag_id);
        }
      }
      SegmentsCommand::List { tenant } => {
        for segment in client.list_segments(&tenant).await? {
          println!(
            "{:<24} {:<24} {:>8} contacts",
            segment.display_name, segment.tag_name, segment.contact_count
          );
        }
      }
    },

    Command::Retag { tenant, batch_size } => {
      run_job("retag", |cursor| {
        let client = client.clone();
        let tenant = tenant.clone();
        async move { client.retag_page(&tenant, cursor, batch_size).await }
      })
      .await?;
    }

    Command::TagEnrolled { tenant, batch_size } => {
      run_job("tag-enrolled", |cursor| {
        let client = client.clone();
        let tenant = tenant.clone();
        async move {
          client.tag_enrolled_page(&tenant, cursor, batch_size).await
        }
      })
      .await?;
    }

    Command::TagProductPurchasers { tenant, product_id, batch_size } => {
      run_job("tag-product-purchasers", |cursor| {
        let client = client.clone();
        let tenant = tenant.clone();
        async move {
          client
            .tag_product_purchasers_page(&tenant, product_id, cursor, batch_size)
            .await
        }
      })
      .await?;
    }
  }

  Ok(())
}

/// Drive one cursor-paginated job to completion, printing per-page counts.
async fn run_job<F, Fut>(name: &str, mut page_fn: F) -> Result<()>
where
  F: FnMut(Option<String>) -> Fut,
  Fut: Future<Output = Result<RetagBatchResult>>,
{
  let mut cursor = None;
  let mut page = 1u32;
  let mut totals = (0u32, 0u32, 0u32);

  loop {
    let result = page_fn(cursor).await?;
    println!(
      "{name} page {page}: {} processed, {} tags, {} errors",
      result.processed, result.tags_added, result.errors
    );
    totals.0 += result.processed;
    totals.1 += result.tags_added;
    totals.2 += result.errors;

    if result.done {
      break;
    }
    cursor = result.next_cursor;
    page += 1;
  }

  println!(
    "{name} done: {} processed, {} tags, {} errors",
    totals.0, totals.1, totals.2
  );
  Ok(())
}
