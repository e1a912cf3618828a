mod anthropic;
mod capability;
mod cli;
mod compliance;
mod config;
mod drafting;
mod error;
mod orchestrator;
mod orders;
mod queue;
mod router;
mod ui;
mod workflow;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use console::Style;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use capability::{LlmCapability, OfflineCapability, SupportCapability};
use cli::{Cli, Command};
use config::SupportConfig;
use orchestrator::WorkflowController;
use orders::OrderBook;
use queue::{TaskQueue, TaskStatus, read_inquiries};
use ui::WorkflowProgress;
use workflow::{Inquiry, RunAudit, SupportReply};

const QUEUE_POLL: Duration = Duration::from_millis(50);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut config = SupportConfig::load(cli.config.as_deref()).context("loading config")?;
    if let Some(model) = &cli.model {
        config.model = model.clone();
    }

    let book = match &config.orders_file {
        Some(path) => OrderBook::load(path)
            .with_context(|| format!("loading orders from {}", path.display()))?,
        None => OrderBook::sample(),
    };
    if book.is_empty() {
        warn!("Order catalog is empty, every lookup will resolve to Not Found");
    }

    // Demo scenarios are meant to be reproducible.
    let offline = cli.offline || matches!(cli.command, Command::Demo);
    if offline || !config.has_api_key() {
        if !offline {
            warn!("ANTHROPIC_API_KEY not set, using the offline capability");
        }
        info!("Capability: offline");
        return execute(cli, book, OfflineCapability::new()).await;
    }

    info!(model = %config.model, "Capability: Anthropic Messages API");
    let capability = LlmCapability::connect(&config)?;
    execute(cli, book, capability).await
}

async fn execute<C: SupportCapability + 'static>(
    cli: Cli,
    book: OrderBook,
    capability: C,
) -> Result<()> {
    match cli.command {
        Command::Reply { order, message } => {
            let controller = WorkflowController::new(book, capability);
            let inquiry = Inquiry {
                order_id: order,
                customer_message: message,
            };
            run_one(&controller, inquiry).await
        }
        Command::Batch { file } => run_batch(WorkflowController::new(book, capability), &file).await,
        Command::Demo => run_demo(&WorkflowController::new(book, capability)).await,
        Command::Orders => {
            print_orders(&book);
            Ok(())
        }
    }
}

async fn run_one<C: SupportCapability>(
    controller: &WorkflowController<OrderBook, C>,
    inquiry: Inquiry,
) -> Result<()> {
    let progress = WorkflowProgress::start(&inquiry.order_id);
    let record = match controller
        .run_observed(inquiry, Uuid::new_v4(), |r| progress.observe(r))
        .await
    {
        Ok(record) => record,
        Err(e) => {
            progress.fail(&e.to_string());
            return Err(e.into());
        }
    };

    progress.complete(&record);
    let reply = SupportReply::from_record(&record)?;
    progress.print_reply(&reply);
    progress.print_audit(&RunAudit::from_record(&record));
    Ok(())
}

#[derive(Serialize)]
struct BatchEntry {
    task_id: Uuid,
    #[serde(flatten)]
    status: TaskStatus,
}

async fn run_batch<C: SupportCapability + 'static>(
    controller: WorkflowController<OrderBook, C>,
    file: &Path,
) -> Result<()> {
    let inquiries =
        read_inquiries(file).with_context(|| format!("reading {}", file.display()))?;

    let queue = TaskQueue::start(controller);
    let mut ids = Vec::with_capacity(inquiries.len());
    for inquiry in inquiries {
        ids.push(queue.submit(inquiry).await?);
    }

    let mut entries = Vec::with_capacity(ids.len());
    for task_id in ids {
        let status = queue
            .wait(task_id, QUEUE_POLL)
            .await
            .context("task vanished from the queue")?;
        queue.forget(task_id).await;
        entries.push(BatchEntry { task_id, status });
    }

    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}

async fn run_demo<C: SupportCapability>(
    controller: &WorkflowController<OrderBook, C>,
) -> Result<()> {
    let scenarios = [
        ("Unknown order", "ORD999", "Where is my order?"),
        ("Refund on an ineligible order", "ORD123", "When will I get my refund?"),
        ("Shipping without a delivery date", "ORD123", "When will my package arrive?"),
        ("Refund on an eligible order", "ORD456", "I'd like my money back please."),
    ];

    let heading = Style::new().cyan().bold();
    for (title, order_id, message) in scenarios {
        println!();
        println!("{}", heading.apply_to(format!("━━━ {title} ━━━")));
        println!("  {order_id}: \"{message}\"");
        let inquiry = Inquiry {
            order_id: order_id.to_string(),
            customer_message: message.to_string(),
        };
        run_one(controller, inquiry).await?;
    }
    Ok(())
}

fn print_orders(book: &OrderBook) {
    let bold = Style::new().bold();
    println!(
        "{}",
        bold.apply_to(format!(
            "{:<10} {:<12} {:<12} {}",
            "ORDER", "STATUS", "DELIVERY", "REFUNDABLE"
        ))
    );
    for (order_id, facts) in book.iter() {
        let refundable = match facts.refund_eligible {
            Some(true) => "yes",
            Some(false) => "no",
            None => "unknown",
        };
        println!(
            "{:<10} {:<12} {:<12} {}",
            order_id,
            facts.order_status,
            facts.delivery_date.as_deref().unwrap_or("-"),
            refundable
        );
    }
    println!("{} order(s)", book.len());
}
