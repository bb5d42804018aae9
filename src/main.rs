use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use dropbridge_importer::AppConfig;
use dropbridge_importer::capture::LiveBrowser;
use dropbridge_importer::extract::PriceResolver;
use dropbridge_importer::models::ImportPayload;
use dropbridge_importer::reconcile::ReconcileLoop;
use dropbridge_importer::submit::ImportClient;
use dropbridge_importer::ui::UiBridge;

#[derive(Parser, Debug)]
#[command(
    name = "dropbridge-importer",
    about = "Extract live product data from an AliExpress page and send it for review"
)]
struct Args {
    /// Product page URL
    url: String,

    /// Resolve once, print the record as JSON, and exit
    #[arg(long)]
    once: bool,

    /// Keep reconciling with page changes until Ctrl-C
    #[arg(long)]
    watch: bool,

    /// Send the resolved product to the import endpoint
    #[arg(long)]
    submit: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dropbridge_importer=debug".parse()?),
        )
        .init();

    dotenvy::dotenv().ok();
    let args = Args::parse();
    let config = AppConfig::from_env()?;

    info!("Starting Dropbridge Importer...");

    let browser = Arc::new(LiveBrowser::launch(&config.capture)?);
    browser.open(&args.url)?;

    let ui = Arc::new(UiBridge::new());
    ui.inject();

    let resolver = PriceResolver::new(&config.extraction);
    let (mut reconciler, handle) = ReconcileLoop::new(
        browser.clone(),
        resolver,
        ui.clone(),
        config.reconcile.clone(),
    );

    reconciler.resolve_now().await;
    println!("{}", serde_json::to_string_pretty(reconciler.record())?);

    let record = if args.watch && !args.once {
        let watchers = browser.spawn_watchers(handle.clone(), &config.reconcile);
        let loop_task = tokio::spawn(reconciler.run());

        tokio::signal::ctrl_c().await?;
        info!("Shutting down...");

        for task in &watchers {
            task.abort();
        }
        drop(handle);

        let record = loop_task.await?;
        println!("{}", serde_json::to_string_pretty(&record)?);
        record
    } else {
        drop(handle);
        reconciler.record().clone()
    };

    if args.submit {
        let Some(payload) = ImportPayload::from_record(&config.import.supplier, &record) else {
            anyhow::bail!("failed to extract product data: title or price unresolved");
        };
        let client = ImportClient::new(&config.import)?;
        let result = client.send(&payload).await;
        if !result.success {
            anyhow::bail!(
                "failed to send product: {}",
                result.error.unwrap_or_else(|| "unknown error".into())
            );
        }
        info!("product sent, open your Shopify app to review it");
    }

    Ok(())
}
