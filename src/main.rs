use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use visearch::{
    read_metadata_csv, ImageEmbedder, IndexBuilder, RecordStore, SearchService, ServiceConfig,
    ThumbnailEmbedder,
};

/// Visual product search over an embedding store
#[derive(Parser, Debug)]
#[command(name = "visearch")]
#[command(about = "Index product images and find visually similar products", long_about = None)]
struct Args {
    /// Path to the record store directory
    #[arg(short, long, default_value = "data/products.db")]
    store: PathBuf,

    /// Side length of the thumbnail embedder (dimension = side * side)
    #[arg(long, default_value_t = ThumbnailEmbedder::DEFAULT_SIDE)]
    thumbnail_side: u32,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Embed every product image listed in the metadata CSV into the store
    Build {
        /// Metadata CSV with ProductId, ProductTitle, Category and optional image columns
        #[arg(long, default_value = "data/products_metadata.csv")]
        metadata: PathBuf,

        /// Directory holding the product images
        #[arg(long, default_value = "data/product_images")]
        images: PathBuf,
    },

    /// Find the products most similar to an image
    Query {
        /// Query image file
        image: PathBuf,

        /// Number of results
        #[arg(short = 'k', long, default_value_t = visearch::service::DEFAULT_TOP_K)]
        top_k: usize,

        /// Embedding timeout in milliseconds
        #[arg(long, default_value_t = 30_000)]
        timeout_ms: u64,
    },

    /// Print the record count and a sample of stored products
    Check {
        /// Number of sample rows
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let embedder: Arc<dyn ImageEmbedder> = Arc::new(ThumbnailEmbedder::new(args.thumbnail_side));

    match args.command {
        Command::Build { metadata, images } => {
            let store = Arc::new(RecordStore::open(&args.store)?);
            let rows = read_metadata_csv(&metadata, &images)?;
            info!("Read {} metadata rows from {:?}", rows.len(), metadata);

            let report = IndexBuilder::new(store, embedder).run(rows)?;
            for failure in &report.failures {
                eprintln!("skipped {} ({}): {}", failure.id, failure.name, failure.reason);
            }
            println!(
                "Done. Indexed {} products, skipped {}.",
                report.indexed, report.skipped
            );
        }
        Command::Query {
            image,
            top_k,
            timeout_ms,
        } => {
            let store = RecordStore::open(&args.store)?;
            let config = ServiceConfig {
                embed_timeout: Duration::from_millis(timeout_ms),
                ..ServiceConfig::default()
            };
            let service = SearchService::open(&store, embedder, config)?;

            match service.search_image(&image, Some(top_k)).await {
                Ok(results) => {
                    let body = json!({ "query_image": image, "results": results });
                    println!("{}", serde_json::to_string_pretty(&body)?);
                }
                Err(e) => {
                    let body = json!({ "error": e.to_body() });
                    println!("{}", serde_json::to_string_pretty(&body)?);
                    std::process::exit(1);
                }
            }
            service.shutdown();
        }
        Command::Check { limit } => {
            let store = RecordStore::open(&args.store)?;
            println!("Total products in database: {}", store.count()?);
            println!("\nSample of products:");
            for product in store.sample(limit)? {
                println!(
                    "ID: {}, Name: {}, Category: {}",
                    product.id, product.name, product.category
                );
            }
        }
    }

    Ok(())
}
