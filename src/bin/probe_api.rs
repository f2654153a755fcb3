use clap::Parser;
use posting_etl::adapters::OzonHttpTransport;
use posting_etl::app::authorize;
use posting_etl::core::fetcher::PaginatedFetcher;
use posting_etl::core::parser::flatten_all;
use posting_etl::core::transport::TransportSession;
use posting_etl::utils::validation::Validate;
use posting_etl::{ConfigDirectory, EtlConfig};
use std::path::PathBuf;

/// 檢查倉庫憑證與 API 連線：先抓一頁，再抓全部
#[derive(Debug, Parser)]
#[command(name = "probe-api")]
#[command(about = "Check posting API connectivity for one warehouse")]
struct ProbeArgs {
    #[arg(long, short = 'c', default_value = "posting-etl.toml")]
    config: PathBuf,

    #[arg(long, short = 'w')]
    warehouse: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    posting_etl::utils::logger::init_cli_logger(true, None)?;

    let args = ProbeArgs::parse();
    let config = EtlConfig::from_file(&args.config)?;
    config.validate()?;

    let warehouse = authorize(&ConfigDirectory::from_config(&config), &args.warehouse, None)?;
    let transport = OzonHttpTransport::new(&config.http_settings(), &warehouse)?;
    println!("🚀 Probing {} as client {}", transport.url(), warehouse.client_id);

    let session = TransportSession::new(transport, config.retry_policy());
    let fetcher = PaginatedFetcher::new(session, config.fetch_settings());

    let first = match fetcher.fetch_page(config.posting_filter(), None).await {
        Ok(page) => page,
        Err(e) => {
            eprintln!("❌ {}", e);
            eprintln!("💡 {}", e.user_hint());
            std::process::exit(1);
        }
    };
    println!(
        "📄 First page: {} postings, cursor {}",
        first.postings.len(),
        if first.cursor.is_empty() { "<none>" } else { first.cursor.as_str() }
    );

    let postings = fetcher.fetch_all(config.posting_filter()).await?;
    let result = flatten_all(&postings);
    println!(
        "✅ All pages: {} postings, {} line items",
        result.posting_numbers.len(),
        result.line_items.len()
    );

    Ok(())
}
