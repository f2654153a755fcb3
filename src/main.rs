use clap::Parser;
use posting_etl::utils::error::{EtlError, ErrorSeverity};
use posting_etl::utils::{logger, validation::Validate};
use posting_etl::{run_warehouse, CliConfig, EtlConfig, RunRequest};

fn exit_code(e: &EtlError) -> i32 {
    match e.severity() {
        ErrorSeverity::Low => 0,      // 警告，但成功
        ErrorSeverity::Medium => 2,   // 重試後仍失敗
        ErrorSeverity::High => 1,     // 處理錯誤
        ErrorSeverity::Critical => 3, // 系統或設定錯誤
    }
}

fn fail(e: &EtlError) -> ! {
    tracing::error!(
        "❌ ETL process failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    std::process::exit(exit_code(e));
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose, cli.log_file.as_deref())?;
    }

    tracing::info!("Starting posting-etl CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    if let Err(e) = cli.validate() {
        fail(&e);
    }

    let config = match EtlConfig::from_file(&cli.config).and_then(|c| c.validate().map(|_| c)) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            fail(&e);
        }
    };

    let request = RunRequest {
        warehouse: &cli.warehouse,
        chat_id: cli.chat_id.as_deref(),
        dry_run: cli.dry_run,
    };

    match run_warehouse(&config, &request).await {
        Ok(summary) => {
            tracing::info!("✅ ETL process completed successfully!");
            println!("✅ Warehouse: {}", summary.warehouse_name);
            println!("📦 Postings: {}", summary.postings);
            println!("💾 Rows written: {}", summary.rows_written);
            if config.sink.record_processed && !cli.dry_run {
                println!("📝 Postings logged: {}", summary.postings_logged);
            }
        }
        Err(e) => fail(&e),
    }

    Ok(())
}
