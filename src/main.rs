use std::{env, sync::Arc, time::Duration};

use anyhow::Result;
use tokio_cron_scheduler::JobScheduler;

use crate::{
    crawler::{sina::Sina, tencent::Tencent, MixedFetcher},
    database::PostgresSQL,
    event::quote_snapshot::QuoteSnapshot,
    snapshot::store::SnapshotStore,
    util::http::{self, HttpClient},
};

#[cfg(all(target_os = "linux", target_env = "musl"))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod config;
pub mod crawler;
pub mod database;
pub mod declare;
pub mod error;
pub mod event;
pub mod logging;
pub mod scheduler;
pub mod server;
pub mod snapshot;
pub mod symbol;
pub mod util;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    http::install_crypto_provider();

    let app = Arc::new(config::App::load()?);

    let client = HttpClient::new(&app.crawler)?;
    let fetcher = MixedFetcher::new(
        Arc::new(Sina::new(client.clone(), &app.crawler)),
        Arc::new(Tencent::new(client, &app.crawler)),
    );
    let db = PostgresSQL::new(&app.postgresql)?;
    let store = SnapshotStore::new(&app.snapshot.path);
    let cycle = QuoteSnapshot::new(Arc::new(db), fetcher, store.clone());

    let mut sched = JobScheduler::new().await?;
    scheduler::start(
        &sched,
        cycle,
        Duration::from_secs(app.crawler.interval_seconds),
    )
    .await?;

    if app.system.http_port > 0 {
        let port = app.system.http_port;
        tokio::spawn(async move {
            if let Err(why) = server::serve(store, port).await {
                logging::error_file_async(format!("Failed to serve snapshot API because {:?}", why));
            }
        });
    }

    logging::info_console(format!(
        "AhQuoteCrawler 已啟動 Rust OS/Arch: {}/{} snapshot: {}",
        env::consts::OS,
        env::consts::ARCH,
        app.snapshot.path
    ));

    tokio::signal::ctrl_c().await?;

    logging::info_console("AhQuoteCrawler 收到中斷訊號，停止排程".to_string());
    sched.shutdown().await?;

    Ok(())
}
