use std::{
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::{Error, Result};
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::{event::quote_snapshot::QuoteSnapshot, logging};

/// 啟動排程，先立即執行一次，之後每隔 interval 秒執行一次
pub async fn start(sched: &JobScheduler, cycle: QuoteSnapshot, interval: Duration) -> Result<()> {
    let running = Arc::new(AtomicBool::new(false));

    let first = cycle.clone();
    let guard = running.clone();
    tokio::spawn(async move {
        run_exclusive(&guard, || first.execute()).await;
    });

    let job = create_job(interval, move || {
        let cycle = cycle.clone();
        let running = running.clone();
        async move {
            run_exclusive(&running, || cycle.execute()).await;
            Ok(())
        }
    })?;
    sched.add(job).await?;
    sched.start().await?;

    logging::info_file_async(format!(
        "Scheduler started, refresh every {} seconds",
        interval.as_secs()
    ));

    Ok(())
}

/// 上一輪還沒結束就略過本輪，回傳本輪是否有執行
async fn run_exclusive<F, Fut, T>(running: &AtomicBool, task: F) -> bool
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    if running
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .is_err()
    {
        logging::warn_file_async("Previous cycle still running, skip this tick".to_string());
        return false;
    }

    if let Err(why) = task().await {
        logging::error_file_async(format!("Failed to execute cycle because {:?}", why));
    }

    running.store(false, Ordering::Release);
    true
}

fn create_job<F, Fut>(interval: Duration, task: F) -> Result<Job>
where
    F: Fn() -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Error>> + Send,
{
    Ok(Job::new_repeated_async(interval, move |_uuid, _l| {
        let task = task.clone();
        Box::pin(async move {
            if let Err(why) = task().await {
                logging::error_file_async(format!(
                    "Failed to execute task(every {:?}) because {:?}",
                    interval, why
                ));
            }
        })
    })?)
}
