use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Context;
use blogwalk_engine::{
    ensure_output_dir, media_filename, AtomicFileWriter, Cursor, HttpFeedSource, MediaRecord,
    ScrapeSession, Scope, StopReason, WalkFailure,
};
use engine_logging::{engine_debug, engine_error, engine_info, engine_warn};
use tokio::sync::mpsc;

use crate::cli::DownloadArgs;
use crate::config::AppConfig;

#[derive(Debug, Default)]
struct DownloadStats {
    saved: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
}

/// What one `download` run did.
#[derive(Debug)]
pub struct DownloadReport {
    pub stop_reason: Option<StopReason>,
    pub failure: Option<WalkFailure>,
    /// Page to pass to `--page` to retry after an error.
    pub resume_page: Option<u32>,
    pub saved: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl DownloadReport {
    /// Success when the walk ran out of pages or stopped on a limit; failed
    /// downloads of single files do not count.
    pub fn exit_code(&self) -> ExitCode {
        if self.is_success() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none() && self.stop_reason != Some(StopReason::Error)
    }
}

/// Walks `args.blog` and saves every media record into `args.directory`.
pub async fn run(args: &DownloadArgs, config: &AppConfig) -> anyhow::Result<DownloadReport> {
    ensure_output_dir(&args.directory)
        .with_context(|| format!("cannot use {}", args.directory.display()))?;

    let source = Arc::new(HttpFeedSource::new(config.fetch_settings()));
    let session = ScrapeSession::new(source.clone());
    let scope = Scope::blog(args.blog.trim());
    let stats = Arc::new(DownloadStats::default());

    let (tx, rx) = mpsc::unbounded_channel::<MediaRecord>();
    let media_id = session.events().on_media(scope.clone(), move |record| {
        // Only fails once the saver is gone, which happens after the walk.
        let _ = tx.send(record.clone());
    });
    let saver = tokio::spawn(save_media(
        rx,
        source,
        AtomicFileWriter::new(args.directory.clone()),
        config.skip_existing,
        stats.clone(),
    ));

    session.events().on_walk_error(scope.clone(), |event| {
        engine_warn!("{}: {}", event.blog, event.error);
    });
    let resume = Arc::new(Mutex::new(None::<Cursor>));
    {
        let resume = resume.clone();
        session.events().on_walk_end(scope.clone(), move |end| {
            if end.reason == StopReason::Error {
                *resume.lock().unwrap_or_else(PoisonError::into_inner) = end.resume_cursor.clone();
            }
        });
    }

    let mut walker = session.walk(&args.blog, args.walk_options())?;
    let cancel = walker.cancellation_token();
    {
        let cancel = cancel.clone();
        session.events().on_page_boundary(scope, move |boundary| {
            engine_info!(
                "{}: page {} done ({} records), next page {}",
                boundary.blog,
                boundary.pages_fetched,
                boundary.records_on_page,
                boundary.next_cursor.page_number
            );
            !cancel.is_cancelled()
        });
    }
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            engine_warn!("interrupted, stopping after the current page");
            cancel.cancel();
        }
    });

    let outcome = loop {
        match walker.next_record().await {
            Ok(Some(record)) => engine_debug!("queued {}", record.photo_id),
            Ok(None) => break Ok(walker.stop_reason()),
            Err(failure) => break Err(failure),
        }
    };

    // Dropping the listener closes the channel so the saver can finish.
    session.events().unsubscribe(media_id);
    saver.await.context("media saver task panicked")?;

    let ended_at = resume.lock().unwrap_or_else(PoisonError::into_inner).take();
    let resume_cursor = match &outcome {
        Err(failure) => failure.resume_from.clone(),
        Ok(_) => ended_at,
    };
    let report = DownloadReport {
        stop_reason: outcome.as_ref().ok().copied().flatten(),
        failure: outcome.err(),
        resume_page: resume_cursor.map(|cursor| cursor.page_number),
        saved: stats.saved.load(Ordering::Relaxed),
        skipped: stats.skipped.load(Ordering::Relaxed),
        failed: stats.failed.load(Ordering::Relaxed),
    };
    engine_info!(
        "{}: {} saved, {} skipped, {} failed",
        args.blog,
        report.saved,
        report.skipped,
        report.failed
    );
    match &report.failure {
        Some(failure) => engine_error!("{}: {}", args.blog, failure),
        None => engine_info!("{}: walk ended ({:?})", args.blog, report.stop_reason),
    }
    if let Some(page) = report.resume_page {
        engine_info!("resume with --page {}", page);
    }
    Ok(report)
}

async fn save_media(
    mut rx: mpsc::UnboundedReceiver<MediaRecord>,
    source: Arc<HttpFeedSource>,
    writer: AtomicFileWriter,
    skip_existing: bool,
    stats: Arc<DownloadStats>,
) {
    while let Some(record) = rx.recv().await {
        let filename = media_filename(&record);
        if skip_existing && writer.exists(&filename) {
            engine_debug!("{} already saved", filename);
            stats.skipped.fetch_add(1, Ordering::Relaxed);
            continue;
        }

        let bytes = match source.download_media(&record.url).await {
            Ok(bytes) => bytes,
            Err(err) => {
                engine_warn!("download of {} failed: {}", record.url, err);
                stats.failed.fetch_add(1, Ordering::Relaxed);
                continue;
            }
        };
        match writer.write_bytes(&filename, &bytes) {
            Ok(path) => {
                engine_debug!("saved {:?} ({} bytes)", path, bytes.len());
                stats.saved.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                engine_error!("could not write {}: {}", filename, err);
                stats.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}
