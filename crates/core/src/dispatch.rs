use crate::config::DispatchOptions;
use crate::error::HarvestError;
use crate::runner::SearchRunner;
use crate::traits::CodeSearch;
use crate::{SearchJob, SearchResultPage};
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// `*.json` regular files directly inside `folder`, sorted by path.
///
/// A folder that cannot be read is an error. Entries inside it that cannot
/// be inspected are logged and skipped.
pub fn discover_batch_files(folder: &Path) -> Result<Vec<PathBuf>, HarvestError> {
    let mut files = Vec::new();

    for item in WalkDir::new(folder).min_depth(1).max_depth(1) {
        let entry = match item {
            Ok(entry) => entry,
            Err(error) if error.depth() == 0 => return Err(io::Error::from(error).into()),
            Err(error) => {
                warn!(error = %error, "skipping unreadable batch folder entry");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let is_json = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    Ok(files)
}

pub async fn read_batch_file(path: &Path) -> Result<Vec<SearchJob>, HarvestError> {
    let bytes = tokio::fs::read(path).await?;
    serde_json::from_slice(&bytes).map_err(|source| HarvestError::BatchDecode {
        path: path.to_path_buf(),
        source,
    })
}

pub fn output_path(output_dir: &Path, job: &SearchJob) -> PathBuf {
    output_dir.join(format!("{}.json", job.fingerprint()))
}

/// Writes `page` as compact JSON plus a trailing newline, replacing any
/// previous file at `path`.
pub async fn write_page(path: &Path, page: &SearchResultPage) -> Result<(), HarvestError> {
    let mut encoded = serde_json::to_vec(page)?;
    encoded.push(b'\n');

    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(&encoded).await?;
    file.flush().await?;
    Ok(())
}

#[derive(Debug, Default)]
pub struct DispatchReport {
    pub jobs_run: usize,
    pub written: Vec<PathBuf>,
}

type Readers = JoinSet<Result<(), HarvestError>>;

/// Reads every batch file concurrently and runs the decoded jobs one at a
/// time, in arrival order. The first error from any reader, run or write
/// stops the pipeline; files written before it stay on disk.
///
/// A reader that fails cancels the job in flight, and no queued job starts
/// after the failure is seen.
pub async fn dispatch<S>(
    runner: &SearchRunner<S>,
    cancel: &CancellationToken,
    batch_files: Vec<PathBuf>,
    options: &DispatchOptions,
) -> Result<DispatchReport, HarvestError>
where
    S: CodeSearch,
{
    let (sender, mut receiver) = mpsc::channel::<SearchJob>(options.queue_depth.max(1));
    let abort = cancel.child_token();
    let mut readers = Readers::new();

    for path in batch_files {
        let sender = sender.clone();
        let abort = abort.clone();
        readers.spawn(async move {
            let jobs = match read_batch_file(&path).await {
                Ok(jobs) => jobs,
                Err(error) => {
                    abort.cancel();
                    return Err(error);
                }
            };
            info!(path = %path.display(), job_count = jobs.len(), "read batch file");
            for job in jobs {
                if sender.send(job).await.is_err() {
                    break;
                }
            }
            Ok(())
        });
    }
    // The channel closes once the last reader drops its sender.
    drop(sender);

    let mut report = DispatchReport::default();
    loop {
        let next = tokio::select! {
            biased;
            Some(joined) = readers.join_next() => {
                if let Err(error) = joined? {
                    receiver.close();
                    return Err(error);
                }
                continue;
            }
            next = receiver.recv() => next,
        };
        let Some(job) = next else {
            break;
        };
        let path = output_path(&options.output_dir, &job);

        info!(
            query = %job.query,
            max_page = job.max_page,
            output = %path.display(),
            "running search job"
        );
        let page = match runner.run(&abort, &job).await {
            Ok(page) => page,
            Err(error) if abort.is_cancelled() && !cancel.is_cancelled() => {
                receiver.close();
                return Err(first_reader_failure(&mut readers).await.unwrap_or(error));
            }
            Err(error) => return Err(error),
        };
        write_page(&path, &page).await?;
        debug!(output = %path.display(), page = page.page_number, "wrote result page");

        report.jobs_run += 1;
        report.written.push(path);
    }

    while let Some(joined) = readers.join_next().await {
        joined??;
    }

    Ok(report)
}

/// Joins the remaining readers and returns the first error among them. The
/// receiver must already be closed so that no reader waits on a full queue.
async fn first_reader_failure(readers: &mut Readers) -> Option<HarvestError> {
    while let Some(joined) = readers.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(error)) => return Some(error),
            Err(error) => return Some(error.into()),
        }
    }
    None
}
