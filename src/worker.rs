//! Batch processing of schedule images on a small worker pool.
//!
//! Work items are queued on an mpsc channel and pulled by scoped worker
//! threads that share one extractor. Results carry their queue index so the
//! caller gets them back in input order.

use chrono::NaiveDate;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Mutex;
use std::thread;

use crate::detection::{Extraction, ScheduleExtractor};
use crate::ocr::TextRecognizer;

/// A work item for a worker thread.
#[derive(Debug, Clone)]
pub struct WorkItem {
    /// Position in the input list
    pub index: usize,
    pub path: PathBuf,
}

/// Outcome for one image.
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub index: usize,
    pub path: PathBuf,
    pub extraction: Extraction,
}

/// Creates a new work queue.
///
/// The channel is unbounded; all paths are queued up front.
pub fn create_work_queue() -> (Sender<WorkItem>, Receiver<WorkItem>) {
    channel()
}

/// Processes one item. Unreadable files are logged and reported as `NotASchedule`.
fn process_item<R: TextRecognizer>(
    extractor: &ScheduleExtractor<R>,
    item: &WorkItem,
    today: NaiveDate,
) -> Extraction {
    let bytes = match std::fs::read(&item.path) {
        Ok(bytes) => bytes,
        Err(e) => {
            crate::log(&format!(
                "Worker: failed to read {}: {}",
                item.path.display(),
                e
            ));
            return Extraction::NotASchedule;
        }
    };

    let extraction = extractor.extract_on(&bytes, today);
    crate::log(&format!(
        "Worker: {} -> {}",
        item.path.display(),
        match &extraction {
            Extraction::Schedule(s) => format!("schedule for {}", s.date),
            Extraction::NoOutages(a) => format!("no outages on {}", a.date),
            Extraction::NotASchedule => "not a schedule".to_string(),
        }
    ));
    extraction
}

/// Runs the worker loop until the queue is drained and closed.
fn run_worker<R: TextRecognizer>(
    extractor: &ScheduleExtractor<R>,
    queue: &Mutex<Receiver<WorkItem>>,
    results: Sender<BatchResult>,
    today: NaiveDate,
) {
    loop {
        // Hold the lock only while taking the next item
        let next = match queue.lock() {
            Ok(receiver) => receiver.recv(),
            Err(_) => break,
        };
        let Ok(item) = next else {
            // Channel closed, sender was dropped
            break;
        };

        let extraction = process_item(extractor, &item, today);
        let result = BatchResult {
            index: item.index,
            path: item.path,
            extraction,
        };
        if results.send(result).is_err() {
            break;
        }
    }
}

/// Extracts every image in `paths` using up to `jobs` threads.
///
/// Results are returned in input order. One bad image never stops the batch.
pub fn run_batch<R: TextRecognizer + Sync>(
    extractor: &ScheduleExtractor<R>,
    paths: Vec<PathBuf>,
    jobs: usize,
    today: NaiveDate,
) -> Vec<BatchResult> {
    let total = paths.len();
    let jobs = jobs.clamp(1, total.max(1));
    crate::log(&format!("Processing {} image(s) with {} worker(s)", total, jobs));

    let (sender, receiver) = create_work_queue();
    for (index, path) in paths.into_iter().enumerate() {
        // Receiver is alive here, send cannot fail
        let _ = sender.send(WorkItem { index, path });
    }
    drop(sender);

    let queue = Mutex::new(receiver);
    let (result_sender, result_receiver) = channel();

    thread::scope(|scope| {
        for _ in 0..jobs {
            let results = result_sender.clone();
            let queue = &queue;
            scope.spawn(move || run_worker(extractor, queue, results, today));
        }
    });
    drop(result_sender);

    let mut results: Vec<BatchResult> = result_receiver.into_iter().collect();
    results.sort_by_key(|r| r.index);
    results
}
