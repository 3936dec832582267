//! Fire-and-forget image preloading for the next chapter.
//!
//! The cache remembers one outcome per URL for the lifetime of a session. It
//! never evicts and never retries; a failed preload only means the page will
//! show its loading placeholder until the renderer fetches it itself.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreloadState {
    Pending,
    Loaded,
    Failed,
}

/// Outcome of one background load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreloadCompletion {
    pub url: String,
    pub ok: bool,
}

/// Starts background loads and hands back finished ones.
///
/// `begin` must not block; completions are collected on the session's thread
/// through `drain_completed`.
pub trait ImageLoader {
    fn begin(&mut self, url: &str);
    fn drain_completed(&mut self) -> Vec<PreloadCompletion>;
}

/// Loader that never fetches anything. Scheduled URLs stay pending.
#[derive(Debug, Default)]
pub struct NoopImageLoader;

impl ImageLoader for NoopImageLoader {
    fn begin(&mut self, _url: &str) {}

    fn drain_completed(&mut self) -> Vec<PreloadCompletion> {
        Vec::new()
    }
}

pub struct PreloadCache {
    entries: HashMap<String, PreloadState>,
    loader: Box<dyn ImageLoader>,
}

impl PreloadCache {
    pub fn new(loader: Box<dyn ImageLoader>) -> Self {
        Self {
            entries: HashMap::new(),
            loader,
        }
    }

    /// Start a load for every URL not seen before. Returns how many loads
    /// were issued.
    pub fn schedule<S: AsRef<str>>(&mut self, urls: &[S]) -> usize {
        let mut issued = 0;
        for url in urls {
            let url = url.as_ref();
            if self.entries.contains_key(url) {
                continue;
            }
            self.entries.insert(url.to_string(), PreloadState::Pending);
            self.loader.begin(url);
            issued += 1;
        }
        if issued > 0 {
            debug!(issued, tracked = self.entries.len(), "Scheduled image preloads");
        }
        issued
    }

    /// True only once the image is known to be loaded.
    pub fn has(&self, url: &str) -> bool {
        self.entries.get(url) == Some(&PreloadState::Loaded)
    }

    pub fn state(&self, url: &str) -> Option<PreloadState> {
        self.entries.get(url).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a finished load. A loaded entry stays loaded.
    pub fn complete(&mut self, url: &str, ok: bool) {
        let next = if ok {
            PreloadState::Loaded
        } else {
            PreloadState::Failed
        };
        match self.entries.get_mut(url) {
            Some(PreloadState::Loaded) => {}
            Some(state) => *state = next,
            None => {
                self.entries.insert(url.to_string(), next);
            }
        }
        if !ok {
            debug!(%url, "Image preload failed");
        }
    }

    /// The renderer displayed `url` successfully.
    pub fn mark_loaded(&mut self, url: &str) {
        self.entries.insert(url.to_string(), PreloadState::Loaded);
    }

    /// Move finished background loads into the cache.
    pub fn pump(&mut self) -> usize {
        let finished = self.loader.drain_completed();
        let count = finished.len();
        for completion in finished {
            self.complete(&completion.url, completion.ok);
        }
        count
    }
}

impl std::fmt::Debug for PreloadCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreloadCache")
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}

/// Fetches images over HTTP on a small pool of worker threads.
///
/// Response bodies are read and dropped; only success or failure is
/// reported. Dropping the loader stops new work but lets in-flight requests
/// finish on their own.
pub struct HttpImageLoader {
    jobs: Sender<String>,
    completed: Receiver<PreloadCompletion>,
}

impl HttpImageLoader {
    pub fn new(workers: usize, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("aphrodite-reader/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client for preloading")?;

        let (jobs, job_rx) = mpsc::channel::<String>();
        let (done_tx, completed) = mpsc::channel();
        let job_rx = Arc::new(Mutex::new(job_rx));

        for worker in 0..workers.max(1) {
            let client = client.clone();
            let job_rx = Arc::clone(&job_rx);
            let done_tx = done_tx.clone();
            thread::Builder::new()
                .name(format!("preload-{worker}"))
                .spawn(move || preload_worker(client, job_rx, done_tx))
                .context("failed to spawn preload worker")?;
        }

        Ok(Self { jobs, completed })
    }
}

fn preload_worker(
    client: reqwest::blocking::Client,
    jobs: Arc<Mutex<Receiver<String>>>,
    done: Sender<PreloadCompletion>,
) {
    loop {
        let next = match jobs.lock() {
            Ok(rx) => rx.recv(),
            Err(_) => return,
        };
        let Ok(url) = next else {
            return;
        };
        let ok = match client
            .get(&url)
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.bytes())
        {
            Ok(bytes) => {
                debug!(%url, bytes = bytes.len(), "Preloaded image");
                true
            }
            Err(err) => {
                warn!(%url, "Preload request failed: {err}");
                false
            }
        };
        if done.send(PreloadCompletion { url, ok }).is_err() {
            return;
        }
    }
}

impl ImageLoader for HttpImageLoader {
    fn begin(&mut self, url: &str) {
        if self.jobs.send(url.to_string()).is_err() {
            warn!(%url, "Preload workers are gone; dropping request");
        }
    }

    fn drain_completed(&mut self) -> Vec<PreloadCompletion> {
        self.completed.try_iter().collect()
    }
}
