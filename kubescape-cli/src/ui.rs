//! Terminal implementation of the `KubescapeUi` capability
//!
//! Notifications and progress go to stderr. Progress updates are throttled:
//! a line is printed only when the fraction advanced by at least 30% since the
//! last printed value, or when the work completes.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use colored::Colorize;
use kubescape_core::ui::{KubescapeUi, ProgressReporter};
use tokio_util::sync::CancellationToken;

/// Minimum progress delta between two printed updates.
const PROGRESS_STEP: f64 = 0.3;

/// Decides which progress fractions are worth printing.
#[derive(Debug, Default)]
pub struct ProgressThrottle {
    last: f64,
}

impl ProgressThrottle {
    /// Returns `true` if `fraction` should be printed, and remembers it.
    pub fn accept(&mut self, fraction: f64) -> bool {
        let print = if fraction >= 1.0 {
            self.last < 1.0
        } else {
            fraction - self.last >= PROGRESS_STEP
        };
        if print {
            self.last = fraction;
        }
        print
    }
}

/// stderr-backed UI for ksctl.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleUi;

impl KubescapeUi for ConsoleUi {
    fn info(&self, msg: &str) {
        eprintln!("{} {msg}", "info:".cyan().bold());
    }

    fn error(&self, msg: &str) {
        eprintln!("{} {msg}", "error:".red().bold());
    }

    fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    fn show_help(&self, message: &str, url: &str) {
        eprintln!("{} {message}", "help:".yellow().bold());
        eprintln!("      {}", url.underline());
    }

    async fn slow<T, F>(&self, title: &str, work: F) -> T
    where
        F: Future<Output = T> + Send,
        T: Send,
    {
        eprintln!("{} {title}...", "::".dimmed());
        let started = Instant::now();
        let out = work.await;
        tracing::debug!(title, elapsed_ms = started.elapsed().as_millis() as u64, "finished");
        out
    }

    async fn progress<T, F, Fut>(&self, title: &str, _cancel: &CancellationToken, work: F) -> T
    where
        F: FnOnce(ProgressReporter) -> Fut + Send,
        Fut: Future<Output = T> + Send,
        T: Send,
    {
        eprintln!("{} {title}...", "::".dimmed());

        let label = title.to_owned();
        let throttle = Arc::new(Mutex::new(ProgressThrottle::default()));
        let reporter = ProgressReporter::new(move |fraction| {
            let print = throttle
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .accept(fraction);
            if print {
                eprintln!("   {label}: {:>3.0}%", fraction * 100.0);
            }
        });

        work(reporter).await
    }
}
