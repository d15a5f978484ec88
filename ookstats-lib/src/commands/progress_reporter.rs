use core::time::Duration;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Refresh rate for progress updates (10 Hz).
const REFRESH_INTERVAL_MS: u64 = 100;

const DETERMINATE_TEMPLATE: &str = "{prefix:>12.bold.cyan} [{bar:25}] {pos}/{len} {msg}";
const DETERMINATE_TEMPLATE_NO_COLOR: &str = "{prefix:>12} [{bar:25}] {pos}/{len} {msg}";

/// A progress bar over a known number of work items, drawn on stderr.
///
/// When hidden (logging enabled, or stderr is not a terminal) every call is a
/// no-op, so callers never need to branch on visibility.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    #[must_use]
    pub fn new(phase: &str, total: u64, visible: bool, use_colors: bool) -> Self {
        let bar = ProgressBar::new(total);
        if visible {
            let template = if use_colors { DETERMINATE_TEMPLATE } else { DETERMINATE_TEMPLATE_NO_COLOR };
            let style = ProgressStyle::default_bar()
                .template(template)
                .map_or_else(|_| ProgressStyle::default_bar(), |style| style.progress_chars("=> "));
            bar.set_style(style);
            bar.enable_steady_tick(Duration::from_millis(REFRESH_INTERVAL_MS));
        } else {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }

        bar.set_prefix(phase.to_string());
        Self { bar }
    }

    /// Count one finished item, showing `message` beside the bar.
    pub fn advance(&self, message: impl Into<String>) {
        self.bar.set_message(message.into());
        self.bar.inc(1);
    }

    #[must_use]
    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Print a line above the bar without tearing it.
    pub fn println(&self, msg: &str) {
        if self.bar.is_hidden() {
            return;
        }
        self.bar.println(msg);
    }

    pub fn done(&self) {
        self.bar.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_reporter_still_counts() {
        let reporter = ProgressReporter::new("Fetching", 3, false, false);
        reporter.advance("pagle/scholomance");
        reporter.advance("pagle/scarlet-halls");
        reporter.println("ignored");
        assert_eq!(reporter.position(), 2);
        reporter.done();
    }
}
