use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UiMode {
    Auto,
    Plain,
    Pretty,
}

/// Stage banners and the decode progress bar on stderr.
#[derive(Clone, Debug)]
pub struct Ui {
    mode: UiMode,
    is_tty: bool,
    quiet_stdout: bool,
}

impl Ui {
    pub fn new(mode: UiMode, is_tty: bool, quiet_stdout: bool) -> Self {
        Self {
            mode,
            is_tty,
            quiet_stdout,
        }
    }

    pub fn from_args(ui_flag: Option<&str>, is_tty: bool, quiet_stdout: bool) -> Self {
        let mode = match ui_flag {
            Some("plain") => UiMode::Plain,
            Some("pretty") => UiMode::Pretty,
            _ => UiMode::Auto,
        };
        Self::new(mode, is_tty, quiet_stdout)
    }

    fn pretty(&self) -> bool {
        self.is_tty
            && match self.mode {
                UiMode::Pretty => true,
                UiMode::Auto => !self.quiet_stdout,
                UiMode::Plain => false,
            }
    }

    /// Banner for a short step; reports elapsed time when dropped.
    pub fn stage(&self, name: &str) -> StageGuard {
        let spinner = self.pretty().then(|| {
            let spinner = styled(ProgressBar::new_spinner(), "{spinner} {msg}");
            spinner.enable_steady_tick(Duration::from_millis(120));
            spinner.set_message(format!("{name}…"));
            spinner
        });
        if spinner.is_none() {
            eprintln!("==> {}", name);
        }
        StageGuard {
            name: name.to_string(),
            start: Instant::now(),
            spinner,
        }
    }

    /// Frame counter for the detection pass. Plain mode relies on the
    /// periodic log lines instead.
    pub fn frames(&self, expected: u64) -> FrameProgress {
        let bar = self.pretty().then(|| {
            let bar = if expected > 0 {
                ProgressBar::new(expected)
            } else {
                ProgressBar::new_spinner()
            };
            styled(bar, "{bar:40.green/white} {pos}/{len} frames ({per_sec}, eta {eta})")
        });
        FrameProgress { bar }
    }
}

fn styled(bar: ProgressBar, template: &str) -> ProgressBar {
    bar.set_draw_target(ProgressDrawTarget::stderr());
    let style = ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);
    bar
}

/// Cloneable handle so the detector's progress callback can own one.
#[derive(Clone)]
pub struct FrameProgress {
    bar: Option<ProgressBar>,
}

impl FrameProgress {
    pub fn update(&self, processed: u64, expected: u64) {
        if let Some(bar) = &self.bar {
            if expected > 0 && bar.length() != Some(expected) {
                bar.set_length(expected);
            }
            bar.set_position(processed);
        }
    }

    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}

pub struct StageGuard {
    name: String,
    start: Instant,
    spinner: Option<ProgressBar>,
}

impl Drop for StageGuard {
    fn drop(&mut self) {
        let message = format!("✔ {} ({})", self.name, format_duration(self.start.elapsed()));
        match &self.spinner {
            Some(spinner) => spinner.finish_with_message(message),
            None => eprintln!("{message}"),
        }
    }
}

fn format_duration(duration: Duration) -> String {
    match duration.as_secs() {
        0 => format!("{}ms", duration.as_millis()),
        _ => format!("{:.2}s", duration.as_secs_f64()),
    }
}
