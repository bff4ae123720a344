//! Terminal logging with colored prefixes and an in-place progress line.
//!
//! - `log!` prints `[module] message` with a colored prefix
//! - `debug!` prints only when the caller's verbose flag is set
//! - `ProgressLine` keeps a single `[build] assets(3/10) baked(1/2)` line updated
//!
//! Verbosity is never global: every call site passes the flag it was given.
//!
//! ```ignore
//! log!("build"; "writing {} objects", count);
//! debug!(options.verbose, "store"; "skip existing {}", hash);
//! ```

use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType},
};
use owo_colors::OwoColorize;
use std::{
    io::{Write, stdout},
    sync::atomic::{AtomicBool, Ordering},
};

/// Whether a progress line currently owns the bottom terminal row.
static PROGRESS_ACTIVE: AtomicBool = AtomicBool::new(false);

// ============================================================================
// Macros
// ============================================================================

/// Log a message with a colored module prefix.
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Log a message only when `$verbose` is true.
///
/// ```ignore
/// debug!(verbose, "bake"; "tool output: {}", stderr);
/// ```
#[macro_export]
macro_rules! debug {
    ($verbose:expr, $module:expr; $($arg:tt)*) => {{
        if $verbose {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

// ============================================================================
// Output
// ============================================================================

/// Log a message with a colored module prefix.
///
/// When a progress line is active it is cleared first and redrawn by the next
/// `ProgressLine::inc`.
pub fn log(module: &str, message: &str) {
    let prefix = colorize_prefix(module);
    let mut stdout = stdout().lock();

    if PROGRESS_ACTIVE.load(Ordering::SeqCst) {
        execute!(
            stdout,
            cursor::MoveToColumn(0),
            Clear(ClearType::CurrentLine)
        )
        .ok();
    }

    writeln!(stdout, "{prefix} {message}").ok();
    stdout.flush().ok();
}

fn colorize_prefix(module: &str) -> String {
    let prefix = format!("[{module}]");
    match module.to_ascii_lowercase().as_str() {
        "error" => prefix.bright_red().bold().to_string(),
        "warning" => prefix.bright_magenta().bold().to_string(),
        "bake" => prefix.bright_cyan().bold().to_string(),
        "package" | "pull" => prefix.bright_blue().bold().to_string(),
        "done" => prefix.bright_green().bold().to_string(),
        _ => prefix.bright_yellow().bold().to_string(),
    }
}

// ============================================================================
// Progress Line
// ============================================================================

/// Single-line progress display with named counters.
///
/// Only counters with a non-zero total are shown. Hidden entirely when
/// `enabled` is false, so tests and quiet runs keep a clean stdout.
pub struct ProgressLine {
    counters: Vec<Counter>,
    enabled: bool,
}

struct Counter {
    name: &'static str,
    total: usize,
    current: usize,
}

impl ProgressLine {
    pub fn new(items: &[(&'static str, usize)], enabled: bool) -> Self {
        let counters = items
            .iter()
            .filter(|(_, total)| *total > 0)
            .map(|(name, total)| Counter {
                name,
                total: *total,
                current: 0,
            })
            .collect();

        let progress = Self { counters, enabled };
        if enabled {
            PROGRESS_ACTIVE.store(true, Ordering::SeqCst);
            progress.display(false);
        }
        progress
    }

    /// Increment the counter with the given name.
    pub fn inc(&mut self, name: &str) {
        if let Some(counter) = self.counters.iter_mut().find(|c| c.name == name) {
            counter.current = (counter.current + 1).min(counter.total);
        }
        if self.enabled {
            self.display(false);
        }
    }

    /// Render the counters as `name(current/total)` joined by spaces.
    fn render(&self) -> String {
        self.counters
            .iter()
            .map(|c| format!("{}({}/{})", c.name, c.current, c.total))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn display(&self, newline: bool) {
        let mut stdout = stdout().lock();
        execute!(
            stdout,
            cursor::MoveToColumn(0),
            Clear(ClearType::CurrentLine)
        )
        .ok();
        let prefix = colorize_prefix("build");
        if newline {
            writeln!(stdout, "{prefix} {}", self.render()).ok();
        } else {
            write!(stdout, "{prefix} {}", self.render()).ok();
        }
        stdout.flush().ok();
    }

    /// Keep the final counts on screen and release the bottom row.
    pub fn finish(self) {
        if self.enabled {
            self.display(true);
        }
        PROGRESS_ACTIVE.store(false, Ordering::SeqCst);
        std::mem::forget(self);
    }
}

impl Drop for ProgressLine {
    fn drop(&mut self) {
        if !self.enabled {
            return;
        }
        PROGRESS_ACTIVE.store(false, Ordering::SeqCst);
        let mut stdout = stdout().lock();
        execute!(
            stdout,
            cursor::MoveToColumn(0),
            Clear(ClearType::CurrentLine)
        )
        .ok();
        stdout.flush().ok();
    }
}
