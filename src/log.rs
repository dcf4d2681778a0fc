//! Diagnostics for problems that are skipped instead of failing a load or a render.
//!
//! Messages go to stderr, one per line, and only when the session allows it.  The
//! default comes from the `PAGESVG_LOG` environment variable.

use once_cell::sync::Lazy;

#[doc(hidden)]
#[macro_export]
macro_rules! svg_log {
    ($session:expr, $($arg:tt)+) => {
        if $session.log_enabled() {
            eprintln!("pagesvg: {}", format_args!($($arg)+));
        }
    };
}

static LOG_FROM_ENV: Lazy<bool> = Lazy::new(|| std::env::var_os("PAGESVG_LOG").is_some());

/// Whether `PAGESVG_LOG` was set the first time this was asked.
pub fn log_enabled() -> bool {
    *LOG_FROM_ENV
}
