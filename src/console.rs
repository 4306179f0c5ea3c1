//! Kernel console output.
//!
//! The kernel owns no serial hardware. Board code installs a sink once
//! (a UART, the ITM stimulus port, a semihosting channel) and the print
//! macros below write through it. Until a sink is installed, output is
//! discarded.

use core::fmt::{self, Write};

static SINK: spin::Once<fn(&str)> = spin::Once::new();

/// Install the console sink.
///
/// Only the first call takes effect. Returns `true` if this call
/// installed `sink`.
pub fn set_sink(sink: fn(&str)) -> bool {
    let mut installed = false;
    SINK.call_once(|| {
        installed = true;
        sink
    });
    installed
}

/// Whether a sink has been installed.
pub fn has_sink() -> bool {
    SINK.get().is_some()
}

/// Write a string to the console sink.
pub fn send_str(s: &str) {
    if let Some(sink) = SINK.get() {
        sink(s);
    }
}

/// Console writer for use with `write!`.
pub struct Console;

impl Write for Console {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        send_str(s);
        Ok(())
    }
}

/// Print a formatted string to the kernel console.
#[macro_export]
macro_rules! kprint {
    ($($arg:tt)*) => {{
        use core::fmt::Write;
        let _ = write!($crate::console::Console, $($arg)*);
    }};
}

/// Print a formatted string to the kernel console with a newline.
#[macro_export]
macro_rules! kprintln {
    () => {
        $crate::kprint!("\n")
    };
    ($($arg:tt)*) => {{
        $crate::kprint!($($arg)*);
        $crate::kprint!("\n");
    }};
}

/// Kernel lifecycle trace, compiled in only with the `trace` feature.
#[macro_export]
macro_rules! ktrace {
    ($($arg:tt)*) => {{
        if cfg!(feature = "trace") {
            $crate::kprintln!($($arg)*);
        }
    }};
}
