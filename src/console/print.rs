//! Console print macros.
//!
//! This module provides printing that prevents output from multiple cores
//! from being interleaved.

use core::fmt::{self, Write};

use lazyinit::LazyInit;

use crate::error::{PortError, PortResult};
use crate::hal::spin::Mutex;

pub(crate) static PRINT_LOCK: Mutex<()> = Mutex::new(());
static OUTPUT: LazyInit<fn(&str)> = LazyInit::new();

/// Buffer size for formatting output before sending it to the sink.
/// This should be large enough for most log lines.
const PRINT_BUFFER_SIZE: usize = 256;

/// Installs the function console output is written to.
pub fn set_output(output: fn(&str)) -> PortResult<()> {
    anyhow::ensure!(
        OUTPUT.call_once(|| output).is_some(),
        PortError::ConsoleAlreadySet
    );
    Ok(())
}

/// A printer that formats into a fixed-size buffer, then outputs it in one
/// call to the sink.
struct BufferedPrinter {
    output: fn(&str),
    buffer: [u8; PRINT_BUFFER_SIZE],
    pos: usize,
}

impl BufferedPrinter {
    const fn new(output: fn(&str)) -> Self {
        Self {
            output,
            buffer: [0; PRINT_BUFFER_SIZE],
            pos: 0,
        }
    }

    fn flush(&mut self) {
        if self.pos > 0 {
            // Only whole `str`s are copied in, and a full buffer is flushed
            // on a char boundary, so the contents are UTF-8.
            if let Ok(s) = core::str::from_utf8(&self.buffer[..self.pos]) {
                (self.output)(s);
            }
            self.pos = 0;
        }
    }
}

impl Write for BufferedPrinter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for ch in s.chars() {
            let mut utf8 = [0; 4];
            let bytes = ch.encode_utf8(&mut utf8).as_bytes();
            if self.pos + bytes.len() > PRINT_BUFFER_SIZE {
                self.flush();
            }
            self.buffer[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
            self.pos += bytes.len();
        }
        Ok(())
    }
}

impl Drop for BufferedPrinter {
    fn drop(&mut self) {
        self.flush();
    }
}

pub fn _print(args: fmt::Arguments) {
    let Some(&output) = OUTPUT.get() else {
        return;
    };
    let _guard = PRINT_LOCK.lock();

    let mut printer = BufferedPrinter::new(output);
    // Ignore write errors - printing should not panic
    let _ = printer.write_fmt(args);
}

/// Console print operation.
#[macro_export]
macro_rules! kprint {
    ($($arg:tt)*) => ({
        $crate::console::print::_print(format_args!($($arg)*))
    });
}

/// Console print operation with newline.
#[macro_export]
macro_rules! kprintln {
    () => ($crate::kprint!("\n"));
    ($($arg:tt)*) => ($crate::kprint!("{}\n", format_args!($($arg)*)));
}
