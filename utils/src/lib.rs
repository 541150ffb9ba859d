use std::io::BufWriter;
use std::io::Cursor;
use std::io::Write;

enum LogOrWrite {
    Log(Cursor<Vec<u8>>),
    Write(BufWriter<Box<dyn Write>>),
}

impl LogOrWrite {
    fn contents(&self) -> Option<String> {
        match self {
            LogOrWrite::Log(inner) => Some(String::from_utf8_lossy(inner.get_ref()).into_owned()),
            LogOrWrite::Write(_) => None,
        }
    }
}

impl Write for LogOrWrite {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            LogOrWrite::Log(inner) => inner.write(buf),
            LogOrWrite::Write(inner) => inner.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            LogOrWrite::Log(_) => Ok(()),
            LogOrWrite::Write(inner) => inner.flush(),
        }
    }

    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        match self {
            LogOrWrite::Log(inner) => inner.write_all(buf),
            LogOrWrite::Write(inner) => inner.write_all(buf),
        }
    }
}

/// Sink for messages meant for the person running the analysis, as opposed
/// to the `log` output meant for developers. Either forwards to two writers
/// or keeps everything in memory so tests can inspect it.
pub struct DiagnosticEmitter {
    out: LogOrWrite,
    err: LogOrWrite,
    warnings: usize,
    errors: usize,
}

impl DiagnosticEmitter {
    pub fn new(out: Box<dyn Write>, err: Box<dyn Write>) -> Self {
        Self {
            out: LogOrWrite::Write(BufWriter::new(out)),
            err: LogOrWrite::Write(BufWriter::new(err)),
            warnings: 0,
            errors: 0,
        }
    }

    pub fn log_to_buffer() -> Self {
        Self {
            out: LogOrWrite::Log(Cursor::new(Vec::new())),
            err: LogOrWrite::Log(Cursor::new(Vec::new())),
            warnings: 0,
            errors: 0,
        }
    }

    pub fn to_stdio() -> Self {
        Self::new(Box::new(std::io::stdout()), Box::new(std::io::stderr()))
    }

    pub fn out(&mut self, msg: &str) {
        let _ = self.out.write_all(msg.as_bytes());
    }

    pub fn out_ln(&mut self, msg: &str) {
        self.out(msg);
        self.out("\n");
    }

    pub fn err(&mut self, msg: &str) {
        let _ = self.err.write_all(msg.as_bytes());
    }

    pub fn err_ln(&mut self, msg: &str) {
        self.err(msg);
        self.err("\n");
    }

    pub fn out_buffer(&self) -> Option<String> {
        self.out.contents()
    }

    pub fn err_buffer(&self) -> Option<String> {
        self.err.contents()
    }

    pub fn error(&mut self, line: u32, message: &str) {
        self.report(line, "Error", message);
        self.errors += 1;
    }

    pub fn warning(&mut self, line: u32, message: &str) {
        self.report(line, "Warning", message);
        self.warnings += 1;
    }

    pub fn report(&mut self, line: u32, severity: &str, message: &str) {
        self.err_ln(&format!("[line {line}] {severity}: {message}"));
    }

    pub fn warning_count(&self) -> usize {
        self.warnings
    }

    pub fn error_count(&self) -> usize {
        self.errors
    }

    pub fn flush(&mut self) {
        let _ = self.out.flush();
        let _ = self.err.flush();
    }
}

impl Default for DiagnosticEmitter {
    fn default() -> Self {
        Self::log_to_buffer()
    }
}

impl Drop for DiagnosticEmitter {
    fn drop(&mut self) {
        self.flush();
    }
}

#[cfg(test)]
mod emitter_tests;
