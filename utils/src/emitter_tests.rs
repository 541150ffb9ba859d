use super::*;
use std::sync::{Arc, Mutex};

#[test]
fn buffered_warnings_and_errors() {
    let mut diag = DiagnosticEmitter::log_to_buffer();
    diag.warning(3, "cannot resolve `a.b`");
    diag.error(7, "bad directive");
    assert_eq!(
        diag.err_buffer().as_deref(),
        Some("[line 3] Warning: cannot resolve `a.b`\n[line 7] Error: bad directive\n")
    );
    assert_eq!(diag.warning_count(), 1);
    assert_eq!(diag.error_count(), 1);
    assert_eq!(diag.out_buffer().as_deref(), Some(""));
}

#[test]
fn output_stream_is_separate() {
    let mut diag = DiagnosticEmitter::log_to_buffer();
    diag.out_ln("x: [0, 5]");
    assert_eq!(diag.out_buffer().as_deref(), Some("x: [0, 5]\n"));
    assert_eq!(diag.err_buffer().as_deref(), Some(""));
}

#[derive(Clone, Default)]
struct Shared(Arc<Mutex<Vec<u8>>>);

impl Write for Shared {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn writers_receive_output_after_flush() {
    let out = Shared::default();
    let err = Shared::default();
    {
        let mut diag = DiagnosticEmitter::new(Box::new(out.clone()), Box::new(err.clone()));
        diag.out("hello");
        diag.warning(1, "careful");
        assert_eq!(diag.out_buffer(), None);
    }
    assert_eq!(out.0.lock().unwrap().as_slice(), b"hello");
    assert_eq!(err.0.lock().unwrap().as_slice(), b"[line 1] Warning: careful\n");
}

struct Closed;

impl Write for Closed {
    fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
        Err(std::io::ErrorKind::BrokenPipe.into())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Err(std::io::ErrorKind::BrokenPipe.into())
    }
}

#[test]
fn closed_writers_do_not_stop_counting() {
    let mut diag = DiagnosticEmitter::new(Box::new(Closed), Box::new(Closed));
    // Larger than the write buffer, so the writer sees it right away.
    let long = "x".repeat(16 * 1024);
    diag.out_ln(&long);
    diag.warning(2, &long);
    diag.error(3, "bad directive");
    assert_eq!(diag.warning_count(), 1);
    assert_eq!(diag.error_count(), 1);
}
