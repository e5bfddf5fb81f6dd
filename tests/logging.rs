use std::io::Write;
use std::sync::{Arc, Mutex};

use tracing::Level;

use lkffb::{FilterConfig, Lkffb, Retention};

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Captured {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

fn capture<F: FnOnce()>(f: F) -> String {
    let sink = Captured::default();
    let writer = sink.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(Level::TRACE)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    sink.text()
}

#[test]
fn logs_skips_and_run_start() {
    let config = FilterConfig {
        n_train: 6,
        n_testbefore: 2,
        n_predict: 2,
        oe: 0.1,
        rk: 0.1,
        freq_basis: vec![0.1],
        skip_msmts: 3,
        ..Default::default()
    };
    let filter = Lkffb::new(config).unwrap();
    let log = capture(|| {
        filter.run(&[1.0; 8], Retention::Minimal).unwrap();
    });
    assert!(log.contains("starting LKFFB run"), "{log}");
    assert!(log.contains("zero-state noise feature substituted"), "{log}");
    // Steps 1, 2, 4, 5 are skipped
    assert_eq!(log.matches("measurement skipped").count(), 4, "{log}");
}

#[test]
fn logs_abort() {
    let config = FilterConfig {
        n_train: 3,
        n_predict: 1,
        x0: 1.0,
        p0: 0.0,
        oe: 0.0,
        rk: 0.0,
        freq_basis: vec![0.2],
        ..Default::default()
    };
    let filter = Lkffb::new(config).unwrap();
    let log = capture(|| {
        assert!(filter.run(&[0.0; 4], Retention::Full).is_err());
    });
    assert!(log.contains("WARN"), "{log}");
    assert!(log.contains("LKFFB run aborted"), "{log}");
}
