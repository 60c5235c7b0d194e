//! Periodic console rendering of the acquisition summary.

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossbeam::channel::{tick, Receiver};
use crossbeam::select;
use typed_builder::TypedBuilder;

use crate::acq::AcqResults;
use crate::Result;

/// Renders the current acquisition summary on a fixed cadence until told to
/// quit.
///
/// The monitor only reads the shared store; it is scheduled independently of
/// message arrival, so the report cadence does not follow the receiver's.
#[derive(TypedBuilder)]
pub struct Monitor {
    results: Arc<Mutex<AcqResults>>,
    /// Render cadence.
    #[builder(default = Duration::from_millis(100))]
    interval: Duration,
    /// Number of most-recent records shown in each report.
    #[builder(default = 32)]
    tail: usize,
    /// SNR threshold for the qualifying-satellite mean.
    #[builder(default = 25.0)]
    threshold: f32,
}

impl Monitor {
    /// Run until `quit` is signalled or its sender dropped, then return
    /// without raising.
    ///
    /// # Errors
    /// [`crate::Error::Io`] if the summary cannot be written to `out`.
    pub fn run<W: Write>(&self, out: &mut W, quit: &Receiver<()>) -> Result<()> {
        let ticker = tick(self.interval);
        loop {
            select! {
                recv(ticker) -> _ => {
                    let report = {
                        let results = self
                            .results
                            .lock()
                            .expect("acquisition results lock poisoned");
                        results.summary(self.tail, self.threshold)
                    };
                    writeln!(out, "{report}")?;
                    out.flush()?;
                }
                recv(quit) -> _ => return Ok(()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use crossbeam::channel::bounded;

    use super::*;
    use crate::acq::AcqRecord;

    #[test]
    fn renders_until_quit() {
        let results = AcqResults::shared(0);
        results
            .lock()
            .unwrap()
            .ingest(AcqRecord { sat: 3, snr: 30.0 });

        let (quit_tx, quit_rx) = bounded(1);
        let monitor = Monitor::builder()
            .results(results)
            .interval(Duration::from_millis(5))
            .build();

        let handle = thread::spawn(move || {
            let mut out = Vec::new();
            monitor.run(&mut out, &quit_rx).unwrap();
            out
        });
        thread::sleep(Duration::from_millis(50));
        quit_tx.send(()).unwrap();

        let out = handle.join().unwrap();
        let report = String::from_utf8(out).unwrap();
        assert!(report.contains("PRN  3, SNR:  30.00"));
        assert!(report.contains("Max SNR         :  30.00"));
    }

    #[test]
    fn dropped_quit_sender_ends_the_loop() {
        let (quit_tx, quit_rx) = bounded::<()>(1);
        drop(quit_tx);

        let monitor = Monitor::builder()
            .results(AcqResults::shared(0))
            .interval(Duration::from_secs(60))
            .build();

        let mut out = Vec::new();
        monitor.run(&mut out, &quit_rx).unwrap();
        assert!(out.is_empty(), "no tick should fire before quit");
    }
}
