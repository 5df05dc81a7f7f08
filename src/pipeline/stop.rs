use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Cooperative stop request for the live loop.
///
/// Clones share one flag. The loop polls it once per iteration, so a stop
/// takes effect after at most one more frame.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    stopped: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Raise this signal from a background thread when a line reading `q`
    /// arrives on `input`.
    ///
    /// The thread exits after the stop, at end of input, or on a read error.
    /// End of input does not stop the loop.
    pub fn stop_on_quit_line<R>(&self, input: R) -> JoinHandle<()>
    where
        R: BufRead + Send + 'static,
    {
        let signal = self.clone();
        std::thread::spawn(move || {
            for line in input.lines() {
                let Ok(line) = line else { break };
                if line.trim().eq_ignore_ascii_case("q") {
                    tracing::info!("Stop requested");
                    signal.stop();
                    break;
                }
            }
        })
    }
}
