use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use pixgate_contracts::progress::{ProgressMeter, PROGRESS_MAX_STEP, PROGRESS_TICK_MS};
use rand::Rng;

const STOP_POLL: Duration = Duration::from_millis(25);

type ProgressCallback = Box<dyn Fn(u8) + Send>;

/// Background thread advancing a [`ProgressMeter`] while a request is in flight.
///
/// The callback sees the starting value, every tick, and the final value from
/// [`ProgressTicker::finish`]. Dropping the ticker stops and joins the thread.
pub struct ProgressTicker {
    meter: Arc<Mutex<ProgressMeter>>,
    on_update: Arc<Mutex<ProgressCallback>>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ProgressTicker {
    pub fn spawn<F>(on_update: F) -> Self
    where
        F: Fn(u8) + Send + 'static,
    {
        Self::spawn_with_interval(Duration::from_millis(PROGRESS_TICK_MS), on_update)
    }

    pub fn spawn_with_interval<F>(interval: Duration, on_update: F) -> Self
    where
        F: Fn(u8) + Send + 'static,
    {
        let meter = ProgressMeter::started();
        on_update(meter.percent());
        let meter = Arc::new(Mutex::new(meter));
        let on_update: Arc<Mutex<ProgressCallback>> = Arc::new(Mutex::new(Box::new(on_update)));
        let stop = Arc::new(AtomicBool::new(false));
        let thread_meter = Arc::clone(&meter);
        let thread_update = Arc::clone(&on_update);
        let thread_stop = Arc::clone(&stop);

        let handle = thread::spawn(move || {
            let mut rng = rand::thread_rng();
            let mut next_tick = Instant::now() + interval;
            while !thread_stop.load(Ordering::SeqCst) {
                thread::sleep(STOP_POLL.min(interval));
                if Instant::now() < next_tick {
                    continue;
                }
                next_tick = Instant::now() + interval;
                let step = rng.gen_range(0.0..PROGRESS_MAX_STEP);
                let percent = match thread_meter.lock() {
                    Ok(mut meter) => {
                        meter.tick(step);
                        meter.percent()
                    }
                    Err(_) => break,
                };
                if thread_stop.load(Ordering::SeqCst) {
                    break;
                }
                match thread_update.lock() {
                    Ok(callback) => callback(percent),
                    Err(_) => break,
                }
            }
        });

        Self {
            meter,
            on_update,
            stop,
            handle: Some(handle),
        }
    }

    pub fn percent(&self) -> u8 {
        self.meter.lock().map(|meter| meter.percent()).unwrap_or(0)
    }

    /// Stops ticking, snaps to 100 on success or back to 0 otherwise, and
    /// reports that value to the callback.
    pub fn finish(mut self, success: bool) -> u8 {
        self.halt();
        let percent = match self.meter.lock() {
            Ok(mut meter) => {
                if success {
                    meter.complete();
                } else {
                    meter.reset();
                }
                meter.percent()
            }
            Err(_) => 0,
        };
        if let Ok(callback) = self.on_update.lock() {
            callback(percent);
        }
        percent
    }

    fn halt(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.halt();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use pixgate_contracts::progress::PROGRESS_CEILING;

    use super::*;

    #[test]
    fn ticks_never_pass_the_ceiling() {
        let (tx, rx) = mpsc::channel();
        let ticker = ProgressTicker::spawn_with_interval(Duration::from_millis(1), move |pct| {
            let _ = tx.send(pct);
        });
        thread::sleep(Duration::from_millis(300));
        assert!(f64::from(ticker.percent()) <= PROGRESS_CEILING);
        assert_eq!(ticker.finish(true), 100);

        let mut seen = rx.try_iter().collect::<Vec<u8>>();
        assert_eq!(seen.pop(), Some(100));
        assert!(!seen.is_empty());
        assert!(seen.iter().all(|pct| f64::from(*pct) <= PROGRESS_CEILING));
        assert!(seen.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn callback_sees_start_and_completion() {
        let (tx, rx) = mpsc::channel();
        let ticker = ProgressTicker::spawn_with_interval(Duration::from_millis(1), move |pct| {
            let _ = tx.send(pct);
        });
        thread::sleep(Duration::from_millis(20));
        ticker.finish(true);

        let seen = rx.try_iter().collect::<Vec<u8>>();
        assert_eq!(seen.first(), Some(&5));
        assert_eq!(seen.last(), Some(&100));
    }

    #[test]
    fn failure_resets_to_zero() {
        let (tx, rx) = mpsc::channel();
        let ticker = ProgressTicker::spawn_with_interval(Duration::from_millis(5), move |pct| {
            let _ = tx.send(pct);
        });
        assert_eq!(ticker.finish(false), 0);
        assert_eq!(rx.try_iter().last(), Some(0));
    }

    #[test]
    fn drop_stops_updates() {
        let (tx, rx) = mpsc::channel();
        {
            let _ticker = ProgressTicker::spawn_with_interval(Duration::from_millis(1), move |pct| {
                let _ = tx.send(pct);
            });
            thread::sleep(Duration::from_millis(20));
        }
        let _ = rx.try_iter().count();
        thread::sleep(Duration::from_millis(30));
        assert_eq!(rx.try_iter().count(), 0);
    }
}
