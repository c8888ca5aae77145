/// Poll-and-repair loop for the wireless interface.
///
/// Each tick queries the power state and powers the interface back on when
/// it is off. Query and enable failures are transient: they are reported and
/// the loop keeps its schedule. Only the cancellation signal ends the loop,
/// which lets tests run a bounded number of ticks against a fake control.
use crate::netctl::{ControlError, SystemControl};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::interval;
use tracing::{debug, info};

/// What a single tick did.
#[derive(Debug)]
pub enum TickOutcome {
    /// Interface already powered; nothing to do.
    AlreadyOn,
    /// Interface was off and the enable command succeeded.
    Enabled,
    /// Interface was off and the enable command failed.
    EnableFailed(ControlError),
    /// The power-state query itself failed.
    QueryFailed(ControlError),
}

/// Run one check-and-repair pass, reporting the outcome on the console.
///
/// The enable outcome is the command's exit status; the state is not
/// re-verified within the same tick.
pub fn run_tick<C: SystemControl>(control: &C) -> TickOutcome {
    match control.interface_power() {
        Err(err) => {
            eprintln!("Failed to query Wi-Fi power state: {err}");
            TickOutcome::QueryFailed(err)
        }
        Ok(true) => {
            println!("Wi-Fi is on.");
            TickOutcome::AlreadyOn
        }
        Ok(false) => {
            println!("Wi-Fi is not enabled, attempting to turn it on...");
            match control.set_interface_power(true) {
                Ok(()) => {
                    println!("Wi-Fi successfully enabled.");
                    TickOutcome::Enabled
                }
                Err(err) => {
                    eprintln!("Failed to enable Wi-Fi: {err}");
                    TickOutcome::EnableFailed(err)
                }
            }
        }
    }
}

/// Drive `run_tick` on a fixed interval until `shutdown` fires.
///
/// The first tick runs immediately; no outcome, including repeated failures,
/// ever breaks the schedule.
pub async fn run<C: SystemControl>(
    control: &C,
    poll_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(poll_interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let outcome = run_tick(control);
                debug!(?outcome, "poll tick completed");
            }
            _ = shutdown.changed() => {
                info!("monitor loop shutting down");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::time::timeout;

    fn query_error() -> ControlError {
        ControlError::Failed {
            command: "networksetup -getairportpower en0".to_string(),
            code: Some(1),
        }
    }

    /// Scripted power-state responses; counts queries and enable calls.
    struct FakeControl {
        power: Mutex<VecDeque<Result<bool, ControlError>>>,
        queries: AtomicUsize,
        enables: AtomicUsize,
        fail_enable: bool,
    }

    impl FakeControl {
        fn scripted(responses: Vec<Result<bool, ControlError>>) -> Self {
            Self {
                power: Mutex::new(responses.into()),
                queries: AtomicUsize::new(0),
                enables: AtomicUsize::new(0),
                fail_enable: false,
            }
        }

        fn with_failing_enable(mut self) -> Self {
            self.fail_enable = true;
            self
        }

        fn queries(&self) -> usize {
            self.queries.load(Ordering::SeqCst)
        }

        fn enables(&self) -> usize {
            self.enables.load(Ordering::SeqCst)
        }
    }

    impl SystemControl for FakeControl {
        fn interface_power(&self) -> Result<bool, ControlError> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            // Once the script runs out, report powered-on.
            self.power.lock().unwrap().pop_front().unwrap_or(Ok(true))
        }

        fn set_interface_power(&self, on: bool) -> Result<(), ControlError> {
            assert!(on, "the guard only ever powers the interface on");
            self.enables.fetch_add(1, Ordering::SeqCst);
            if self.fail_enable {
                return Err(ControlError::Failed {
                    command: "networksetup -setairportpower en0 on".to_string(),
                    code: Some(1),
                });
            }
            Ok(())
        }

        fn register_agent(&self, _descriptor: &Path) -> Result<(), ControlError> {
            Ok(())
        }
    }

    /// Poll until `cond` holds, failing the test after half a second.
    async fn wait_for(mut cond: impl FnMut() -> bool) {
        timeout(Duration::from_millis(500), async {
            while !cond() {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[test]
    fn tick_reports_powered_on_without_enabling() {
        let control = FakeControl::scripted(vec![Ok(true)]);
        let outcome = run_tick(&control);
        assert!(matches!(outcome, TickOutcome::AlreadyOn));
        assert_eq!(control.enables(), 0);
    }

    #[test]
    fn tick_enables_when_powered_off() {
        let control = FakeControl::scripted(vec![Ok(false)]);
        let outcome = run_tick(&control);
        assert!(matches!(outcome, TickOutcome::Enabled));
        assert_eq!(control.enables(), 1);
    }

    #[test]
    fn tick_surfaces_enable_failure() {
        let control = FakeControl::scripted(vec![Ok(false)]).with_failing_enable();
        let outcome = run_tick(&control);
        assert!(matches!(outcome, TickOutcome::EnableFailed(_)));
    }

    #[test]
    fn tick_surfaces_query_failure_without_enabling() {
        let control = FakeControl::scripted(vec![Err(query_error())]);
        let outcome = run_tick(&control);
        assert!(matches!(outcome, TickOutcome::QueryFailed(_)));
        assert_eq!(control.enables(), 0);
    }

    #[tokio::test]
    async fn loop_enables_within_first_tick_and_keeps_running() {
        let control = Arc::new(FakeControl::scripted(vec![Ok(false)]));
        let (tx, rx) = watch::channel(false);

        let task = {
            let control = Arc::clone(&control);
            tokio::spawn(async move { run(&*control, Duration::from_millis(5), rx).await })
        };

        wait_for(|| control.enables() == 1).await;
        // Still polling after the repair.
        wait_for(|| control.queries() >= 3).await;
        assert!(!task.is_finished());

        tx.send(true).unwrap();
        timeout(Duration::from_millis(500), task)
            .await
            .expect("loop did not stop on shutdown")
            .unwrap();
    }

    #[tokio::test]
    async fn loop_survives_query_failures() {
        let control = Arc::new(FakeControl::scripted(vec![
            Err(query_error()),
            Err(query_error()),
            Ok(true),
        ]));
        let (tx, rx) = watch::channel(false);

        let task = {
            let control = Arc::clone(&control);
            tokio::spawn(async move { run(&*control, Duration::from_millis(5), rx).await })
        };

        // Ticks keep firing on schedule past both failures.
        wait_for(|| control.queries() >= 4).await;
        assert!(!task.is_finished());
        assert_eq!(control.enables(), 0);

        tx.send(true).unwrap();
        timeout(Duration::from_millis(500), task)
            .await
            .expect("loop did not stop on shutdown")
            .unwrap();
    }

    #[tokio::test]
    async fn loop_stops_on_shutdown_signal() {
        let control = Arc::new(FakeControl::scripted(vec![]));
        let (tx, rx) = watch::channel(false);

        let task = {
            let control = Arc::clone(&control);
            tokio::spawn(async move { run(&*control, Duration::from_secs(3600), rx).await })
        };

        // First tick fires immediately even with a long interval.
        wait_for(|| control.queries() == 1).await;

        tx.send(true).unwrap();
        timeout(Duration::from_millis(500), task)
            .await
            .expect("loop did not stop on shutdown")
            .unwrap();
    }
}
