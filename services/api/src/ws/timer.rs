//! Per-connection timer jobs.
//!
//! A timer is a detached task holding only a weak reference to its connection.
//! When it fires it upgrades the reference, checks that the connection is still
//! open and queues a `timer_complete` message. If the connection is gone the
//! completion is discarded without error.

use super::{connection::Connection, protocol::ServerMessage};
use std::{
    collections::HashMap,
    sync::{
        Mutex, MutexGuard,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};
use tokio::{task::JoinHandle, time::Instant};
use tracing::{Instrument, debug, info, info_span, warn};

pub type TimerId = u64;

struct TimerJob {
    duration_seconds: u64,
    armed_at: Instant,
    handle: JoinHandle<()>,
}

/// The outstanding timers of one connection.
#[derive(Default)]
pub struct TimerRegistry {
    next_id: AtomicU64,
    jobs: Mutex<HashMap<TimerId, TimerJob>>,
}

impl TimerRegistry {
    fn jobs(&self) -> MutexGuard<'_, HashMap<TimerId, TimerJob>> {
        self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of timers armed but not yet fired.
    pub fn outstanding(&self) -> usize {
        self.jobs().len()
    }

    /// Seconds left on each outstanding timer, ordered by id.
    pub fn remaining(&self) -> Vec<(TimerId, u64)> {
        let now = Instant::now();
        let mut remaining: Vec<_> = self
            .jobs()
            .iter()
            .map(|(id, job)| {
                let elapsed = now.saturating_duration_since(job.armed_at).as_secs();
                (*id, job.duration_seconds.saturating_sub(elapsed))
            })
            .collect();
        remaining.sort_unstable();
        remaining
    }

    fn finish(&self, id: TimerId) {
        self.jobs().remove(&id);
    }
}

impl Drop for TimerRegistry {
    fn drop(&mut self) {
        let jobs = self.jobs.get_mut().unwrap_or_else(|p| p.into_inner());
        for (_, job) in jobs.drain() {
            job.handle.abort();
        }
    }
}

/// Arms a timer on `connection` that completes after `duration_seconds`.
///
/// Returns immediately. A zero duration is rejected and nothing is armed.
pub fn arm(connection: &Connection, duration_seconds: u64) -> Option<TimerId> {
    if duration_seconds == 0 {
        warn!("Ignoring timer with zero duration");
        return None;
    }

    let registry = connection.timers();
    let id = registry.next_id.fetch_add(1, Ordering::Relaxed);
    let weak = connection.downgrade();
    let span = info_span!("timer", timer_id = id, duration_seconds);

    // Hold the lock across the spawn so the job is registered before it can finish.
    let mut jobs = registry.jobs();
    let handle = tokio::spawn(
        async move {
            tokio::time::sleep(Duration::from_secs(duration_seconds)).await;

            let Some(connection) = weak.upgrade() else {
                debug!("Connection dropped before timer fired, discarding");
                return;
            };
            connection.timers().finish(id);

            if !connection.is_open() {
                debug!("Connection closed before timer fired, discarding");
                return;
            }
            match connection
                .send(ServerMessage::timer_complete(duration_seconds))
                .await
            {
                Ok(()) => info!("Timer fired"),
                Err(e) => debug!(error = %e, "Timer completion discarded"),
            }
        }
        .instrument(span),
    );
    jobs.insert(
        id,
        TimerJob {
            duration_seconds,
            armed_at: Instant::now(),
            handle,
        },
    );
    info!(timer_id = id, duration_seconds, "Timer armed");
    Some(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::error::TryRecvError;

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_exactly_once() {
        let (conn, mut rx) = Connection::new(8);
        let id = arm(&conn, 2).expect("timer should be armed");
        assert_eq!(conn.timers().outstanding(), 1);
        assert_eq!(conn.timers().remaining(), vec![(id, 2)]);

        tokio::time::sleep(Duration::from_millis(1999)).await;
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));

        assert_eq!(rx.recv().await, Some(ServerMessage::timer_complete(2)));
        assert_eq!(conn.timers().outstanding(), 0);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timers_fire_in_deadline_order() {
        let (conn, mut rx) = Connection::new(8);
        arm(&conn, 120);
        arm(&conn, 60);

        assert_eq!(rx.recv().await, Some(ServerMessage::timer_complete(60)));
        assert_eq!(rx.recv().await, Some(ServerMessage::timer_complete(120)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_duration_is_not_armed() {
        let (conn, mut rx) = Connection::new(8);
        assert_eq!(arm(&conn, 0), None);
        assert_eq!(conn.timers().outstanding(), 0);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_connection_discards_completion() {
        let (conn, mut rx) = Connection::new(8);
        arm(&conn, 5);
        conn.close();

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
        assert_eq!(conn.timers().outstanding(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_connection_aborts_timers() {
        let (conn, mut rx) = Connection::new(8);
        arm(&conn, 5);
        drop(conn);

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(matches!(
            rx.try_recv(),
            Err(TryRecvError::Disconnected | TryRecvError::Empty)
        ));
    }
}
