//! Timeout watchers.
//!
//! Each watcher is a detached tokio task that sleeps, then re-checks the
//! session under the registry lock before acting. The session owns a
//! [`TimerHandle`] for the task, so cancelling is just dropping that handle.
//! A watcher that wakes up after its session moved on does nothing.

use std::sync::Weak;
use std::time::Duration;

use log::{debug, info};
use tokio::time::sleep;

use crate::engine::Shared;
use crate::results::ResultKind;
use crate::session::{SessionId, SessionKind, SessionStatus, TimerHandle};

/// Discard `id` if it is still waiting for an opponent after `delay`.
pub(crate) fn spawn_join_watcher(shared: Weak<Shared>, id: SessionId, delay: Duration) -> TimerHandle {
    let task = tokio::spawn(async move {
        sleep(delay).await;
        let Some(shared) = shared.upgrade() else {
            return;
        };
        let mut reg = shared.registry.lock().await;
        let Some(session) = reg.get_mut(&id) else {
            debug!("join watcher for {} woke up after the session was removed", id);
            return;
        };
        if session.status != SessionStatus::WaitingForOpponent {
            return;
        }
        if let Some(timer) = session.join_timer.take() {
            timer.disarm();
        }
        reg.delete_session(&id);
        info!("session {} expired: nobody joined within {:?}", id, delay);
    });
    TimerHandle::new(task.abort_handle())
}

/// Forfeit the flagged player unless they move within `delay`. `watch_id`
/// identifies the complaint so a later one is not mistaken for this one.
pub(crate) fn spawn_idle_watcher(
    shared: Weak<Shared>,
    id: SessionId,
    watch_id: u64,
    delay: Duration,
) -> TimerHandle {
    let task = tokio::spawn(async move {
        sleep(delay).await;
        let Some(shared) = shared.upgrade() else {
            return;
        };
        let mut reg = shared.registry.lock().await;
        let Some(session) = reg.get_mut(&id) else {
            return;
        };
        if session.status != SessionStatus::Active {
            return;
        }
        let SessionKind::Pvp(pvp) = &mut session.kind else {
            return;
        };
        let Some(watch) = pvp.idle_watch.take_if(|w| w.id == watch_id) else {
            debug!("idle watch {} on {} was superseded", watch_id, id);
            return;
        };
        let flagger = watch.flagged_by;
        watch.timer.disarm();
        if session.turn == flagger {
            // The flagged player already handed the turn back.
            return;
        }
        info!("session {}: idle timeout ran out, {} wins by forfeit", id, flagger);
        shared.finish(&mut reg, &id, flagger, ResultKind::Forfeiture);
    });
    TimerHandle::new(task.abort_handle())
}
