// Periodic progress sync for the open player

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::{PlaybackContext, PlayerPhase, PlayerState};

const MIN_SYNC_INTERVAL: Duration = Duration::from_secs(1);

/// Save the current position locally, then push it to the server.
///
/// The book id and position are read from the shared state at call time. With
/// `only_while_playing` set nothing happens unless the player is playing. A
/// remote failure is logged and dropped; the next push sends the latest
/// absolute position anyway.
pub(super) async fn push_progress(
    ctx: &PlaybackContext,
    state: &Mutex<PlayerState>,
    only_while_playing: bool,
) {
    let (book_id, current_time, duration) = {
        let mut st = state.lock().await;
        if only_while_playing && st.phase != PlayerPhase::Playing {
            return;
        }
        st.refresh();
        let Some(book) = st.book.as_ref() else {
            return;
        };
        (book.id.clone(), st.current_time, st.duration)
    };

    if let Err(e) = ctx.store.upsert_session(&book_id, current_time, duration).await {
        tracing::error!(error = %e, %book_id, "failed to save playback session");
    }
    match ctx
        .backend
        .report_progress(&ctx.token, &book_id, current_time, duration)
        .await
    {
        Ok(()) => tracing::debug!(%book_id, current_time, "progress synced"),
        Err(e) => tracing::warn!(error = %e, %book_id, "progress sync failed"),
    }
}

/// Tick every `sync_interval`, first tick one period after start.
pub(super) fn spawn_sync(ctx: Arc<PlaybackContext>, state: Arc<Mutex<PlayerState>>) -> JoinHandle<()> {
    let period = ctx.settings.sync_interval.max(MIN_SYNC_INTERVAL);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            push_progress(&ctx, &state, true).await;
        }
    })
}
