//! Zombie predicate and the background heartbeat thread.

use crate::checkpoint::{Checkpoint, CheckpointStatus};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A running checkpoint whose owning process is dead/unreadable and whose
/// heartbeat is stale is a zombie. Stale is `age > timeout`: heartbeat age
/// exactly equal to the timeout still counts as fresh.
pub fn is_zombie(ckpt: &Checkpoint, timeout: Duration) -> bool {
    if ckpt.status != CheckpointStatus::Running {
        return false;
    }
    let pid_dead = ckpt.pid.map(|pid| !pid_alive(pid)).unwrap_or(true);
    if !pid_dead {
        return false;
    }
    let age = Utc::now().signed_duration_since(ckpt.last_heartbeat);
    let age_secs = age.num_seconds().max(0) as u64;
    age_secs > timeout.as_secs()
}

#[cfg(unix)]
fn pid_alive(pid: u32) -> bool {
    // A pid above i32::MAX can't be a real process id; treat it as dead
    // rather than let the cast wrap negative, which would turn `kill` into
    // a broadcast-signal permission check instead of a single-pid probe.
    let Ok(pid) = i32::try_from(pid) else {
        return false;
    };
    extern "C" {
        #[link_name = "kill"]
        fn libc_kill(pid: i32, sig: i32) -> i32;
    }
    unsafe { libc_kill(pid, 0) == 0 }
}

#[cfg(not(unix))]
fn pid_alive(_pid: u32) -> bool {
    true
}

/// Background thread that periodically stamps `last_heartbeat` on the
/// on-disk checkpoint. Re-reads from disk rather than an in-memory copy on
/// every tick, since worker threads may have written their own updates
/// concurrently — this is the only cross-thread mutation of the checkpoint
/// file other than a state-machine transition.
pub struct HeartbeatThread {
    handle: Option<std::thread::JoinHandle<()>>,
    stop: Arc<AtomicBool>,
}

impl HeartbeatThread {
    pub fn spawn(path: PathBuf, interval: Duration) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_clone = stop.clone();
        let handle = std::thread::spawn(move || {
            while !stop_clone.load(Ordering::Relaxed) {
                std::thread::sleep(interval);
                if stop_clone.load(Ordering::Relaxed) {
                    break;
                }
                if let Ok(mut ckpt) = Checkpoint::load(&path) {
                    ckpt.update_heartbeat();
                    let _ = ckpt.save(&path);
                }
            }
        });
        Self {
            handle: Some(handle),
            stop,
        }
    }

    pub fn stop(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

impl Drop for HeartbeatThread {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}
