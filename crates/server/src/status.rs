use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Connection facts shared by the gateway adapter, console and health endpoint.
pub struct BotStatus {
    started_at: Instant,
    connected: AtomicBool,
    guilds: AtomicUsize,
    user_name: RwLock<Option<String>>,
}

impl BotStatus {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            connected: AtomicBool::new(false),
            guilds: AtomicUsize::new(0),
            user_name: RwLock::new(None),
        }
    }

    pub fn mark_ready(&self, user_name: &str, guilds: usize) {
        if let Ok(mut name) = self.user_name.write() {
            *name = Some(user_name.to_owned());
        }
        self.guilds.store(guilds, Ordering::Relaxed);
        self.connected.store(true, Ordering::Relaxed);
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Relaxed);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    pub fn guilds(&self) -> usize {
        self.guilds.load(Ordering::Relaxed)
    }

    pub fn user_name(&self) -> Option<String> {
        self.user_name.read().ok().and_then(|name| name.clone())
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl Default for BotStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// `1d 02:03:04` style uptime.
pub fn format_uptime(uptime: Duration) -> String {
    let total = uptime.as_secs();
    let (days, rest) = (total / 86_400, total % 86_400);
    let clock = format!("{:02}:{:02}:{:02}", rest / 3_600, rest % 3_600 / 60, rest % 60);
    if days > 0 {
        format!("{days}d {clock}")
    } else {
        clock
    }
}
