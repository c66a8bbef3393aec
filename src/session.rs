use parking_lot::Mutex;
use serde::Serialize;
use std::{collections::VecDeque, time::Duration};
use thiserror::Error;

pub const START_LABEL: &str = "Start upload";
pub const STOP_LABEL: &str = "Stop upload";
pub const IDLE_HINT: &str = "Press the button to start uploading";

#[derive(Error, Debug, PartialEq)]
pub enum SessionError {
    #[error("No upload endpoint at index {0}")]
    UnknownEndpoint(usize),
    #[error("Capture interval must be a positive number of seconds, got {0}")]
    InvalidInterval(f32),
}

/// Accumulates elapsed wall-clock time and fires at most once per interval.
#[derive(Debug, Default)]
pub struct CaptureTimer {
    elapsed: Duration,
}

impl CaptureTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time keeps accumulating while `active` is false, so the first tick after
    /// uploads are switched on fires right away if a full interval has passed.
    pub fn tick(&mut self, delta: Duration, interval: Duration, active: bool) -> bool {
        self.elapsed += delta;
        if active && self.elapsed >= interval {
            self.elapsed = Duration::ZERO;
            return true;
        }
        false
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

/// Text lines shown to the operator, oldest first.
pub struct ActivityLog {
    lines: Mutex<VecDeque<String>>,
    max_lines: usize,
}

impl ActivityLog {
    pub fn new(max_lines: usize) -> Self {
        Self {
            lines: Mutex::new(VecDeque::new()),
            max_lines: max_lines.max(1),
        }
    }

    pub fn push(&self, line: impl Into<String>) {
        let mut lines = self.lines.lock();
        if lines.len() == self.max_lines {
            lines.pop_front();
        }
        lines.push_back(line.into());
    }

    pub fn replace(&self, line: Option<&str>) {
        let mut lines = self.lines.lock();
        lines.clear();
        if let Some(line) = line {
            lines.push_back(line.to_string());
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().iter().cloned().collect()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UploadStatus {
    pub uploading: bool,
    pub url: String,
    pub interval_secs: f32,
    pub button_label: &'static str,
}

#[derive(Debug, Clone)]
struct SessionState {
    uploading: bool,
    url: String,
    interval: Duration,
}

/// Upload on/off switch together with the URL and interval it was started with.
pub struct UploadSession {
    endpoints: Vec<String>,
    state: Mutex<SessionState>,
    log: ActivityLog,
}

impl UploadSession {
    pub fn new(endpoints: Vec<String>, default_interval_secs: f32, max_log_lines: usize) -> Self {
        let url = endpoints.first().cloned().unwrap_or_default();
        let interval = Duration::try_from_secs_f32(default_interval_secs)
            .unwrap_or(Duration::from_secs(3));
        Self {
            endpoints,
            state: Mutex::new(SessionState {
                uploading: false,
                url,
                interval,
            }),
            log: ActivityLog::new(max_log_lines),
        }
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    pub fn log(&self) -> &ActivityLog {
        &self.log
    }

    /// Starts uploading to `endpoints[endpoint]` every `interval_secs`, or stops
    /// if already uploading. Arguments are ignored when stopping.
    pub fn toggle(&self, endpoint: usize, interval_secs: f32) -> Result<UploadStatus, SessionError> {
        let mut state = self.state.lock();
        if state.uploading {
            state.uploading = false;
            self.log.replace(Some(IDLE_HINT));
            tracing::info!("Upload stopped");
            return Ok(Self::status_of(&state));
        }

        let url = self
            .endpoints
            .get(endpoint)
            .ok_or(SessionError::UnknownEndpoint(endpoint))?;
        if !interval_secs.is_finite() || interval_secs <= 0.0 {
            return Err(SessionError::InvalidInterval(interval_secs));
        }
        let interval = Duration::try_from_secs_f32(interval_secs)
            .map_err(|_| SessionError::InvalidInterval(interval_secs))?;

        state.url = url.clone();
        state.interval = interval;
        state.uploading = true;
        self.log.replace(None);
        tracing::info!(url = %state.url, interval_secs, "Upload started");

        Ok(Self::status_of(&state))
    }

    pub fn status(&self) -> UploadStatus {
        Self::status_of(&self.state.lock())
    }

    /// `(uploading, url, interval)` as one consistent read.
    pub fn snapshot(&self) -> (bool, String, Duration) {
        let state = self.state.lock();
        (state.uploading, state.url.clone(), state.interval)
    }

    fn status_of(state: &SessionState) -> UploadStatus {
        UploadStatus {
            uploading: state.uploading,
            url: state.url.clone(),
            interval_secs: state.interval.as_secs_f32(),
            button_label: if state.uploading {
                STOP_LABEL
            } else {
                START_LABEL
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> UploadSession {
        UploadSession::new(
            vec![
                "http://localhost:8001/upload".into(),
                "http://localhost:8002/upload".into(),
            ],
            3.0,
            10,
        )
    }

    #[test]
    fn test_timer_fires_once_per_interval() {
        let mut timer = CaptureTimer::new();
        let interval = Duration::from_secs(1);
        let step = Duration::from_millis(400);

        assert!(!timer.tick(step, interval, true));
        assert!(!timer.tick(step, interval, true));
        assert!(timer.tick(step, interval, true));
        assert_eq!(timer.elapsed(), Duration::ZERO);

        // A single long gap still triggers only once.
        assert!(timer.tick(Duration::from_secs(5), interval, true));
        assert!(!timer.tick(Duration::ZERO, interval, true));
    }

    #[test]
    fn test_timer_accumulates_while_inactive() {
        let mut timer = CaptureTimer::new();
        let interval = Duration::from_secs(3);

        assert!(!timer.tick(Duration::from_secs(10), interval, false));
        assert_eq!(timer.elapsed(), Duration::from_secs(10));
        assert!(timer.tick(Duration::ZERO, interval, true));
    }

    #[test]
    fn test_toggle_starts_and_stops() {
        let session = session();
        assert_eq!(session.status().button_label, START_LABEL);
        session.log().push("stale");

        let status = session.toggle(1, 0.5).unwrap();
        assert!(status.uploading);
        assert_eq!(status.url, "http://localhost:8002/upload");
        assert_eq!(status.interval_secs, 0.5);
        assert_eq!(status.button_label, STOP_LABEL);
        assert!(session.log().lines().is_empty());

        let status = session.toggle(0, 10.0).unwrap();
        assert!(!status.uploading);
        // Stopping keeps the URL it was started with.
        assert_eq!(status.url, "http://localhost:8002/upload");
        assert_eq!(status.button_label, START_LABEL);
        assert_eq!(session.log().lines(), vec![IDLE_HINT.to_string()]);
    }

    #[test]
    fn test_toggle_rejects_bad_arguments() {
        let session = session();
        assert_eq!(session.toggle(5, 1.0), Err(SessionError::UnknownEndpoint(5)));
        assert_eq!(session.toggle(0, 0.0), Err(SessionError::InvalidInterval(0.0)));
        assert_eq!(session.toggle(0, -2.0), Err(SessionError::InvalidInterval(-2.0)));
        assert!(session.toggle(0, f32::NAN).is_err());
        assert!(!session.status().uploading);
    }

    #[test]
    fn test_log_drops_oldest_lines() {
        let log = ActivityLog::new(2);
        log.push("a");
        log.push("b");
        log.push("c");
        assert_eq!(log.lines(), vec!["b".to_string(), "c".to_string()]);
    }
}
