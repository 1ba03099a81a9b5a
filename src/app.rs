use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::config::AppConfig;
use crate::verse::{FetchError, Verse, VerseClient};

/// Seconds a status message stays in the info line
const STATUS_MESSAGE_SECS: u64 = 3;

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// What the card is showing. Every transition assigns this in one place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewState {
    /// A request is in flight. `previous` is the verse that was on screen
    /// when it was issued, if any.
    Loading { previous: Option<Verse> },
    Error { message: String },
    Loaded(Verse),
}

impl ViewState {
    pub fn is_loading(&self) -> bool {
        matches!(self, ViewState::Loading { .. })
    }
}

/// Messages posted back to the app by its background tasks
#[derive(Debug)]
pub enum AppEvent {
    FetchCompleted {
        seq: u64,
        result: Result<Verse, FetchError>,
    },
    RefreshDue {
        generation: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Popup {
    None,
    Help,
}

/// Periodic refresh timer. The first tick fires one full period after
/// `start`; dropping the timer aborts it.
pub struct RefreshTimer {
    generation: u64,
    handle: JoinHandle<()>,
}

impl RefreshTimer {
    pub fn start(generation: u64, period: Duration, events: mpsc::UnboundedSender<AppEvent>) -> Self {
        let first_tick = time::Instant::now() + period;
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(first_tick, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if events.send(AppEvent::RefreshDue { generation }).is_err() {
                    break;
                }
            }
        });

        Self { generation, handle }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for RefreshTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub struct App {
    pub state: ViewState,
    pub popup: Popup,
    pub should_quit: bool,

    // Status message (shown in info line, auto-clears after timeout)
    pub status_message: Option<String>,
    pub status_message_time: Option<Instant>,

    config: AppConfig,
    client: VerseClient,

    // Sequence number of the most recently issued request
    latest_seq: u64,

    timer: Option<RefreshTimer>,
    timer_generation: u64,

    events_tx: mpsc::UnboundedSender<AppEvent>,
    events_rx: mpsc::UnboundedReceiver<AppEvent>,

    started: Instant,
}

impl App {
    pub fn new(config: AppConfig, client: VerseClient) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Self {
            state: ViewState::Loading { previous: None },
            popup: Popup::None,
            should_quit: false,
            status_message: None,
            status_message_time: None,
            config,
            client,
            latest_seq: 0,
            timer: None,
            timer_generation: 0,
            events_tx,
            events_rx,
            started: Instant::now(),
        }
    }

    /// Initial load: one fetch, then the refresh timer if enabled
    pub fn start(&mut self) {
        tracing::info!(
            "Starting verse card (endpoint: {}, auto-refresh: {}, interval: {}s)",
            self.client.url(),
            self.config.auto_refresh,
            self.config.refresh_interval().as_secs()
        );

        self.fetch_verse();
        if self.config.auto_refresh {
            self.set_auto_refresh(true);
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn auto_refresh(&self) -> bool {
        self.timer.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    /// Human readable refresh period, e.g. "30 seconds"
    pub fn refresh_label(&self) -> String {
        Self::format_interval(self.config.refresh_interval().as_secs())
    }

    pub fn spinner(&self) -> &'static str {
        let frame = (self.started.elapsed().as_millis() / 100) as usize;
        SPINNER_FRAMES[frame % SPINNER_FRAMES.len()]
    }

    /// Set a status message (auto-clears after 3 seconds)
    fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
        self.status_message_time = Some(Instant::now());
    }

    /// Issue a request for a random verse. In-flight requests are not
    /// cancelled; their results are discarded when they arrive.
    pub fn fetch_verse(&mut self) -> u64 {
        let seq = self.begin_fetch();
        let client = self.client.clone();
        let events = self.events_tx.clone();

        tokio::spawn(async move {
            let result = client.fetch_random().await;
            let _ = events.send(AppEvent::FetchCompleted { seq, result });
        });

        seq
    }

    /// Bump the request sequence and move into the loading state
    fn begin_fetch(&mut self) -> u64 {
        self.latest_seq += 1;

        let previous = match std::mem::replace(&mut self.state, ViewState::Loading { previous: None }) {
            ViewState::Loaded(verse) => Some(verse),
            ViewState::Loading { previous } => previous,
            ViewState::Error { .. } => None,
        };
        self.state = ViewState::Loading { previous };

        tracing::debug!("Fetching verse (request #{})", self.latest_seq);
        self.latest_seq
    }

    /// Apply a completed request. Returns false when the result belongs to
    /// a request that has since been superseded.
    pub fn apply_fetch_result(&mut self, seq: u64, result: Result<Verse, FetchError>) -> bool {
        if seq != self.latest_seq {
            tracing::debug!(
                "Discarding stale verse response (request #{}, latest #{})",
                seq,
                self.latest_seq
            );
            return false;
        }

        self.state = match result {
            Ok(verse) => {
                tracing::info!("Loaded verse {}", verse.reference);
                ViewState::Loaded(verse)
            }
            Err(e) => {
                tracing::error!("Error fetching verse: {}", e);
                ViewState::Error {
                    message: e.user_message().to_string(),
                }
            }
        };
        true
    }

    /// User-triggered refresh. Ignored while a request is in flight.
    pub fn manual_refresh(&mut self) -> bool {
        if self.is_loading() {
            self.set_status("Already loading a verse");
            return false;
        }
        self.fetch_verse();
        true
    }

    pub fn set_auto_refresh(&mut self, enabled: bool) {
        match (enabled, self.timer.is_some()) {
            (true, false) => {
                self.timer_generation += 1;
                self.timer = Some(RefreshTimer::start(
                    self.timer_generation,
                    self.config.refresh_interval(),
                    self.events_tx.clone(),
                ));
                tracing::info!("Auto-refresh enabled (every {})", self.refresh_label());
            }
            (false, true) => {
                self.timer = None;
                tracing::info!("Auto-refresh disabled");
            }
            _ => {}
        }
    }

    pub fn toggle_auto_refresh(&mut self) {
        let enabled = !self.auto_refresh();
        self.set_auto_refresh(enabled);

        if enabled {
            self.set_status(format!("Auto-refresh on (every {})", self.refresh_label()));
        } else {
            self.set_status("Auto-refresh off");
        }
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::FetchCompleted { seq, result } => {
                self.apply_fetch_result(seq, result);
            }
            AppEvent::RefreshDue { generation } => {
                let current = self.timer.as_ref().map(RefreshTimer::generation);
                if current == Some(generation) {
                    self.fetch_verse();
                } else {
                    tracing::debug!("Ignoring tick from cancelled refresh timer #{}", generation);
                }
            }
        }
    }

    /// Wait for the next background event
    pub async fn next_event(&mut self) -> Option<AppEvent> {
        self.events_rx.recv().await
    }

    /// Drain pending background events and expire the status message
    pub fn tick(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
        }

        if let Some(time) = self.status_message_time {
            if time.elapsed().as_secs() >= STATUS_MESSAGE_SECS {
                self.status_message = None;
                self.status_message_time = None;
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        if self.popup == Popup::Help {
            if matches!(
                key.code,
                KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('h') | KeyCode::Enter | KeyCode::Char('q')
            ) {
                self.popup = Popup::None;
            }
            return;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('n') | KeyCode::Char(' ') | KeyCode::Enter | KeyCode::Char('r') => {
                self.manual_refresh();
            }
            KeyCode::Char('a') => self.toggle_auto_refresh(),
            KeyCode::Char('?') | KeyCode::Char('h') => self.popup = Popup::Help,
            _ => {}
        }
    }

    /// Format a period in seconds, e.g. "30 seconds", "1 minute 30 seconds"
    pub fn format_interval(secs: u64) -> String {
        fn unit(n: u64, name: &str) -> String {
            if n == 1 {
                format!("1 {}", name)
            } else {
                format!("{} {}s", n, name)
            }
        }

        if secs < 60 {
            unit(secs, "second")
        } else if secs < 3600 {
            let mins = secs / 60;
            let secs = secs % 60;
            if secs == 0 {
                unit(mins, "minute")
            } else {
                format!("{} {}", unit(mins, "minute"), unit(secs, "second"))
            }
        } else {
            let hours = secs / 3600;
            let mins = (secs % 3600) / 60;
            if mins == 0 {
                unit(hours, "hour")
            } else {
                format!("{} {}", unit(hours, "hour"), unit(mins, "minute"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verse::FETCH_ERROR_MESSAGE;
    use mockito::Matcher;
    use tokio::time::timeout;

    fn test_app(api_base: &str) -> App {
        let config = AppConfig {
            api_base: api_base.to_string(),
            ..AppConfig::default()
        };
        let client = VerseClient::new(&config.api_base, config.request_timeout()).unwrap();
        App::new(config, client)
    }

    fn verse(reference: &str) -> Verse {
        Verse {
            text: format!("text of {}", reference),
            reference: reference.to_string(),
            translation_name: "World English Bible".to_string(),
        }
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn service_error() -> FetchError {
        FetchError::Status(reqwest::StatusCode::INTERNAL_SERVER_ERROR)
    }

    #[test]
    fn test_first_fetch_has_no_previous_verse() {
        let mut app = test_app("http://127.0.0.1:9");
        app.begin_fetch();
        assert_eq!(app.state, ViewState::Loading { previous: None });
    }

    #[test]
    fn test_success_then_failure() {
        let mut app = test_app("http://127.0.0.1:9");

        let seq = app.begin_fetch();
        assert!(app.apply_fetch_result(seq, Ok(verse("Psalm 23:1"))));
        assert_eq!(app.state, ViewState::Loaded(verse("Psalm 23:1")));

        let seq = app.begin_fetch();
        assert_eq!(
            app.state,
            ViewState::Loading {
                previous: Some(verse("Psalm 23:1"))
            }
        );

        assert!(app.apply_fetch_result(seq, Err(service_error())));
        assert_eq!(
            app.state,
            ViewState::Error {
                message: FETCH_ERROR_MESSAGE.to_string()
            }
        );
        assert!(!app.is_loading());
    }

    #[test]
    fn test_retry_after_error_starts_clean() {
        let mut app = test_app("http://127.0.0.1:9");
        let seq = app.begin_fetch();
        app.apply_fetch_result(seq, Err(service_error()));

        app.begin_fetch();
        assert_eq!(app.state, ViewState::Loading { previous: None });
    }

    #[test]
    fn test_latest_request_wins_over_slower_earlier_one() {
        let mut app = test_app("http://127.0.0.1:9");

        let first = app.begin_fetch();
        let second = app.begin_fetch();

        // Second resolves first, then the slow first request arrives
        assert!(app.apply_fetch_result(second, Ok(verse("Romans 8:28"))));
        assert!(!app.apply_fetch_result(first, Ok(verse("Genesis 1:1"))));

        assert_eq!(app.state, ViewState::Loaded(verse("Romans 8:28")));
    }

    #[test]
    fn test_stale_failure_does_not_clobber_loading() {
        let mut app = test_app("http://127.0.0.1:9");

        let first = app.begin_fetch();
        app.begin_fetch();
        assert!(!app.apply_fetch_result(first, Err(service_error())));

        assert!(app.is_loading());
    }

    #[test]
    fn test_manual_refresh_is_ignored_while_loading() {
        let mut app = test_app("http://127.0.0.1:9");
        app.begin_fetch();

        assert!(!app.manual_refresh());
        app.handle_key(press(KeyCode::Char('n')));

        assert_eq!(app.latest_seq, 1);
        assert_eq!(app.status_message.as_deref(), Some("Already loading a verse"));
    }

    #[test]
    fn test_quit_and_help_keys() {
        let mut app = test_app("http://127.0.0.1:9");

        app.handle_key(press(KeyCode::Char('?')));
        assert_eq!(app.popup, Popup::Help);

        // Esc closes the popup before it quits
        app.handle_key(press(KeyCode::Esc));
        assert_eq!(app.popup, Popup::None);
        assert!(!app.should_quit);

        app.handle_key(press(KeyCode::Char('q')));
        assert!(app.should_quit);
    }

    #[test]
    fn test_format_interval() {
        assert_eq!(App::format_interval(1), "1 second");
        assert_eq!(App::format_interval(30), "30 seconds");
        assert_eq!(App::format_interval(60), "1 minute");
        assert_eq!(App::format_interval(90), "1 minute 30 seconds");
        assert_eq!(App::format_interval(1800), "30 minutes");
        assert_eq!(App::format_interval(7200), "2 hours");
        assert_eq!(App::format_interval(3660), "1 hour 1 minute");
    }

    #[tokio::test]
    async fn test_start_issues_exactly_one_fetch() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .match_query(Matcher::UrlEncoded("random".into(), "verse".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"text":"Jesus wept.","reference":"John 11:35","translation_name":"World English Bible"}"#)
            .expect(1)
            .create_async()
            .await;

        let mut app = test_app(&server.url());
        app.start();
        assert!(app.is_loading());
        assert!(app.auto_refresh());

        let event = app.next_event().await.unwrap();
        app.handle_event(event);

        match &app.state {
            ViewState::Loaded(v) => assert_eq!(v.reference, "John 11:35"),
            other => panic!("expected a loaded verse, got {:?}", other),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_error_shows_fixed_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/")
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let mut app = test_app(&server.url());
        app.fetch_verse();
        let event = app.next_event().await.unwrap();
        app.handle_event(event);

        assert_eq!(
            app.state,
            ViewState::Error {
                message: FETCH_ERROR_MESSAGE.to_string()
            }
        );
        assert!(app.manual_refresh());
    }

    #[tokio::test(start_paused = true)]
    async fn test_enabling_waits_a_full_interval() {
        let mut app = test_app("http://127.0.0.1:9");
        let enabled_at = time::Instant::now();

        app.toggle_auto_refresh();
        assert!(app.auto_refresh());
        assert_eq!(app.latest_seq, 0);

        assert!(timeout(Duration::from_secs(29), app.next_event()).await.is_err());

        let event = timeout(Duration::from_secs(2), app.next_event())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(event, AppEvent::RefreshDue { generation: 1 }));
        assert!(enabled_at.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabling_cancels_pending_tick() {
        let mut app = test_app("http://127.0.0.1:9");

        app.handle_key(press(KeyCode::Char('a')));
        app.handle_key(press(KeyCode::Char('a')));
        assert!(!app.auto_refresh());

        assert!(timeout(Duration::from_secs(120), app.next_event()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_from_replaced_timer_is_ignored() {
        let mut app = test_app("http://127.0.0.1:9");

        app.set_auto_refresh(true);
        app.set_auto_refresh(false);
        app.set_auto_refresh(true);

        app.handle_event(AppEvent::RefreshDue { generation: 1 });
        assert_eq!(app.latest_seq, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_longest_interval_from_config() {
        let config = AppConfig {
            api_base: "http://127.0.0.1:9".to_string(),
            refresh_interval_secs: u64::MAX,
            ..AppConfig::default()
        };
        let client = VerseClient::new(&config.api_base, config.request_timeout()).unwrap();
        let mut app = App::new(config, client);

        app.set_auto_refresh(true);
        assert!(app.auto_refresh());
        assert_eq!(app.refresh_label(), "24 hours");

        let event = timeout(Duration::from_secs(86_401), app.next_event())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(event, AppEvent::RefreshDue { generation: 1 }));
    }

    #[tokio::test]
    async fn test_tick_from_live_timer_fetches() {
        let mut app = test_app("http://127.0.0.1:9");
        let seq = app.begin_fetch();
        app.apply_fetch_result(seq, Ok(verse("Micah 6:8")));

        app.set_auto_refresh(true);
        app.handle_event(AppEvent::RefreshDue { generation: 1 });

        assert_eq!(app.latest_seq, 2);
        assert_eq!(
            app.state,
            ViewState::Loading {
                previous: Some(verse("Micah 6:8"))
            }
        );
    }
}
