//! Update notifier state machine.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::{format_release_notes, is_newer};
use crate::clock::Clock;
use crate::error::Result;
use crate::net::{Fetcher, Request};
use crate::storage::{KeyValueStore, LAST_SEEN_VERSION};
use crate::view::ModalView;

/// Version descriptor published with the site.
pub const VERSION_CHECK_URL: &str = "src/app/version.json";

/// Delay between launch and the first check, keeps startup responsive.
pub const CHECK_DELAY: Duration = Duration::from_secs(1);

/// Reference used when nothing was acknowledged yet.
const NOTHING_SEEN: &str = "0.0.0";

/// `{version, notes}` as published by the site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionDescriptor {
    pub version: String,
    #[serde(default)]
    pub notes: String,
}

/// How the app was launched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LaunchContext {
    /// `display-mode: standalone` media query matched
    #[serde(default)]
    pub display_mode_standalone: bool,
    /// Vendor standalone flag (iOS home-screen apps)
    #[serde(default)]
    pub navigator_standalone: bool,
    /// Document referrer
    #[serde(default)]
    pub referrer: Option<String>,
}

impl LaunchContext {
    /// True when running as an installed app rather than a browser tab.
    pub fn is_standalone(&self) -> bool {
        self.display_mode_standalone
            || self.navigator_standalone
            || self
                .referrer
                .as_deref()
                .is_some_and(|r| r.contains("android-app://"))
    }
}

/// Content of the "what's new" modal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateModal {
    pub title: String,
    pub version: String,
    pub version_label: String,
    pub notes_html: String,
}

impl UpdateModal {
    pub fn from_descriptor(descriptor: &VersionDescriptor) -> Self {
        Self {
            title: "What's new".to_string(),
            version: descriptor.version.clone(),
            version_label: format!("v{}", descriptor.version),
            notes_html: format_release_notes(&descriptor.notes),
        }
    }
}

/// Where the notifier is in its check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum UpdateState {
    Idle,
    Checking,
    NoUpdate,
    ModalShown { version: String },
    Acknowledged { version: String },
}

/// Checks the published version and shows the release modal once per version.
pub struct UpdateNotifier {
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    modal: Arc<dyn ModalView>,
    current_version: String,
    check_url: String,
    state: Mutex<UpdateState>,
}

impl UpdateNotifier {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        modal: Arc<dyn ModalView>,
        current_version: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            store,
            clock,
            modal,
            current_version: current_version.into(),
            check_url: VERSION_CHECK_URL.to_string(),
            state: Mutex::new(UpdateState::Idle),
        }
    }

    pub fn current_version(&self) -> &str {
        &self.current_version
    }

    pub fn state(&self) -> UpdateState {
        self.state
            .lock()
            .map(|s| s.clone())
            .unwrap_or(UpdateState::Idle)
    }

    fn set_state(&self, next: UpdateState) {
        if let Ok(mut state) = self.state.lock() {
            *state = next;
        }
    }

    pub fn last_seen_version(&self) -> Option<String> {
        self.store.get(LAST_SEEN_VERSION)
    }

    /// Schedules a check after `CHECK_DELAY`, only for standalone launches.
    pub fn init(self: &Arc<Self>, ctx: &LaunchContext) -> Option<JoinHandle<UpdateState>> {
        if !ctx.is_standalone() {
            debug!("Not running standalone, skipping update check");
            return None;
        }
        let notifier = Arc::clone(self);
        Some(tokio::spawn(async move {
            tokio::time::sleep(CHECK_DELAY).await;
            notifier.check_version().await
        }))
    }

    // == Check ==
    /// Fetches the descriptor and shows the modal when it is newer than both
    /// the running build and the last acknowledged version.
    ///
    /// Failures are logged and leave the notifier idle.
    pub async fn check_version(&self) -> UpdateState {
        let previous = self.state();
        self.set_state(UpdateState::Checking);

        let next = match self.fetch_descriptor().await {
            Ok(Some(descriptor)) => {
                let last_seen = self
                    .last_seen_version()
                    .unwrap_or_else(|| NOTHING_SEEN.to_string());
                if is_newer(&descriptor.version, &self.current_version)
                    && is_newer(&descriptor.version, &last_seen)
                {
                    if self.show_modal(&descriptor) {
                        UpdateState::ModalShown {
                            version: descriptor.version,
                        }
                    } else {
                        previous
                    }
                } else {
                    UpdateState::NoUpdate
                }
            }
            Ok(None) => UpdateState::Idle,
            Err(err) => {
                error!("Update check failed: {}", err);
                UpdateState::Idle
            }
        };

        self.set_state(next.clone());
        next
    }

    async fn fetch_descriptor(&self) -> Result<Option<VersionDescriptor>> {
        let url = format!("{}?t={}", self.check_url, self.clock.now_ms());
        let resp = self.fetcher.fetch(&Request::get(url)).await?;
        if !resp.is_success() {
            debug!("Version descriptor answered {}", resp.status);
            return Ok(None);
        }
        Ok(Some(resp.json()?))
    }

    // == Modal ==
    /// Opens the release modal unless one is already open.
    pub fn show_modal(&self, descriptor: &VersionDescriptor) -> bool {
        if self.modal.is_open() {
            return false;
        }
        info!("Showing release notes for v{}", descriptor.version);
        self.modal.open(&UpdateModal::from_descriptor(descriptor));
        true
    }

    /// Dismisses the modal and remembers its version so it is not shown again.
    ///
    /// Returns the acknowledged version, or `None` when no modal was shown.
    pub fn acknowledge(&self) -> Result<Option<String>> {
        let version = match self.state() {
            UpdateState::ModalShown { version } => version,
            _ => return Ok(None),
        };
        self.store.set(LAST_SEEN_VERSION, &version)?;
        self.modal.close();
        self.set_state(UpdateState::Acknowledged {
            version: version.clone(),
        });
        Ok(Some(version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::net::testing::StubFetcher;
    use crate::net::Response;
    use crate::storage::MemoryStore;
    use crate::view::DashboardSnapshot;

    fn descriptor(version: &str) -> Response {
        Response::json_body(format!(
            r####"{{"version":"{}","notes":"### Fixes\n- **Weather** offline"}}"####,
            version
        ))
    }

    fn notifier(
        fetcher: Arc<StubFetcher>,
        store: Arc<MemoryStore>,
        view: Arc<DashboardSnapshot>,
    ) -> Arc<UpdateNotifier> {
        Arc::new(UpdateNotifier::new(
            fetcher,
            store,
            Arc::new(SystemClock),
            view,
            "2.0.0",
        ))
    }

    #[test]
    fn test_standalone_detection() {
        assert!(!LaunchContext::default().is_standalone());
        assert!(LaunchContext {
            display_mode_standalone: true,
            ..Default::default()
        }
        .is_standalone());
        assert!(LaunchContext {
            referrer: Some("android-app://com.example/".to_string()),
            ..Default::default()
        }
        .is_standalone());
    }

    #[tokio::test]
    async fn test_newer_version_shows_modal_once() {
        let fetcher = Arc::new(StubFetcher::new().with_route(VERSION_CHECK_URL, descriptor("2.1.0")));
        let store = Arc::new(MemoryStore::new());
        let view = Arc::new(DashboardSnapshot::new());
        let notifier = notifier(fetcher, store.clone(), view.clone());

        let state = notifier.check_version().await;
        assert_eq!(state, UpdateState::ModalShown { version: "2.1.0".to_string() });
        let modal = view.snapshot().modal.unwrap();
        assert_eq!(modal.version_label, "v2.1.0");
        assert!(modal.notes_html.starts_with("<h3>Fixes</h3>"));

        assert_eq!(notifier.acknowledge().unwrap().as_deref(), Some("2.1.0"));
        assert!(view.snapshot().modal.is_none());
        assert_eq!(store.get(LAST_SEEN_VERSION).as_deref(), Some("2.1.0"));

        assert_eq!(notifier.check_version().await, UpdateState::NoUpdate);
        assert!(view.snapshot().modal.is_none());
    }

    #[tokio::test]
    async fn test_not_newer_than_build() {
        let fetcher = Arc::new(StubFetcher::new().with_route(VERSION_CHECK_URL, descriptor("2.0")));
        let view = Arc::new(DashboardSnapshot::new());
        let notifier = notifier(fetcher, Arc::new(MemoryStore::new()), view.clone());

        assert_eq!(notifier.check_version().await, UpdateState::NoUpdate);
        assert!(view.snapshot().modal.is_none());
    }

    #[tokio::test]
    async fn test_rollback_below_last_seen_is_ignored() {
        let fetcher = Arc::new(StubFetcher::new().with_route(VERSION_CHECK_URL, descriptor("2.1.0")));
        let store = Arc::new(MemoryStore::new());
        store.set(LAST_SEEN_VERSION, "2.2.0").unwrap();
        let notifier = notifier(fetcher, store.clone(), Arc::new(DashboardSnapshot::new()));

        assert_eq!(notifier.check_version().await, UpdateState::NoUpdate);
        assert_eq!(store.get(LAST_SEEN_VERSION).as_deref(), Some("2.2.0"));
    }

    #[tokio::test]
    async fn test_open_modal_is_not_duplicated() {
        let fetcher = Arc::new(StubFetcher::new().with_route(VERSION_CHECK_URL, descriptor("3.0.0")));
        let view = Arc::new(DashboardSnapshot::new());
        let notifier = notifier(fetcher.clone(), Arc::new(MemoryStore::new()), view.clone());

        notifier.check_version().await;
        fetcher.route(VERSION_CHECK_URL, descriptor("3.1.0"));
        let state = notifier.check_version().await;

        assert_eq!(state, UpdateState::ModalShown { version: "3.0.0".to_string() });
        assert_eq!(view.snapshot().modal.unwrap().version, "3.0.0");
    }

    #[tokio::test]
    async fn test_failures_are_silent() {
        let fetcher = Arc::new(StubFetcher::new());
        let notifier = notifier(fetcher.clone(), Arc::new(MemoryStore::new()), Arc::new(DashboardSnapshot::new()));

        // 404
        assert_eq!(notifier.check_version().await, UpdateState::Idle);

        fetcher.route(VERSION_CHECK_URL, Response::json_body("not json"));
        assert_eq!(notifier.check_version().await, UpdateState::Idle);

        fetcher.set_offline(true);
        assert_eq!(notifier.check_version().await, UpdateState::Idle);
        assert_eq!(notifier.acknowledge().unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_init_only_checks_when_standalone() {
        let fetcher = Arc::new(StubFetcher::new().with_route(VERSION_CHECK_URL, descriptor("2.5.0")));
        let notifier = notifier(fetcher.clone(), Arc::new(MemoryStore::new()), Arc::new(DashboardSnapshot::new()));

        assert!(notifier.init(&LaunchContext::default()).is_none());
        assert_eq!(fetcher.calls(), 0);

        let ctx = LaunchContext {
            navigator_standalone: true,
            ..Default::default()
        };
        let handle = notifier.init(&ctx).unwrap();
        let state = handle.await.unwrap();
        assert_eq!(state, UpdateState::ModalShown { version: "2.5.0".to_string() });
        assert_eq!(fetcher.calls(), 1);
    }
}
