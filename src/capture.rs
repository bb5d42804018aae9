use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::{CaptureConfig, ReconcileConfig};
use crate::extract::state;
use crate::reconcile::{SnapshotProvider, TriggerHandle};
use crate::snapshot::{LeafMetrics, MetricsOverlay, PageSnapshot};
use crate::utils::error::AppError;

/// Rendered metrics for every leaf text under a price-bearing container.
/// Keyed by trimmed text + occurrence, matching the parser-side alignment
/// in the visual collector.
const OVERLAY_JS: &str = r#"
(() => {
  const roots = document.querySelectorAll('[data-pl="product-price"], [class*="price"]');
  const seen = new Set();
  const out = [];
  for (const root of roots) {
    const walker = document.createTreeWalker(root, NodeFilter.SHOW_TEXT);
    let node;
    while ((node = walker.nextNode())) {
      if (seen.has(node) || !node.textContent.trim()) continue;
      seen.add(node);
      const el = node.parentElement;
      if (!el) continue;
      const cs = getComputedStyle(el);
      let area = 0;
      for (const r of el.getClientRects()) area += r.width * r.height;
      out.push({
        text: node.textContent.trim(),
        fontSize: parseFloat(cs.fontSize) || 0,
        fontWeight: cs.fontWeight === 'bold' ? 700 : (parseInt(cs.fontWeight, 10) || 400),
        area,
        visible: area > 0 && cs.display !== 'none' && cs.visibility !== 'hidden'
          && parseFloat(cs.opacity) >= 0.03 && !el.closest('[aria-hidden="true"]'),
        lineThrough: ((cs.textDecorationLine || cs.textDecoration || '').includes('line-through'))
          || !!el.closest('del,s,strike')
      });
    }
  }
  return JSON.stringify(out);
})()
"#;

/// Outer HTML of the price container (or the body when none is found),
/// hashed on the Rust side to detect subtree mutations.
const CONTAINER_HTML_JS: &str = r#"
(() => {
  const el = document.querySelector('[data-pl="product-price"]')
    || document.querySelector('[class*="price"]')
    || document.body;
  return el ? el.outerHTML : '';
})()
"#;

/// A driven browser tab over the target product page. Snapshot capture and
/// the cheap watcher probes both go through here; everything downstream of
/// a captured [`PageSnapshot`] is pure.
pub struct LiveBrowser {
    // keeps the browser process alive for the tab's lifetime
    _browser: Browser,
    tab: Arc<Tab>,
}

impl LiveBrowser {
    pub fn launch(config: &CaptureConfig) -> crate::Result<Self> {
        let mut launch_options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false) // often needed in containerized environments
            .args(vec![
                std::ffi::OsStr::new("--no-sandbox"),
                std::ffi::OsStr::new("--disable-dev-shm-usage"),
                std::ffi::OsStr::new("--disable-gpu"),
                std::ffi::OsStr::new("--disable-extensions"),
                std::ffi::OsStr::new("--disable-background-timer-throttling"),
            ])
            .build()
            .map_err(|e| AppError::Browser(format!("failed to create launch options: {}", e)))?;

        if let Some(chrome_path) = &config.chrome_path {
            launch_options.path = Some(std::path::PathBuf::from(chrome_path));
        }

        let browser = Browser::new(launch_options)
            .map_err(|e| AppError::Browser(format!("failed to launch browser: {}", e)))?;
        let tab = browser
            .new_tab()
            .map_err(|e| AppError::Browser(format!("failed to create tab: {}", e)))?;

        tab.set_user_agent(&config.user_agent, None, None)
            .map_err(|e| AppError::Browser(format!("failed to set user agent: {}", e)))?;
        tab.set_default_timeout(Duration::from_secs(config.nav_timeout_secs));

        Ok(LiveBrowser {
            _browser: browser,
            tab,
        })
    }

    pub fn open(&self, url: &str) -> crate::Result<()> {
        info!(%url, "navigating to product page");
        self.tab
            .navigate_to(url)
            .map_err(|e| AppError::Browser(format!("navigation failed: {}", e)))?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| AppError::Browser(format!("page load failed: {}", e)))?;
        Ok(())
    }

    /// Full capture: page HTML, the known state objects, and rendered
    /// metrics for price-bearing leaves. Overlay or state failures degrade
    /// to a plain HTML snapshot.
    pub fn capture(&self) -> crate::Result<PageSnapshot> {
        let html = self
            .tab
            .get_content()
            .map_err(|e| AppError::Browser(format!("failed to read page content: {}", e)))?;
        let mut snapshot = PageSnapshot::from_html(html);

        for name in state::STATE_OBJECTS {
            let expr = format!("JSON.stringify(window.{} || null)", name);
            if let Some(value) = self.eval_json(&expr) {
                if !value.is_null() {
                    snapshot = snapshot.with_state(*name, value);
                }
            }
        }

        match self
            .eval_json(OVERLAY_JS)
            .map(serde_json::from_value::<Vec<LeafMetrics>>)
        {
            Some(Ok(entries)) => {
                snapshot = snapshot.with_overlay(MetricsOverlay::new(entries));
            }
            Some(Err(e)) => debug!("discarding malformed metrics overlay: {}", e),
            None => debug!("no metrics overlay captured"),
        }

        Ok(snapshot)
    }

    /// Current minimum state-object price, for the change-only poll.
    pub fn state_price(&self) -> Option<Decimal> {
        let mut snapshot = PageSnapshot::from_html("");
        for name in state::STATE_OBJECTS {
            let expr = format!("JSON.stringify(window.{} || null)", name);
            if let Some(value) = self.eval_json(&expr) {
                if !value.is_null() {
                    snapshot = snapshot.with_state(*name, value);
                }
            }
        }
        let doc = snapshot.document();
        state::min_price(&snapshot, &doc)
    }

    /// Digest of the price container's subtree, for mutation detection.
    pub fn container_digest(&self) -> Option<String> {
        let value = self.eval_raw(CONTAINER_HTML_JS)?;
        let html = value.as_str()?;
        Some(digest(html))
    }

    /// Spawn the ambient-drift watchers: a change-only state poll, a
    /// container-hash mutation watch, and the slow full-reparse tick. Each
    /// one funnels into the shared trigger channel.
    pub fn spawn_watchers(
        self: &Arc<Self>,
        handle: TriggerHandle,
        config: &ReconcileConfig,
    ) -> Vec<JoinHandle<()>> {
        let mut tasks = Vec::new();

        {
            let browser = Arc::clone(self);
            let handle = handle.clone();
            let period = Duration::from_millis(config.state_poll_ms);
            tasks.push(tokio::spawn(async move {
                let mut last: Option<Decimal> = None;
                let mut ticker = tokio::time::interval(period);
                loop {
                    ticker.tick().await;
                    let price = browser.state_price();
                    // only a real change triggers work; a re-rendered state
                    // object with the same price is ignored
                    if price.is_some() && price != last {
                        last = price;
                        handle.notify_state_change();
                    }
                }
            }));
        }

        {
            let browser = Arc::clone(self);
            let handle = handle.clone();
            let period = Duration::from_millis(config.mutation_poll_ms);
            tasks.push(tokio::spawn(async move {
                let mut last: Option<String> = None;
                let mut ticker = tokio::time::interval(period);
                loop {
                    ticker.tick().await;
                    let current = browser.container_digest();
                    if current.is_some() && last.is_some() && current != last {
                        handle.notify_mutation();
                    }
                    if current.is_some() {
                        last = current;
                    }
                }
            }));
        }

        {
            let handle = handle.clone();
            let period = Duration::from_millis(config.reparse_interval_ms);
            tasks.push(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(period);
                // skip the immediate first tick; the caller primes the record
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    handle.notify_tick();
                }
            }));
        }

        tasks
    }

    fn eval_raw(&self, expr: &str) -> Option<serde_json::Value> {
        match self.tab.evaluate(expr, false) {
            Ok(object) => object.value,
            Err(e) => {
                debug!("page evaluation failed: {}", e);
                None
            }
        }
    }

    /// Evaluate an expression that returns a JSON string, and parse it.
    fn eval_json(&self, expr: &str) -> Option<serde_json::Value> {
        let raw = self.eval_raw(expr)?;
        let text = raw.as_str()?;
        serde_json::from_str(text).ok()
    }
}

#[async_trait]
impl SnapshotProvider for LiveBrowser {
    async fn snapshot(&self) -> crate::Result<PageSnapshot> {
        self.capture()
    }
}

fn digest(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
