use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetLocaleOverrideParams, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, NavigateParams,
};
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use jobcrawl_core::config::ContextProfile;
use jobcrawl_core::error::CrawlError;
use jobcrawl_core::models::PageSnapshot;
use jobcrawl_core::traits::{BrowserSession, BrowsingContext, LoadState};
use tokio::sync::OnceCell;

/// How often `document.readyState` is polled while waiting for a load state.
const READY_STATE_POLL: Duration = Duration::from_millis(100);

/// Injected into every document before its own scripts run.
const STEALTH_SCRIPT: &str = r#"
Object.defineProperty(navigator, 'webdriver', { get: () => undefined, configurable: true });
Object.defineProperty(navigator, 'languages', { get: () => ['en-US', 'en'], configurable: true });
Object.defineProperty(navigator, 'plugins', { get: () => [1, 2, 3, 4, 5], configurable: true });
if (!window.chrome) { window.chrome = { runtime: {} }; }
delete window.__playwright;
delete window.__puppeteer;
delete window.__selenium;
"#;

/// How the shared Chromium process is started.
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    pub headless: bool,
    /// Explicit browser binary; otherwise well-known install paths are probed.
    pub chrome_bin: Option<PathBuf>,
    /// Appended after the built-in launch flags.
    pub extra_args: Vec<String>,
    /// Identity applied to every new browsing context.
    pub profile: ContextProfile,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_bin: None,
            extra_args: Vec::new(),
            profile: ContextProfile::default(),
        }
    }
}

impl LaunchConfig {
    /// Reads `JOBCRAWL_HEADLESS` (default `true`) and `CHROME_BIN`.
    pub fn from_env() -> Result<Self, CrawlError> {
        let headless = match std::env::var("JOBCRAWL_HEADLESS") {
            Err(_) => true,
            Ok(raw) => parse_flag(&raw).ok_or_else(|| {
                CrawlError::ConfigError(format!(
                    "Invalid JOBCRAWL_HEADLESS '{raw}': expected true or false"
                ))
            })?,
        };
        Ok(Self {
            headless,
            chrome_bin: std::env::var_os("CHROME_BIN").map(PathBuf::from),
            ..Default::default()
        })
    }

    /// Command-line flags passed to Chromium.
    pub fn launch_args(&self) -> Vec<String> {
        let (width, height) = self.profile.viewport;
        let mut args: Vec<String> = Vec::new();
        if self.headless {
            args.push("--headless=new".into());
        }
        args.extend(
            [
                "--disable-blink-features=AutomationControlled",
                "--disable-gpu",
                "--disable-dev-shm-usage",
                "--disable-extensions",
                "--disable-popup-blocking",
                "--disable-translate",
                "--no-first-run",
            ]
            .map(String::from),
        );
        args.push(format!("--window-size={width},{height}"));
        args.push(format!("--lang={}", self.profile.locale));
        args.extend(self.extra_args.iter().cloned());
        args
    }

    fn browser_config(&self) -> Result<BrowserConfig, String> {
        let mut builder = BrowserConfig::builder().no_sandbox().disable_default_args();
        if !self.headless {
            builder = builder.with_head();
        }

        // Snap-packaged Chromium exposes a wrapper that rejects standard
        // Chrome CLI flags, so the real binary is located explicitly.
        if let Some(bin) = self.chrome_bin.clone().or_else(find_chrome_binary) {
            tracing::info!("Using Chrome binary: {}", bin.display());
            builder = builder.chrome_executable(bin);
        }

        for arg in self.launch_args() {
            builder = builder.arg(arg);
        }

        builder
            .build()
            .map_err(|e| format!("Browser config error: {e}"))
    }
}

/// Well-known locations of a real Chrome/Chromium binary, first match wins.
///
/// Returns `None` to let `chromiumoxide` do its own lookup.
fn find_chrome_binary() -> Option<PathBuf> {
    let candidates: &[&str] = &[
        // Snap (Ubuntu default)
        "/snap/chromium/current/usr/lib/chromium-browser/chrome",
        // Flatpak
        "/var/lib/flatpak/exports/bin/org.chromium.Chromium",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/google-chrome",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
    ];

    candidates.iter().map(PathBuf::from).find(|p| p.exists())
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// ChromeSession
// ---------------------------------------------------------------------------

/// One Chromium process shared by every clone of this handle.
///
/// The process is launched on the first [`BrowserSession::acquire_context`]
/// and lives until the last clone is dropped. A failed launch is remembered:
/// every later acquisition reports the same [`CrawlError::LaunchFailure`]
/// until a new session is built.
#[derive(Clone)]
pub struct ChromeSession {
    launch: Arc<LaunchConfig>,
    browser: Arc<OnceCell<Result<Arc<Browser>, String>>>,
    alive: Arc<AtomicBool>,
}

impl ChromeSession {
    pub fn new(launch: LaunchConfig) -> Self {
        Self {
            launch: Arc::new(launch),
            browser: Arc::new(OnceCell::new()),
            alive: Arc::new(AtomicBool::new(false)),
        }
    }

    async fn browser(&self) -> Result<Arc<Browser>, CrawlError> {
        let launched = self
            .browser
            .get_or_init(|| async { launch(&self.launch, self.alive.clone()).await.map(Arc::new) })
            .await;

        match launched {
            Ok(_) if !self.alive.load(Ordering::Acquire) => Err(CrawlError::LaunchFailure(
                "browser connection closed".into(),
            )),
            Ok(browser) => Ok(browser.clone()),
            Err(message) => Err(CrawlError::LaunchFailure(message.clone())),
        }
    }
}

/// Starts Chromium and its CDP handler task. Errors are kept as plain
/// messages so the cached failure can be reported again later.
async fn launch(config: &LaunchConfig, alive: Arc<AtomicBool>) -> Result<Browser, String> {
    let browser_config = config.browser_config()?;

    let (browser, mut handler) = Browser::launch(browser_config)
        .await
        .map_err(|e| format!("Failed to launch browser: {e}"))?;
    alive.store(true, Ordering::Release);
    tracing::info!(headless = config.headless, "Browser launched");

    // The CDP handler must be polled continuously for the connection to work.
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                tracing::warn!("Browser CDP handler error: {e}");
            }
        }
        alive.store(false, Ordering::Release);
        tracing::warn!("Browser CDP connection closed");
    });

    Ok(browser)
}

impl BrowserSession for ChromeSession {
    type Context = ChromeContext;

    async fn acquire_context(&self) -> Result<ChromeContext, CrawlError> {
        let browser = self.browser().await?;

        let context_id = browser
            .execute(CreateBrowserContextParams::default())
            .await
            .map_err(|e| CrawlError::ContextError(format!("Failed to create context: {e}")))?
            .result
            .browser_context_id;

        let mut target = CreateTargetParams::new("about:blank");
        target.browser_context_id = Some(context_id.clone());

        let page = match browser.new_page(target).await {
            Ok(page) => page,
            Err(e) => {
                dispose_context(&browser, context_id).await;
                return Err(CrawlError::ContextError(format!(
                    "Failed to open page: {e}"
                )));
            }
        };

        let ctx = ChromeContext {
            browser,
            page: Some(page),
            context_id: Some(context_id),
            runtime: tokio::runtime::Handle::current(),
        };

        match apply_profile(ctx.page()?, &self.launch.profile).await {
            Ok(()) => Ok(ctx),
            Err(e) => {
                ctx.close().await;
                Err(e)
            }
        }
    }
}

async fn apply_profile(page: &Page, profile: &ContextProfile) -> Result<(), CrawlError> {
    let (width, height) = profile.viewport;
    let context_err = |e: chromiumoxide::error::CdpError| {
        CrawlError::ContextError(format!("Failed to apply browser profile: {e}"))
    };

    page.execute(SetDeviceMetricsOverrideParams::new(
        i64::from(width),
        i64::from(height),
        1.0,
        false,
    ))
    .await
    .map_err(context_err)?;

    let mut user_agent = SetUserAgentOverrideParams::new(profile.user_agent.clone());
    user_agent.accept_language = Some(profile.locale.clone());
    page.execute(user_agent).await.map_err(context_err)?;

    let mut locale = SetLocaleOverrideParams::default();
    locale.locale = Some(profile.locale.replace('-', "_"));
    page.execute(locale).await.map_err(context_err)?;

    page.execute(AddScriptToEvaluateOnNewDocumentParams::new(STEALTH_SCRIPT))
        .await
        .map_err(context_err)?;

    Ok(())
}

async fn dispose_context(browser: &Browser, context_id: BrowserContextId) {
    if let Err(e) = browser
        .execute(DisposeBrowserContextParams::new(context_id))
        .await
    {
        tracing::warn!("Failed to dispose browser context: {e}");
    }
}

/// CDP errors raised while a navigation swaps out the execution context.
fn is_context_swap(message: &str) -> bool {
    message.contains("Cannot find context with specified id")
        || message.contains("Execution context was destroyed")
        || message.contains("Inspected target navigated or closed")
}

// ---------------------------------------------------------------------------
// ChromeContext
// ---------------------------------------------------------------------------

/// An incognito-style browser context holding a single page.
///
/// [`BrowsingContext::close`] is the normal way out. If the context is dropped
/// without it (a cancelled request, a panic), cleanup is spawned onto the
/// runtime that created it.
pub struct ChromeContext {
    browser: Arc<Browser>,
    page: Option<Page>,
    context_id: Option<BrowserContextId>,
    runtime: tokio::runtime::Handle,
}

impl ChromeContext {
    fn page(&self) -> Result<&Page, CrawlError> {
        self.page
            .as_ref()
            .ok_or_else(|| CrawlError::ContextError("browser context already closed".into()))
    }

    async fn evaluate<T: serde::de::DeserializeOwned>(
        &self,
        script: &str,
    ) -> Result<T, CrawlError> {
        self.page()?
            .evaluate(script)
            .await
            .map_err(|e| CrawlError::ScriptError(e.to_string()))?
            .into_value::<T>()
            .map_err(|e| CrawlError::ScriptError(format!("Unexpected result of `{script}`: {e}")))
    }

    async fn wait_for(&self, state: LoadState) -> Result<(), CrawlError> {
        loop {
            let ready: String = match self.evaluate("document.readyState").await {
                Ok(ready) => ready,
                // The old document's context is gone before the new one exists.
                Err(CrawlError::ScriptError(message)) if is_context_swap(&message) => {
                    tokio::time::sleep(READY_STATE_POLL).await;
                    continue;
                }
                Err(e) => return Err(e),
            };
            let reached = match state {
                LoadState::DomContentLoaded => ready == "interactive" || ready == "complete",
                LoadState::Load => ready == "complete",
            };
            if reached {
                return Ok(());
            }
            tokio::time::sleep(READY_STATE_POLL).await;
        }
    }

    async fn teardown(
        browser: Arc<Browser>,
        page: Option<Page>,
        context_id: Option<BrowserContextId>,
    ) {
        if let Some(page) = page
            && let Err(e) = page.close().await
        {
            tracing::warn!("Failed to close page: {e}");
        }
        if let Some(context_id) = context_id {
            dispose_context(&browser, context_id).await;
        }
    }
}

impl BrowsingContext for ChromeContext {
    async fn navigate(&self, url: &str, state: LoadState) -> Result<(), CrawlError> {
        tracing::debug!(%url, ?state, "Navigating");
        let response = self
            .page()?
            .execute(NavigateParams::new(url))
            .await
            .map_err(|e| CrawlError::NavigationError(format!("{e} at {url}")))?;

        if let Some(error_text) = &response.result.error_text {
            return Err(CrawlError::NavigationError(format!(
                "{error_text} at {url}"
            )));
        }

        self.wait_for(state).await
    }

    async fn content_height(&self) -> Result<u64, CrawlError> {
        self.evaluate("document.body ? document.body.scrollHeight : 0")
            .await
    }

    async fn scroll_to_bottom(&self) -> Result<(), CrawlError> {
        self.page()?
            .evaluate("window.scrollTo(0, document.body ? document.body.scrollHeight : 0)")
            .await
            .map_err(|e| CrawlError::ScriptError(e.to_string()))?;
        Ok(())
    }

    async fn snapshot(&self) -> Result<PageSnapshot, CrawlError> {
        let page = self.page()?;
        let html = page
            .content()
            .await
            .map_err(|e| CrawlError::ScriptError(format!("Failed to read page content: {e}")))?;
        let url = page
            .url()
            .await
            .map_err(|e| CrawlError::ScriptError(format!("Failed to read page URL: {e}")))?
            .unwrap_or_default();
        Ok(PageSnapshot { url, html })
    }

    async fn close(mut self) {
        let page = self.page.take();
        let context_id = self.context_id.take();
        Self::teardown(self.browser.clone(), page, context_id).await;
        tracing::debug!("Browser context closed");
    }
}

impl Drop for ChromeContext {
    fn drop(&mut self) {
        if self.page.is_none() && self.context_id.is_none() {
            return;
        }
        let browser = self.browser.clone();
        let page = self.page.take();
        let context_id = self.context_id.take();
        self.runtime
            .spawn(Self::teardown(browser, page, context_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_args_hide_automation() {
        let args = LaunchConfig::default().launch_args();
        assert!(args.contains(&"--headless=new".to_string()));
        assert!(args.contains(&"--disable-blink-features=AutomationControlled".to_string()));
        assert!(args.contains(&"--window-size=1920,1080".to_string()));
        assert!(args.contains(&"--lang=en-US".to_string()));
    }

    #[test]
    fn test_headful_launch_omits_headless_flag() {
        let config = LaunchConfig {
            headless: false,
            extra_args: vec!["--proxy-server=http://127.0.0.1:8080".into()],
            ..Default::default()
        };
        let args = config.launch_args();
        assert!(!args.iter().any(|a| a.starts_with("--headless")));
        assert_eq!(
            args.last().map(String::as_str),
            Some("--proxy-server=http://127.0.0.1:8080")
        );
    }

    #[test]
    fn test_context_swap_errors_are_retried() {
        assert!(is_context_swap("Cannot find context with specified id"));
        assert!(is_context_swap(
            "Execution context was destroyed, most likely because of a navigation."
        ));
        assert!(!is_context_swap("ReferenceError: document is not defined"));
        assert!(!is_context_swap(
            "Unexpected result of `document.readyState`"
        ));
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("true"), Some(true));
        assert_eq!(parse_flag(" 0 "), Some(false));
        assert_eq!(parse_flag("OFF"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_stealth_script_masks_webdriver() {
        assert!(STEALTH_SCRIPT.contains("'webdriver'"));
    }

    #[tokio::test]
    async fn test_launch_failure_is_remembered() {
        let session = ChromeSession::new(LaunchConfig {
            chrome_bin: Some(PathBuf::from("/nonexistent/jobcrawl/chrome")),
            ..Default::default()
        });

        let first = session.acquire_context().await.err();
        let second = session.clone().acquire_context().await.err();

        assert!(matches!(first, Some(CrawlError::LaunchFailure(_))));
        assert!(matches!(second, Some(CrawlError::LaunchFailure(_))));
        assert!(matches!(session.browser.get(), Some(Err(_))));
    }
}
