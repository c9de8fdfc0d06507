//! Playwright sidecar driver
//!
//! Drives Playwright through a single persistent Node process. The sidecar
//! script is generated at launch, reads JSON-lines commands on stdin and
//! answers with id-matched JSON lines on stdout. One browser per sidecar,
//! one Playwright context+page per [`PlaywrightPage`].

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, info, warn};

use crate::driver::{Browser, PageDriver, StorageState};
use crate::error::{HarnessError, Result};

/// Browser engine for the sidecar to launch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BrowserKind {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl BrowserKind {
    fn as_str(&self) -> &'static str {
        match self {
            BrowserKind::Chromium => "chromium",
            BrowserKind::Firefox => "firefox",
            BrowserKind::Webkit => "webkit",
        }
    }
}

/// Sidecar launch configuration.
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub browser: BrowserKind,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Budget for the launch handshake.
    pub launch_timeout: Duration,
    /// Budget for a single sidecar command.
    pub call_timeout: Duration,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            browser: BrowserKind::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            launch_timeout: Duration::from_secs(30),
            call_timeout: Duration::from_secs(30),
        }
    }
}

struct Sidecar {
    stdin: Mutex<ChildStdin>,
    pending: Arc<Mutex<HashMap<u64, oneshot::Sender<Value>>>>,
    next_id: AtomicU64,
    call_timeout: Duration,
    child: parking_lot::Mutex<Child>,
    // Holds the generated script for the lifetime of the process.
    _workdir: tempfile::TempDir,
}

impl Sidecar {
    async fn call(&self, op: &str, params: Value, budget: Duration) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let line = serde_json::to_string(&json!({ "id": id, "op": op, "params": params }))?;
        debug!(%op, id, "sidecar command");
        {
            let mut stdin = self.stdin.lock().await;
            stdin.write_all(line.as_bytes()).await?;
            stdin.write_all(b"\n").await?;
            stdin.flush().await?;
        }

        let response = match tokio::time::timeout(budget, rx).await {
            Ok(Ok(value)) => value,
            Ok(Err(_)) => {
                return Err(HarnessError::Driver(
                    "playwright sidecar closed unexpectedly".to_string(),
                ))
            }
            Err(_) => {
                self.pending.lock().await.remove(&id);
                return Err(HarnessError::timeout(format!("sidecar op '{op}'"), budget));
            }
        };

        if response.get("ok").and_then(Value::as_bool).unwrap_or(false) {
            Ok(response.get("value").cloned().unwrap_or(Value::Null))
        } else {
            let message = response
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown sidecar error");
            Err(HarnessError::Driver(format!("{op}: {message}")))
        }
    }

    /// Graceful stop: shutdown command, SIGTERM, then kill.
    async fn stop(&self) {
        let _ = self
            .call("shutdown", json!({}), Duration::from_secs(2))
            .await;

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let pid = self.child.lock().id();
            if let Some(pid) = pid {
                let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
        }

        let _ = self.child.lock().start_kill();
    }
}

/// Handle to a launched Playwright browser.
pub struct PlaywrightBrowser {
    sidecar: Arc<Sidecar>,
}

impl PlaywrightBrowser {
    /// Launch the Node sidecar and wait for its ready handshake.
    pub async fn launch(config: PlaywrightConfig) -> Result<Self> {
        Self::check_installed()?;

        let workdir = tempfile::tempdir()?;
        let script_path = workdir.path().join("sidecar.js");
        std::fs::write(&script_path, render_sidecar_script(&config))?;

        let mut child = Command::new("node")
            .arg(&script_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| HarnessError::Driver(format!("failed to spawn node: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| HarnessError::Driver("sidecar stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| HarnessError::Driver("sidecar stdout unavailable".to_string()))?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    warn!(target: "playwright", "{line}");
                }
            });
        }

        let mut lines = BufReader::new(stdout).lines();

        // Handshake: the first line must be {"ready":true}.
        let first = tokio::time::timeout(config.launch_timeout, lines.next_line())
            .await
            .map_err(|_| {
                HarnessError::timeout("playwright sidecar handshake", config.launch_timeout)
            })?
            .map_err(HarnessError::Io)?
            .ok_or_else(|| HarnessError::Driver("sidecar exited before handshake".to_string()))?;
        let ready: Value = serde_json::from_str(&first)
            .map_err(|_| HarnessError::Driver(format!("unexpected handshake: {first}")))?;
        if ready.get("ready").and_then(Value::as_bool) != Some(true) {
            return Err(HarnessError::Driver(format!(
                "sidecar failed to start: {first}"
            )));
        }
        info!(browser = config.browser.as_str(), "playwright sidecar ready");

        let pending: Arc<Mutex<HashMap<u64, oneshot::Sender<Value>>>> =
            Arc::new(Mutex::new(HashMap::new()));
        let reader_pending = pending.clone();
        tokio::spawn(async move {
            let mut lines = lines;
            while let Ok(Some(line)) = lines.next_line().await {
                let value: Value = match serde_json::from_str(&line) {
                    Ok(v) => v,
                    Err(e) => {
                        warn!(%line, "unparseable sidecar output: {e}");
                        continue;
                    }
                };
                let Some(id) = value.get("id").and_then(Value::as_u64) else {
                    continue;
                };
                if let Some(tx) = reader_pending.lock().await.remove(&id) {
                    let _ = tx.send(value);
                }
            }
            debug!("sidecar stdout closed");
        });

        Ok(Self {
            sidecar: Arc::new(Sidecar {
                stdin: Mutex::new(stdin),
                pending,
                next_id: AtomicU64::new(1),
                call_timeout: config.call_timeout,
                child: parking_lot::Mutex::new(child),
                _workdir: workdir,
            }),
        })
    }

    fn check_installed() -> Result<()> {
        let status = std::process::Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(HarnessError::Driver(
                "playwright not found; install with: npx playwright install".to_string(),
            )),
        }
    }

    /// Shut the sidecar down.
    pub async fn shutdown(&self) {
        self.sidecar.stop().await;
    }
}

#[async_trait]
impl Browser for PlaywrightBrowser {
    async fn context(&self, storage: Option<&StorageState>) -> Result<Box<dyn PageDriver>> {
        let params = match storage {
            Some(state) => json!({ "storage_state": state.as_json() }),
            None => json!({}),
        };
        let value = self
            .sidecar
            .call("new_context", params, self.sidecar.call_timeout)
            .await?;
        let ctx = value
            .get("ctx")
            .and_then(Value::as_u64)
            .ok_or_else(|| HarnessError::Driver("new_context returned no id".to_string()))?;
        Ok(Box::new(PlaywrightPage {
            sidecar: self.sidecar.clone(),
            ctx,
        }))
    }
}

/// One Playwright context+page pair inside the sidecar.
pub struct PlaywrightPage {
    sidecar: Arc<Sidecar>,
    ctx: u64,
}

impl PlaywrightPage {
    async fn op(&self, op: &str, mut params: Value) -> Result<Value> {
        params["ctx"] = json!(self.ctx);
        self.sidecar.call(op, params, self.sidecar.call_timeout).await
    }
}

#[async_trait]
impl PageDriver for PlaywrightPage {
    async fn goto(&self, url: &str) -> Result<()> {
        self.op("goto", json!({ "url": url })).await.map(|_| ())
    }

    async fn current_url(&self) -> Result<String> {
        let value = self.op("current_url", json!({})).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| HarnessError::Driver("current_url returned no string".to_string()))
    }

    async fn wait_for_load(&self, budget: Duration) -> Result<()> {
        let call_budget = budget + Duration::from_secs(1);
        self.sidecar
            .call(
                "wait_for_load",
                json!({ "ctx": self.ctx, "timeout_ms": budget.as_millis() as u64 }),
                call_budget,
            )
            .await
            .map(|_| ())
    }

    async fn scroll_into_view(&self, selector: &str) -> Result<()> {
        self.op("scroll_into_view", json!({ "selector": selector }))
            .await
            .map(|_| ())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.op("click", json!({ "selector": selector }))
            .await
            .map(|_| ())
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        self.op("fill", json!({ "selector": selector, "value": value }))
            .await
            .map(|_| ())
    }

    async fn select_option(&self, selector: &str, value: &str) -> Result<()> {
        self.op("select_option", json!({ "selector": selector, "value": value }))
            .await
            .map(|_| ())
    }

    async fn set_checked(&self, selector: &str, checked: bool) -> Result<()> {
        self.op("set_checked", json!({ "selector": selector, "checked": checked }))
            .await
            .map(|_| ())
    }

    async fn press(&self, selector: &str, key: &str) -> Result<()> {
        self.op("press", json!({ "selector": selector, "key": key }))
            .await
            .map(|_| ())
    }

    async fn is_visible(&self, selector: &str) -> Result<bool> {
        let value = self.op("is_visible", json!({ "selector": selector })).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn is_enabled(&self, selector: &str) -> Result<bool> {
        let value = self.op("is_enabled", json!({ "selector": selector })).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn is_checked(&self, selector: &str) -> Result<bool> {
        let value = self.op("is_checked", json!({ "selector": selector })).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn inner_text(&self, selector: &str) -> Result<String> {
        let value = self.op("inner_text", json!({ "selector": selector })).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn input_value(&self, selector: &str) -> Result<String> {
        let value = self.op("input_value", json!({ "selector": selector })).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>> {
        let value = self
            .op("attribute", json!({ "selector": selector, "name": name }))
            .await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        let value = self.op("screenshot", json!({})).await?;
        let encoded = value
            .as_str()
            .ok_or_else(|| HarnessError::Driver("screenshot returned no data".to_string()))?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| HarnessError::Driver(format!("invalid screenshot payload: {e}")))
    }

    async fn storage_state(&self) -> Result<StorageState> {
        let value = self.op("storage_state", json!({})).await?;
        Ok(StorageState::new(value))
    }

    async fn close(&self) -> Result<()> {
        self.op("close_context", json!({})).await.map(|_| ())
    }
}

/// Render the sidecar script for this configuration.
fn render_sidecar_script(config: &PlaywrightConfig) -> String {
    SIDECAR_JS
        .replace("__BROWSER__", config.browser.as_str())
        .replace("__HEADLESS__", if config.headless { "true" } else { "false" })
        .replace("__WIDTH__", &config.viewport_width.to_string())
        .replace("__HEIGHT__", &config.viewport_height.to_string())
}

const SIDECAR_JS: &str = r#"
const readline = require('readline');
const { chromium, firefox, webkit } = require('playwright');

const engines = { chromium, firefox, webkit };

(async () => {
  const browser = await engines['__BROWSER__'].launch({ headless: __HEADLESS__ });
  const contexts = new Map();
  let nextCtx = 1;
  console.log(JSON.stringify({ ready: true }));

  const rl = readline.createInterface({ input: process.stdin });
  for await (const line of rl) {
    let msg;
    try { msg = JSON.parse(line); } catch (e) { continue; }
    const { id, op, params = {} } = msg;
    const reply = (ok, value, error) =>
      console.log(JSON.stringify({ id, ok, value: value === undefined ? null : value, error }));
    try {
      if (op === 'shutdown') { reply(true); break; }
      if (op === 'new_context') {
        const options = { viewport: { width: __WIDTH__, height: __HEIGHT__ } };
        if (params.storage_state) options.storageState = params.storage_state;
        const context = await browser.newContext(options);
        const page = await context.newPage();
        const ctx = nextCtx++;
        contexts.set(ctx, { context, page });
        reply(true, { ctx });
        continue;
      }
      const entry = contexts.get(params.ctx);
      if (!entry) { reply(false, null, 'unknown context ' + params.ctx); continue; }
      const { context, page } = entry;
      switch (op) {
        case 'goto':
          await page.goto(params.url);
          reply(true); break;
        case 'current_url':
          reply(true, page.url()); break;
        case 'wait_for_load':
          await page.waitForLoadState('domcontentloaded', { timeout: params.timeout_ms });
          // A stalled background request must not hang the test.
          await page.waitForLoadState('networkidle', { timeout: params.timeout_ms }).catch(() => {});
          reply(true); break;
        case 'scroll_into_view':
          await page.locator(params.selector).scrollIntoViewIfNeeded();
          reply(true); break;
        case 'click':
          await page.click(params.selector);
          reply(true); break;
        case 'fill':
          await page.fill(params.selector, params.value);
          reply(true); break;
        case 'select_option':
          await page.selectOption(params.selector, params.value);
          reply(true); break;
        case 'set_checked':
          await page.setChecked(params.selector, params.checked);
          reply(true); break;
        case 'press':
          await page.locator(params.selector).press(params.key);
          reply(true); break;
        case 'is_visible':
          reply(true, await page.locator(params.selector).isVisible()); break;
        case 'is_enabled':
          reply(true, await page.locator(params.selector).isEnabled()); break;
        case 'is_checked':
          reply(true, await page.locator(params.selector).isChecked()); break;
        case 'inner_text':
          reply(true, await page.locator(params.selector).innerText()); break;
        case 'input_value':
          reply(true, await page.locator(params.selector).inputValue()); break;
        case 'attribute':
          reply(true, await page.locator(params.selector).getAttribute(params.name)); break;
        case 'screenshot': {
          const buffer = await page.screenshot({ fullPage: true });
          reply(true, buffer.toString('base64')); break;
        }
        case 'storage_state':
          reply(true, await context.storageState()); break;
        case 'close_context':
          await context.close();
          contexts.delete(params.ctx);
          reply(true); break;
        default:
          reply(false, null, 'unknown op ' + op);
      }
    } catch (e) {
      reply(false, null, e.message);
    }
  }
  await browser.close();
  process.exit(0);
})();
"#;
