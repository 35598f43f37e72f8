//! Bundle artifacts
//!
//! The widget build emits the script and its WASM module into the dist
//! directory under fixed names. The stylesheet and the demo page are copied
//! next to them at startup so the directory can be served as is.
//!
//! The script is a `no-modules` wasm-bindgen build, which only defines the
//! `wasm_bindgen` global. A small loader is appended to it once so that a
//! plain `<script src=".../paywall.js">` tag starts the widget by itself and
//! exposes the host API on `window`.

use std::path::{Path, PathBuf};

use anyhow::Context;

pub const BUNDLE_JS: &str = "paywall.js";
pub const BUNDLE_WASM: &str = "paywall_bg.wasm";
pub const BUNDLE_CSS: &str = "paywall.css";
pub const INDEX_HTML: &str = "index.html";

/// First line of the appended loader, used to detect it
const LOADER_MARKER: &str = "/* daily-breathing-paywall loader */";

/// Fetches the module next to the script and publishes the host API
const LOADER: &str = r"
/* daily-breathing-paywall loader */
(function () {
  var script = document.currentScript;
  var base = script && script.src ? script.src.replace(/[^\/]*$/, '') : './';
  wasm_bindgen({ module_or_path: base + 'paywall_bg.wasm' })
    .then(function () {
      window.initDailyBreathingPaywall = wasm_bindgen.initDailyBreathingPaywall;
      window.disconnectDailyBreathingPaywall = wasm_bindgen.disconnectDailyBreathingPaywall;
      window.setDailyBreathingPaywallSession = wasm_bindgen.setDailyBreathingPaywallSession;
    })
    .catch(function (e) {
      console.error('Daily Breathing Paywall failed to load', e);
    });
})();
";

/// Copy `source` into `dist_dir` as `file_name`
pub fn stage(source: &Path, dist_dir: &Path, file_name: &str) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dist_dir)
        .with_context(|| format!("creating {}", dist_dir.display()))?;

    let target = dist_dir.join(file_name);
    std::fs::copy(source, &target)
        .with_context(|| format!("copying {} to {}", source.display(), target.display()))?;

    Ok(target)
}

/// Append the self-starting loader to the built script
///
/// Returns `false` when the loader is already there.
pub fn append_loader(dist_dir: &Path) -> anyhow::Result<bool> {
    let script = dist_dir.join(BUNDLE_JS);
    let mut content = std::fs::read_to_string(&script)
        .with_context(|| format!("reading {}", script.display()))?;

    if content.contains(LOADER_MARKER) {
        return Ok(false);
    }

    content.push_str(LOADER);
    std::fs::write(&script, content).with_context(|| format!("writing {}", script.display()))?;
    Ok(true)
}

/// Whether the built script is present
pub fn bundle_present(dist_dir: &Path) -> bool {
    dist_dir.join(BUNDLE_JS).is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_creates_dist_and_copies() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("demo.html");
        std::fs::write(&source, "<div data-daily-breathing-paywall></div>").unwrap();
        let dist = dir.path().join("dist");

        let staged = stage(&source, &dist, INDEX_HTML).unwrap();

        assert_eq!(staged, dist.join(INDEX_HTML));
        assert_eq!(
            std::fs::read_to_string(staged).unwrap(),
            "<div data-daily-breathing-paywall></div>"
        );
    }

    #[test]
    fn test_stage_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let err = stage(&dir.path().join("missing.html"), dir.path(), INDEX_HTML).unwrap_err();
        assert!(err.to_string().contains("missing.html"));
    }

    #[test]
    fn test_loader_is_appended_once() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join(BUNDLE_JS);
        std::fs::write(&script, "let wasm_bindgen;\n").unwrap();

        assert!(append_loader(dir.path()).unwrap());
        assert!(!append_loader(dir.path()).unwrap());

        let content = std::fs::read_to_string(script).unwrap();
        assert!(content.starts_with("let wasm_bindgen;\n"));
        assert_eq!(content.matches(LOADER_MARKER).count(), 1);
        assert!(content.contains(BUNDLE_WASM));
        assert!(content.contains("window.initDailyBreathingPaywall"));
    }

    #[test]
    fn test_loader_needs_built_script() {
        let dir = tempfile::tempdir().unwrap();
        let err = append_loader(dir.path()).unwrap_err();
        assert!(err.to_string().contains(BUNDLE_JS));
    }

    #[test]
    fn test_bundle_present() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!bundle_present(dir.path()));
        std::fs::write(dir.path().join(BUNDLE_JS), "").unwrap();
        assert!(bundle_present(dir.path()));
    }
}
