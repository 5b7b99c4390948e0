//! Integration test: `templates/config.yaml` loads into a valid `Config`,
//! and bad files are rejected at load time.

use std::path::Path;

use mcp_gateway::config::Config;
use mcp_gateway::tools::build_router;

#[tokio::test]
async fn template_config_loads() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("templates/config.yaml");
    let cfg = Config::load(&path)
        .await
        .unwrap_or_else(|e| panic!("{} failed to load: {e:#}", path.display()));

    assert_eq!(cfg.models[0].id, "openai-default");
    assert_eq!(cfg.models[0].provider, "openai");
    assert_eq!(cfg.max_retries, 2);
    assert_eq!(cfg.tools.priority, ["github", "brave-search", "puppeteer"]);

    let github = cfg.tools.github.as_ref().expect("github section");
    assert_eq!(github.base_url, "http://localhost:3000");
    let browser = cfg.tools.puppeteer.as_ref().expect("puppeteer section");
    assert_eq!(browser.wait_time_ms, 5000);

    let router = build_router(&cfg.tools).unwrap();
    let ids: Vec<String> = router.identities().into_iter().map(|t| t.id).collect();
    assert_eq!(ids, ["github", "brave-search", "puppeteer"]);
}

// ── deny_unknown_fields validation ──────────────────────────

#[tokio::test]
async fn unknown_top_level_field_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.yaml");
    std::fs::write(
        &path,
        "models:\n  - id: m\n    provider: stub\nfoo_unknown: true\n",
    )
    .unwrap();

    let err = format!("{:#}", Config::load(&path).await.unwrap_err());
    assert!(
        err.contains("unknown field") || err.contains("foo_unknown"),
        "error should mention the unknown field, got: {err}"
    );
}

#[tokio::test]
async fn unknown_tool_field_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad_tool.yaml");
    std::fs::write(
        &path,
        r#"
models:
  - id: m
    provider: stub
tools:
  brave_search:
    base_url: http://localhost:3001
    bogus_field: 42
"#,
    )
    .unwrap();

    let err = format!("{:#}", Config::load(&path).await.unwrap_err());
    assert!(
        err.contains("unknown field") || err.contains("bogus_field"),
        "error should mention the unknown field, got: {err}"
    );
}

// ── semantic validation ─────────────────────────────────────

#[tokio::test]
async fn config_without_models_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.yaml");
    std::fs::write(&path, "models: []\n").unwrap();

    let err = format!("{:#}", Config::load(&path).await.unwrap_err());
    assert!(err.contains("at least one model"), "{err}");
}

#[tokio::test]
async fn unknown_priority_entry_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("priority.yaml");
    std::fs::write(
        &path,
        "models:\n  - id: m\n    provider: stub\ntools:\n  priority: [github, weather]\n",
    )
    .unwrap();

    let err = format!("{:#}", Config::load(&path).await.unwrap_err());
    assert!(err.contains("weather"), "{err}");
}

#[tokio::test]
async fn missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = format!(
        "{:#}",
        Config::load(&dir.path().join("config.yaml")).await.unwrap_err()
    );
    assert!(err.contains("failed to read config file"), "{err}");
}
