//! `deskmate doctor` — Diagnose config, credential and storage.

use std::path::Path;

use deskmate_config::AppConfig;
use deskmate_core::provider::{CompletionProvider, CredentialStatus};
use deskmate_providers::ChatCompletionsProvider;
use serde_json::json;

/// Outcome of a single check.
struct Check {
    name: &'static str,
    ok: bool,
    detail: String,
}

impl Check {
    fn pass(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            ok: true,
            detail: detail.into(),
        }
    }

    fn fail(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            ok: false,
            detail: detail.into(),
        }
    }
}

pub async fn run(config_path: &Path, json_output: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut checks = Vec::new();

    let config = if config_path.exists() {
        match AppConfig::load_with(config_path) {
            Ok(config) => {
                checks.push(Check::pass("config", format!("{} is valid", config_path.display())));
                Some(config)
            }
            Err(e) => {
                checks.push(Check::fail("config", e.to_string()));
                None
            }
        }
    } else {
        checks.push(Check::fail(
            "config",
            format!("{} not found — run `deskmate init`", config_path.display()),
        ));
        // Defaults plus environment still let the server start.
        AppConfig::load_with(config_path).ok()
    };

    if let Some(config) = &config {
        let provider = ChatCompletionsProvider::from_config(&config.provider);
        checks.push(match provider.credential_status() {
            CredentialStatus::Configured => Check::pass(
                "credential",
                format!("{} key present, model {}", config.provider.name, provider.model()),
            ),
            CredentialStatus::InvalidFormat => Check::fail(
                "credential",
                format!(
                    "API key must start with \"{}\"",
                    config.provider.credential_prefix
                ),
            ),
            CredentialStatus::NotConfigured => Check::fail(
                "credential",
                "no API key — set provider.api_key or GROQ_API_KEY; answers will be fallbacks",
            ),
        });

        checks.push(match deskmate_store::open(&config.storage).await {
            Ok(stores) => match stores.knowledge.ping().await {
                Ok(()) => {
                    let documents = stores.knowledge.count().await.unwrap_or_default();
                    Check::pass(
                        "storage",
                        format!(
                            "{} reachable, {documents} knowledge document(s)",
                            stores.knowledge.name()
                        ),
                    )
                }
                Err(e) => Check::fail("storage", e.to_string()),
            },
            Err(e) => Check::fail("storage", e.to_string()),
        });
    }

    let issues = checks.iter().filter(|c| !c.ok).count();

    if json_output {
        let report = json!({
            "healthy": issues == 0,
            "checks": checks
                .iter()
                .map(|c| json!({ "name": c.name, "ok": c.ok, "detail": c.detail }))
                .collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("🩺 Deskmate Doctor — System Diagnostics");
    println!("=======================================\n");
    for check in &checks {
        let mark = if check.ok { "✅" } else { "❌" };
        println!("  {mark} {:<10} {}", check.name, check.detail);
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
