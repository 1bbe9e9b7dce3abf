// audit.rs: Decision log subcommands: verify, tail.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use rg_audit::{AuditError, AuditLog};
use rg_mcp_gateway::GatewayConfig;

#[derive(Subcommand)]
pub enum AuditCommands {
    /// Verify the decision log hash chain integrity.
    Verify {
        /// Path to decision log (defaults to .readgate/audit.jsonl).
        #[arg(long)]
        log: Option<String>,
    },
    /// Show recent gate decisions.
    Tail {
        /// Path to decision log (defaults to .readgate/audit.jsonl).
        #[arg(long)]
        log: Option<String>,
        /// Number of events to show.
        #[arg(short, default_value = "10")]
        n: usize,
    },
}

pub fn execute(cmd: &AuditCommands, config: &GatewayConfig) -> anyhow::Result<()> {
    match cmd {
        AuditCommands::Verify { log } => {
            let Some(path) = resolve(log.as_deref(), config) else {
                println!("Decision log is disabled in the gateway config.");
                return Ok(());
            };
            if !path.exists() {
                println!("No decision log found at {}", path.display());
                return Ok(());
            }

            match AuditLog::verify_chain(&path) {
                Ok(_) => {
                    let events = AuditLog::read_all(&path)?;
                    println!(
                        "Decision log verified: {} event(s), hash chain intact.",
                        events.len()
                    );
                }
                Err(AuditError::IntegrityViolation {
                    line,
                    expected,
                    actual,
                }) => {
                    println!("INTEGRITY VIOLATION at line {}:", line);
                    println!("  Expected previous_hash: {}", expected);
                    println!("  Actual previous_hash:   {}", actual);
                    println!();
                    println!("The decision log may have been tampered with.");
                    anyhow::bail!("Decision log integrity check failed");
                }
                Err(e) => return Err(e.into()),
            }
        }

        AuditCommands::Tail { log, n } => {
            let Some(path) = resolve(log.as_deref(), config) else {
                println!("Decision log is disabled in the gateway config.");
                return Ok(());
            };
            if !path.exists() {
                println!("No decision log found at {}", path.display());
                return Ok(());
            }

            let events = AuditLog::read_all(&path)?;
            let start = events.len().saturating_sub(*n);
            let recent = &events[start..];

            if recent.is_empty() {
                println!("No gate decisions.");
                return Ok(());
            }

            println!(
                "{:<20} {:<7} {:<9} {:<9} PATH",
                "TIMESTAMP", "ACTION", "OUTCOME", "CONSUMED"
            );
            println!("{}", "-".repeat(80));

            for event in recent {
                println!(
                    "{:<20} {:<7} {:<9} {:<9} {}",
                    event.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    format!("{:?}", event.action),
                    format!("{:?}", event.outcome),
                    if event.credential_consumed { "yes" } else { "-" },
                    event.path,
                );
            }
        }
    }

    Ok(())
}

/// An explicit `--log` wins; otherwise the configured log, if enabled.
fn resolve(log: Option<&str>, config: &GatewayConfig) -> Option<PathBuf> {
    match log {
        Some(path) => Some(PathBuf::from(path)),
        None => config.audit_log.as_deref().map(Path::to_path_buf),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rg_audit::{GateAction, GateEvent, GateOutcome};
    use tempfile::tempdir;

    #[test]
    fn explicit_log_overrides_config() {
        let dir = tempdir().unwrap();
        let config = GatewayConfig::for_project(dir.path());
        assert_eq!(
            resolve(Some("other.jsonl"), &config),
            Some(PathBuf::from("other.jsonl"))
        );
        assert_eq!(
            resolve(None, &config),
            Some(dir.path().join(".readgate").join("audit.jsonl"))
        );
    }

    #[test]
    fn disabled_log_resolves_to_none() {
        let dir = tempdir().unwrap();
        let mut config = GatewayConfig::for_project(dir.path());
        config.audit_log = None;
        assert_eq!(resolve(None, &config), None);
        execute(&AuditCommands::Verify { log: None }, &config).unwrap();
    }

    #[test]
    fn verify_fails_on_tampered_log() {
        let dir = tempdir().unwrap();
        let config = GatewayConfig::for_project(dir.path());
        let path = config.audit_log.clone().unwrap();

        let mut log = AuditLog::open(&path).unwrap();
        for outcome in [GateOutcome::Denied, GateOutcome::Allowed] {
            log.append(&mut GateEvent::new(GateAction::Write, "a.txt", outcome))
                .unwrap();
        }
        log.append(&mut GateEvent::new(GateAction::Read, "a.txt", GateOutcome::Allowed))
            .unwrap();

        execute(&AuditCommands::Verify { log: None }, &config).unwrap();
        execute(&AuditCommands::Tail { log: None, n: 2 }, &config).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines: Vec<&str> = text.lines().collect();
        lines.remove(1);
        std::fs::write(&path, lines.join("\n") + "\n").unwrap();

        assert!(execute(&AuditCommands::Verify { log: None }, &config).is_err());
    }
}
