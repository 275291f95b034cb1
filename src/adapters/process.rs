//! Out-of-process geometry engine.
//!
//! Spawns the engine host (by default `FreeCADCmd` running a bridge script)
//! and exchanges one JSON object per line over stdin/stdout:
//!
//! ```text
//! -> {"id":3,"op":"set_datum","instance":"608","datum":"OR","value":14.5}
//! <- {"id":3,"ok":true}
//! <- {"id":4,"error":{"kind":"rejected","message":"over-constrained"}}
//! ```
//!
//! Operations are `open`, `clone`, `set_datum`, `get_datum`, `recompute`,
//! `export`, `discard`, `save` and `close`. Error replies carry a `kind` of
//! `rejected` (the solver refused, the session goes on) or `fatal`.
//! `get_datum` replies with `value` and `unit`, which must be `mm`. The FreeCAD
//! implementation of the host side is `bearing-engine.py` at the crate root.
//!
//! The host is known to exit with status 0 after internal failures, so a
//! session only counts as healthy when `close` is acknowledged and the
//! process then exits successfully.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, trace, warn};

use crate::domain::models::{Dof, EngineConfig, ExportFormat};
use crate::domain::ports::{EngineError, EngineResult, GeometryEngine, InstanceHandle};

/// Length unit the engine must report datums in.
const EXPECTED_UNIT: &str = "mm";

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum EngineCommand<'a> {
    Open { path: &'a Path, label: &'a str },
    Clone { label: &'a str },
    SetDatum { instance: &'a str, datum: &'static str, value: f64 },
    GetDatum { instance: &'a str, datum: &'static str },
    Recompute { instance: &'a str },
    Export { instance: &'a str, format: ExportFormat, path: &'a Path },
    Discard { instance: &'a str },
    Save { keep: &'a [String], path: &'a Path },
    Close,
}

#[derive(Debug, Serialize)]
struct Envelope<'a> {
    id: u64,
    #[serde(flatten)]
    command: EngineCommand<'a>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum FaultKind {
    Rejected,
    Fatal,
}

#[derive(Debug, Deserialize)]
struct Fault {
    kind: FaultKind,
    message: String,
}

#[derive(Debug, Deserialize)]
struct EngineReply {
    id: u64,
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    value: Option<f64>,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default)]
    error: Option<Fault>,
}

impl EngineReply {
    fn into_result(self) -> EngineResult<Self> {
        if let Some(fault) = self.error {
            return Err(match fault.kind {
                FaultKind::Rejected => EngineError::Rejected(fault.message),
                FaultKind::Fatal => EngineError::Process(fault.message),
            });
        }
        if !self.ok {
            return Err(EngineError::Protocol(format!(
                "reply {} is neither ok nor an error",
                self.id
            )));
        }
        Ok(self)
    }

    fn datum_value(&self) -> EngineResult<f64> {
        if let Some(unit) = self.unit.as_deref() {
            if unit != EXPECTED_UNIT {
                return Err(EngineError::Protocol(format!(
                    "expected datum in {EXPECTED_UNIT}, got {unit}"
                )));
            }
        }
        self.value
            .ok_or_else(|| EngineError::Protocol(format!("reply {} carries no value", self.id)))
    }
}

/// Geometry engine hosted in a child process.
pub struct ProcessEngine {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
}

impl ProcessEngine {
    /// Launch the engine host described by `config`.
    ///
    /// The child is killed if the engine is dropped before `close`.
    pub fn spawn(config: &EngineConfig) -> EngineResult<Self> {
        check_bridge_scripts(config)?;

        let mut child = Command::new(&config.command)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineError::Process(format!("failed to spawn {}: {e}", config.command)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::Protocol("failed to capture engine stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::Protocol("failed to capture engine stdout".to_string()))?;

        debug!(command = %config.command, pid = ?child.id(), "engine process started");

        Ok(Self {
            child,
            stdin: Some(stdin),
            stdout: BufReader::new(stdout).lines(),
            next_id: 1,
        })
    }

    async fn call(&mut self, command: EngineCommand<'_>) -> EngineResult<EngineReply> {
        let id = self.next_id;
        self.next_id += 1;

        let mut line = serde_json::to_string(&Envelope { id, command })
            .map_err(|e| EngineError::Protocol(e.to_string()))?;
        line.push('\n');
        trace!(request = %line.trim_end(), "engine request");

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(EngineError::Protocol("engine session already closed".to_string()));
        };
        if let Err(err) = stdin.write_all(line.as_bytes()).await {
            warn!(error = %err, "engine stdin closed");
            return Err(self.exited_early().await);
        }
        stdin.flush().await?;

        loop {
            let Some(raw) = self.stdout.next_line().await? else {
                return Err(self.exited_early().await);
            };
            let raw = raw.trim();
            // Engine hosts print banners and progress on stdout too
            if !raw.starts_with('{') {
                debug!(line = raw, "engine output");
                continue;
            }

            let reply: EngineReply = serde_json::from_str(raw)
                .map_err(|e| EngineError::Protocol(format!("malformed reply {raw:?}: {e}")))?;
            if reply.id != id {
                return Err(EngineError::Protocol(format!(
                    "expected reply {id}, got {}",
                    reply.id
                )));
            }
            return reply.into_result();
        }
    }

    async fn exited_early(&mut self) -> EngineError {
        match self.child.wait().await {
            Ok(status) => EngineError::Process(format!("engine exited before replying ({status})")),
            Err(err) => EngineError::Io(err),
        }
    }
}

/// Python arguments are bridge scripts; a missing one would only surface as an
/// opaque host error.
fn check_bridge_scripts(config: &EngineConfig) -> EngineResult<()> {
    for arg in &config.args {
        let script = Path::new(arg);
        if script.extension().is_some_and(|ext| ext == "py") && !script.is_file() {
            return Err(EngineError::Process(format!(
                "engine bridge script not found: {} (set engine.args to its path)",
                script.display()
            )));
        }
    }
    Ok(())
}

#[async_trait]
impl GeometryEngine for ProcessEngine {
    fn name(&self) -> &'static str {
        "process"
    }

    async fn open_template(&mut self, path: &Path, label: &str) -> EngineResult<()> {
        self.call(EngineCommand::Open { path, label }).await?;
        Ok(())
    }

    async fn clone_template(&mut self, label: &str) -> EngineResult<InstanceHandle> {
        self.call(EngineCommand::Clone { label }).await?;
        Ok(InstanceHandle::new(label))
    }

    async fn set_parameter(
        &mut self,
        instance: &InstanceHandle,
        dof: Dof,
        value: f64,
    ) -> EngineResult<()> {
        self.call(EngineCommand::SetDatum {
            instance: instance.label(),
            datum: dof.datum(),
            value,
        })
        .await?;
        Ok(())
    }

    async fn get_parameter(&mut self, instance: &InstanceHandle, dof: Dof) -> EngineResult<f64> {
        let reply = self
            .call(EngineCommand::GetDatum {
                instance: instance.label(),
                datum: dof.datum(),
            })
            .await?;
        reply.datum_value()
    }

    async fn recompute(&mut self, instance: &InstanceHandle) -> EngineResult<()> {
        self.call(EngineCommand::Recompute {
            instance: instance.label(),
        })
        .await?;
        Ok(())
    }

    async fn export(
        &mut self,
        instance: &InstanceHandle,
        format: ExportFormat,
        path: &Path,
    ) -> EngineResult<()> {
        self.call(EngineCommand::Export {
            instance: instance.label(),
            format,
            path,
        })
        .await?;
        Ok(())
    }

    async fn discard(&mut self, instance: InstanceHandle) -> EngineResult<()> {
        self.call(EngineCommand::Discard {
            instance: instance.label(),
        })
        .await?;
        Ok(())
    }

    async fn save_document(&mut self, keep: &[String], path: &Path) -> EngineResult<()> {
        self.call(EngineCommand::Save { keep, path }).await?;
        Ok(())
    }

    async fn close(&mut self) -> EngineResult<()> {
        self.call(EngineCommand::Close).await?;

        // Dropping stdin lets the host see EOF and exit
        drop(self.stdin.take());
        let status = self.child.wait().await?;
        if !status.success() {
            return Err(EngineError::Process(format!(
                "engine exited with {status} after closing"
            )));
        }
        debug!(%status, "engine process finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(raw: &str) -> EngineReply {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn test_request_shape() {
        let line = serde_json::to_string(&Envelope {
            id: 3,
            command: EngineCommand::SetDatum {
                instance: "608",
                datum: Dof::OuterRadius.datum(),
                value: 14.5,
            },
        })
        .unwrap();
        assert_eq!(
            line,
            r#"{"id":3,"op":"set_datum","instance":"608","datum":"OR","value":14.5}"#
        );
    }

    #[test]
    fn test_close_request_shape() {
        let line = serde_json::to_string(&Envelope {
            id: 9,
            command: EngineCommand::Close,
        })
        .unwrap();
        assert_eq!(line, r#"{"id":9,"op":"close"}"#);
    }

    #[test]
    fn test_rejection_reply() {
        let err = reply(r#"{"id":1,"error":{"kind":"rejected","message":"conflicting constraints"}}"#)
            .into_result()
            .unwrap_err();
        assert!(err.is_rejection());
    }

    #[test]
    fn test_fatal_reply() {
        let err = reply(r#"{"id":1,"error":{"kind":"fatal","message":"document lost"}}"#)
            .into_result()
            .unwrap_err();
        assert!(matches!(err, EngineError::Process(_)));
    }

    #[test]
    fn test_empty_reply_is_protocol_error() {
        let err = reply(r#"{"id":1}"#).into_result().unwrap_err();
        assert!(matches!(err, EngineError::Protocol(_)));
    }

    #[test]
    fn test_datum_unit_checked() {
        let ok = reply(r#"{"id":1,"ok":true,"value":11.0,"unit":"mm"}"#);
        assert!((ok.datum_value().unwrap() - 11.0).abs() < f64::EPSILON);

        let inches = reply(r#"{"id":1,"ok":true,"value":11.0,"unit":"in"}"#);
        assert!(inches.datum_value().is_err());
    }

    fn shell(script: &str) -> EngineConfig {
        EngineConfig {
            command: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_missing_bridge_script_fails_spawn() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("bearing-engine.py");
        let config = EngineConfig {
            command: "FreeCADCmd".to_string(),
            args: vec![script.display().to_string()],
            timeout_secs: 5,
        };

        match ProcessEngine::spawn(&config) {
            Err(EngineError::Process(message)) => {
                assert!(message.contains("bridge script not found"));
            }
            Err(other) => panic!("Expected Process error, got {other:?}"),
            Ok(_) => panic!("spawn must fail without the bridge script"),
        }
    }

    #[test]
    fn test_shipped_bridge_script_exists() {
        let script = Path::new(env!("CARGO_MANIFEST_DIR")).join("bearing-engine.py");
        assert!(script.is_file());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_clean_exit_without_reply_is_fatal() {
        let mut engine = ProcessEngine::spawn(&shell("read line; exit 0")).unwrap();
        let err = engine
            .open_template(Path::new("template.FCStd"), "template")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Process(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_acknowledging_host_round_trip() {
        // Answers every request with ok, echoing its id
        let script = r#"while read -r line; do id=${line#*\"id\":}; id=${id%%,*}; id=${id%%\}*}; echo "{\"id\":$id,\"ok\":true}"; done"#;
        let mut engine = ProcessEngine::spawn(&shell(script)).unwrap();

        engine
            .open_template(Path::new("template.FCStd"), "template")
            .await
            .unwrap();
        let handle = engine.clone_template("608").await.unwrap();
        engine.recompute(&handle).await.unwrap();
        engine.close().await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_exit_after_close_is_fatal() {
        let script = r#"read -r line; echo '{"id":1,"ok":true}'; read -r line; exit 3"#;
        let mut engine = ProcessEngine::spawn(&shell(script)).unwrap();
        let err = engine.close().await.unwrap_err();
        assert!(matches!(err, EngineError::Process(_)));
    }
}
