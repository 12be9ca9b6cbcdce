use std::collections::BTreeMap;
use std::process::Stdio;

use async_trait::async_trait;
use explorer_core::AppError;
use serde::Deserialize;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

const COMBINED_OUTPUT: &str = "bin,bin-runtime,srcmap,srcmap-runtime,abi,userdoc,devdoc,metadata";

/// One compilation job.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileRequest {
    pub source_code: String,
    pub compiler_version: String,
    pub optimization: bool,
    pub evm_version: Option<String>,
}

/// Artifacts for one named contract. Bytecode strings are `0x`-prefixed.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledContract {
    pub bytecode: String,
    pub runtime_bytecode: String,
    pub abi: Value,
    pub metadata: String,
    pub user_doc: Value,
    pub dev_doc: Value,
    pub compiler_version: String,
    pub source: String,
}

/// Compiler service: source plus options in, contract artifacts keyed by
/// `<stdin>:<Name>` out.
#[async_trait]
pub trait Compiler: Send + Sync {
    async fn compile(
        &self,
        cancel: &CancellationToken,
        request: &CompileRequest,
    ) -> Result<BTreeMap<String, CompiledContract>, AppError>;
}

/// Runs `solc` from a versioned Docker image, one container per request.
#[derive(Debug, Clone)]
pub struct DockerSolc {
    image: String,
}

impl Default for DockerSolc {
    fn default() -> Self {
        Self::new("ethereum/solc")
    }
}

impl DockerSolc {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
        }
    }

    fn args(&self, request: &CompileRequest) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            "-i".to_string(),
            "--rm".to_string(),
            format!("{}:{}", self.image, request.compiler_version),
            "--combined-json".to_string(),
            COMBINED_OUTPUT.to_string(),
        ];
        if request.optimization {
            args.push("--optimize".to_string());
        }
        if let Some(evm) = &request.evm_version {
            args.push("--evm-version".to_string());
            args.push(evm.clone());
        }
        args.push("-".to_string());
        args
    }
}

#[async_trait]
impl Compiler for DockerSolc {
    async fn compile(
        &self,
        cancel: &CancellationToken,
        request: &CompileRequest,
    ) -> Result<BTreeMap<String, CompiledContract>, AppError> {
        if request.source_code.trim().is_empty() {
            return Err(AppError::InvalidInput("source code is empty".into()));
        }

        let mut child = Command::new("docker")
            .args(self.args(request))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AppError::Compiler(format!("cannot start solc: {e}")))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(request.source_code.as_bytes())
                .await
                .map_err(|e| AppError::Compiler(format!("cannot write source: {e}")))?;
        }

        let output = tokio::select! {
            _ = cancel.cancelled() => return Err(AppError::Cancelled),
            output = child.wait_with_output() => {
                output.map_err(|e| AppError::Compiler(e.to_string()))?
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::Compiler(stderr.trim().to_string()));
        }

        parse_combined_json(&output.stdout, &request.compiler_version, &request.source_code)
    }
}

#[derive(Deserialize)]
struct CombinedOutput {
    contracts: BTreeMap<String, RawContract>,
    #[serde(default)]
    version: String,
}

#[derive(Deserialize)]
struct RawContract {
    #[serde(default)]
    bin: String,
    #[serde(rename = "bin-runtime", default)]
    bin_runtime: String,
    #[serde(default)]
    abi: Value,
    #[serde(default)]
    metadata: Value,
    #[serde(default)]
    userdoc: Value,
    #[serde(default)]
    devdoc: Value,
}

/// Parse `solc --combined-json` output. Older compilers emit ABI and docs
/// as JSON-encoded strings, newer ones inline them.
pub fn parse_combined_json(
    raw: &[u8],
    requested_version: &str,
    source: &str,
) -> Result<BTreeMap<String, CompiledContract>, AppError> {
    let output: CombinedOutput = serde_json::from_slice(raw)
        .map_err(|e| AppError::Compiler(format!("unreadable compiler output: {e}")))?;
    let version = if output.version.is_empty() {
        requested_version.to_string()
    } else {
        output.version
    };

    output
        .contracts
        .into_iter()
        .map(|(name, c)| {
            let contract = CompiledContract {
                bytecode: prefixed(&c.bin),
                runtime_bytecode: prefixed(&c.bin_runtime),
                abi: inline(c.abi)?,
                metadata: match c.metadata {
                    Value::String(s) => s,
                    Value::Null => String::new(),
                    other => other.to_string(),
                },
                user_doc: inline(c.userdoc)?,
                dev_doc: inline(c.devdoc)?,
                compiler_version: version.clone(),
                source: source.to_string(),
            };
            Ok((name, contract))
        })
        .collect()
}

fn inline(value: Value) -> Result<Value, AppError> {
    match value {
        Value::String(s) if s.is_empty() => Ok(Value::Null),
        Value::String(s) => serde_json::from_str(&s).map_err(|e| AppError::Compiler(e.to_string())),
        other => Ok(other),
    }
}

fn prefixed(code: &str) -> String {
    if code.is_empty() || code.starts_with("0x") {
        code.to_string()
    } else {
        format!("0x{code}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_string_encoded_abi() {
        let raw = br#"{
            "contracts": {
                "<stdin>:Token": {
                    "abi": "[{\"type\":\"function\",\"name\":\"name\"}]",
                    "bin": "6060",
                    "bin-runtime": "6061",
                    "metadata": "{\"compiler\":{}}",
                    "userdoc": "{\"methods\":{}}",
                    "devdoc": ""
                }
            },
            "version": "0.4.24+commit.e67f0147.Linux.g++"
        }"#;

        let parsed = parse_combined_json(raw, "v0.4.24", "contract Token {}").unwrap();
        let token = &parsed["<stdin>:Token"];
        assert_eq!(token.bytecode, "0x6060");
        assert_eq!(token.runtime_bytecode, "0x6061");
        assert_eq!(token.abi[0]["name"], "name");
        assert_eq!(token.user_doc["methods"], serde_json::json!({}));
        assert_eq!(token.dev_doc, Value::Null);
        assert_eq!(token.compiler_version, "0.4.24+commit.e67f0147.Linux.g++");
        assert_eq!(token.source, "contract Token {}");
    }

    #[test]
    fn parses_inline_abi() {
        let raw = br#"{
            "contracts": {
                "<stdin>:A": { "abi": [], "bin": "", "bin-runtime": "" }
            }
        }"#;

        let parsed = parse_combined_json(raw, "0.8.19", "").unwrap();
        let a = &parsed["<stdin>:A"];
        assert_eq!(a.abi, serde_json::json!([]));
        assert!(a.runtime_bytecode.is_empty());
        assert_eq!(a.compiler_version, "0.8.19");
    }

    #[test]
    fn rejects_garbage_output() {
        let err = parse_combined_json(b"Error: ParserError", "0.4.24", "").unwrap_err();
        assert!(matches!(err, AppError::Compiler(_)));
    }

    #[test]
    fn docker_args_follow_options() {
        let solc = DockerSolc::default();
        let args = solc.args(&CompileRequest {
            source_code: "contract A {}".into(),
            compiler_version: "0.5.17".into(),
            optimization: true,
            evm_version: Some("byzantium".into()),
        });
        assert_eq!(args[3], "ethereum/solc:0.5.17");
        assert!(args.contains(&"--optimize".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("-"));
        assert!(args.windows(2).any(|w| w[0] == "--evm-version" && w[1] == "byzantium"));
    }

    #[tokio::test]
    async fn empty_source_is_rejected_before_spawning() {
        let err = DockerSolc::default()
            .compile(
                &CancellationToken::new(),
                &CompileRequest {
                    source_code: "  ".into(),
                    compiler_version: "0.4.24".into(),
                    optimization: false,
                    evm_version: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }
}
