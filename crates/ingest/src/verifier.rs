use std::sync::{Arc, LazyLock};

use chrono::Utc;
use explorer_chain::canonical_address;
use explorer_core::AppError;
use explorer_storage::models::Contract;
use explorer_storage::{Json, Store};
use regex::Regex;
use tokio_util::sync::CancellationToken;

use crate::solc::{CompileRequest, Compiler};

/// Trailing swarm metadata emitted by legacy solc versions.
static METADATA_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("056fea165627a7a72305820.*0029$").expect("metadata pattern is valid")
});

/// Characters at the end of legacy bytecode allowed to differ.
const LEGACY_TAIL: usize = 69;

/// A source submission for one deployed contract.
#[derive(Debug, Clone)]
pub struct VerificationRequest {
    pub address: String,
    pub contract_name: String,
    pub compiler_version: String,
    pub optimization: bool,
    pub evm_version: Option<String>,
    pub source_code: String,
}

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("contract with given address not found")]
    NotFound,

    #[error("contract with given address is already verified")]
    AlreadyVerified,

    #[error("error occurred while compiling source code: {0}")]
    Compilation(String),

    #[error("invalid contract name: {0}")]
    UnknownContract(String),

    #[error("contract binary is empty")]
    EmptyBytecode,

    #[error("the compiled result does not match the bytecode located at {0}")]
    BytecodeMismatch(String),

    #[error(transparent)]
    Backend(#[from] AppError),
}

/// Compiles submitted source and promotes the stored contract to verified
/// when the runtime bytecode matches.
pub struct Verifier {
    store: Arc<dyn Store>,
    compiler: Arc<dyn Compiler>,
}

impl Verifier {
    pub fn new(store: Arc<dyn Store>, compiler: Arc<dyn Compiler>) -> Self {
        Self { store, compiler }
    }

    pub async fn verify_contract(
        &self,
        cancel: &CancellationToken,
        request: &VerificationRequest,
    ) -> Result<Contract, VerifyError> {
        let address = canonical_address(&request.address)?;
        let stored = self
            .store
            .contract(&address)
            .await?
            .ok_or(VerifyError::NotFound)?;
        if stored.valid {
            return Err(VerifyError::AlreadyVerified);
        }

        let compile = CompileRequest {
            source_code: request.source_code.clone(),
            compiler_version: request.compiler_version.clone(),
            optimization: request.optimization,
            evm_version: request.evm_version.clone(),
        };
        let artifacts = match self.compiler.compile(cancel, &compile).await {
            Ok(artifacts) => artifacts,
            Err(AppError::Cancelled) => return Err(AppError::Cancelled.into()),
            Err(err) => {
                tracing::error!(%address, error = %err, "compilation failed");
                return Err(VerifyError::Compilation(err.to_string()));
            }
        };

        let key = format!("<stdin>:{}", request.contract_name);
        let compiled = artifacts
            .get(&key)
            .ok_or_else(|| VerifyError::UnknownContract(request.contract_name.clone()))?;
        if strip_prefix(&compiled.runtime_bytecode).is_empty() {
            return Err(VerifyError::EmptyBytecode);
        }
        if !bytecode_equal(&compiled.runtime_bytecode, &stored.bytecode) {
            return Err(VerifyError::BytecodeMismatch(address));
        }

        let verified = Contract {
            valid: true,
            contract_name: Some(request.contract_name.clone()),
            compiler_version: Some(compiled.compiler_version.clone()),
            optimization: request.optimization,
            source_code: Some(compiled.source.clone()),
            abi: Some(Json(compiled.abi.clone())),
            updated_at: Some(Utc::now()),
            ..stored
        };

        // A concurrent verification may have won since the read above.
        if !self.store.mark_contract_verified(&verified).await? {
            return Err(VerifyError::AlreadyVerified);
        }
        tracing::info!(%address, name = %request.contract_name, "contract verified");
        Ok(verified)
    }
}

fn strip_prefix(code: &str) -> &str {
    code.strip_prefix("0x").unwrap_or(code)
}

fn normalize(code: &str) -> String {
    METADATA_SUFFIX.replace(strip_prefix(code), "").into_owned()
}

/// Compare compiled and on-chain runtime bytecode, ignoring the embedded
/// metadata hash. Equal-length legacy output may also differ in its last
/// 69 characters.
pub fn bytecode_equal(compiled: &str, on_chain: &str) -> bool {
    let compiled = normalize(compiled);
    let on_chain = normalize(on_chain);
    if compiled == on_chain {
        return true;
    }

    let len = compiled.len();
    if len != on_chain.len() || len <= LEGACY_TAIL {
        return false;
    }
    compiled.as_bytes()[..len - LEGACY_TAIL] == on_chain.as_bytes()[..len - LEGACY_TAIL]
}
