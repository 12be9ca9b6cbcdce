//! Chain ingestion and consistency engine: block import, fork detection,
//! per-address aggregation, contract verification and data migrations.

pub mod aggregator;
pub mod consistency;
pub mod importer;
pub mod migrations;
pub mod solc;
pub mod verifier;

pub use aggregator::{ActiveFilter, AddressUpdate, Aggregator, SignersStats, StatsWindow, TokenMeta};
pub use consistency::Checker;
pub use importer::Importer;
pub use migrations::{InitSchema, Migration, MigrationError, Migrator, TransactionsByAddress};
pub use solc::{CompileRequest, CompiledContract, Compiler, DockerSolc};
pub use verifier::{VerificationRequest, VerifyError, Verifier};
