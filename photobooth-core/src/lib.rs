//! Photo Booth Core - Secure Artifact Store and Print Dispatcher
//!
//! # The Guarantees
//! 1. Identifiers Are UUIDv4 Or Nothing
//! 2. Paths Never Leave The Root
//! 3. Policy Runs Before I/O
//! 4. Print Failures Are Typed
//! 5. Collaborators Are Injected

pub mod error;
pub mod identifier;
pub mod paths;
pub mod formats;
pub mod config;
pub mod store;
pub mod runner;
pub mod print;
pub mod gateway;
pub mod classifier;
pub mod dispatcher;

pub use error::{CommandFailure, ErrorKind, StoreError};
pub use identifier::ArtifactId;
pub use formats::ImageFormat;
pub use config::{BoothConfig, PrintConfig, PrintOptions, SecurityConfig, StoreConfig};
pub use store::{Artifact, ArtifactStore, EncodedImage};
pub use runner::{CommandOutput, CommandRunner, ProcessRunner, ScriptedRunner};
pub use print::{PrintResult, PrinterStatus};
pub use gateway::{extract_job_id, LpGateway, PrinterGateway};
pub use classifier::{ErrorClassifier, SubstringClassifier};
pub use dispatcher::{DispatchStage, PrintDispatcher};

pub const CORE_VERSION: &str = env!("CARGO_PKG_VERSION");
