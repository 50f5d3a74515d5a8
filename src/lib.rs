//! Tenant-scoped asymmetric key management core.
//!
//! A two-tier key hierarchy: HSM-resident master keys (one per
//! `applicationId`) wrap DB-resident per-reference RSA keypairs, minted
//! lazily on first use. [`facade::CryptoFacade`] is the only entry point
//! external callers need; everything else is the machinery it is built
//! from.
//!
//! ```text
//! CryptoFacade
//!   -> KeyResolver   (selects or mints the current KeyAlias for a scope)
//!     -> ExpiryPlanner (computes a new alias's non-overlapping window)
//!     -> LockTable     (serializes concurrent mints per scope)
//!   -> HsmVault / WrappedKeyStore (where key material actually lives)
//!   -> AsymmetricCrypto (RSA primitives, DER in and out)
//! ```

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod facade;
pub mod lock_table;
pub mod observability;
pub mod planner;
pub mod resolver;
pub mod traits;

pub use config::CoreConfig;
pub use domain::{AuditStamp, KeyAlias, KeyLocation, KeyPolicy, MintPolicy, PublicKeyMaterial, Scope, WrappedKey};
pub use error::{CoreError, ErrorKind, ErrorSeverity, Result};
pub use facade::CryptoFacade;
pub use resolver::KeyResolver;
