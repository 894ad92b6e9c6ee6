//! This library evaluates [DIF Presentation Exchange] definitions against the
//! credentials held by a wallet, selects the credentials to present, and
//! describes the selection as a presentation submission.
//!
//! [DIF Presentation Exchange]: <https://identity.foundation/presentation-exchange/spec/v2.0.0/>
//!
//! # Usage
//!
//! ```ignore
//! use presentation_exchange::core::credential_format::ClaimFormatDesignation;
//! use presentation_exchange::core::presentation_definition::PresentationDefinition;
//! use presentation_exchange::core::wrapped_credential::WrappedCredential;
//! use presentation_exchange::evaluation::{Evaluator, Status};
//!
//! let definition = PresentationDefinition::try_from(definition_json)?;
//!
//! // Wrap the held credentials. SD-JWT credentials need a hasher.
//! let credentials = vec![
//!     WrappedCredential::from_json(0, ClaimFormatDesignation::LdpVc, degree, None)?,
//!     WrappedCredential::from_json(1, ClaimFormatDesignation::VcSdJwt, license, Some(hasher.clone()))?,
//! ];
//!
//! let evaluator = Evaluator::builder().with_options(options).build();
//!
//! // Select the credentials, minimizing disclosures where requested.
//! let selection = evaluator.select(&definition, &credentials, &holder_dids, &[])?;
//! if selection.status == Status::Error {
//!     for error in &selection.errors {
//!         println!("{}: {}", error.tag, error.message);
//!     }
//!     return Ok(());
//! }
//!
//! // Describe the selection for the verifier.
//! let submission = evaluator.build_submission(&definition, &selection.selected_credentials)?;
//! ```
//!
//! # Evaluation
//!
//! Every (input descriptor, credential) pair goes through a fixed sequence of
//! checks, each writing a row to an append-only [EvaluationLog]:
//!
//! 1. format and schema restrictions,
//! 2. field paths and filters, then the outcome of predicate fields,
//! 3. the `limit_disclosure`, `subject_is_issuer` and `is_holder` constraints
//!    and the configured issuer DID methods,
//! 4. eligibility for submission.
//!
//! Submission requirements are then resolved against the eligible pairs. The
//! outcome has a [Status]: `info` when the definition is satisfied, `warn` when
//! it is satisfied at the cost of a preferred constraint or a `pick` bound, and
//! `error` when it cannot be satisfied.
//!
//! The checks live in the [`evaluation::handlers`] module, requirement
//! resolution in [`evaluation::resolver`].
//!
//! [EvaluationLog]: crate::evaluation::EvaluationLog
//! [Status]: crate::evaluation::Status
//! [`evaluation::handlers`]: crate::evaluation::handlers
//! [`evaluation::resolver`]: crate::evaluation::resolver
//!
//! # Credential Formats
//!
//! Credentials are wrapped per format family:
//! - **LDP VC** (`ldp_vc`): W3C Verifiable Credentials with Linked Data Proofs
//! - **JWT VC** (`jwt_vc_json`): W3C Verifiable Credentials secured with JWT
//! - **SD-JWT** (`vc+sd-jwt`, `dc+sd-jwt`): salted, per-claim disclosures
//! - **mso_mdoc** (`mso_mdoc`): ISO/IEC 18013-5 mobile documents
//!
//! Format identifiers are defined in the [`core::credential_format`] module.
//!
//! [`core::credential_format`]: crate::core::credential_format

pub mod config;
pub mod core;
pub mod error;
pub mod evaluation;
pub mod utils;

pub use error::EvaluationError;
pub use evaluation::{EvaluationResult, Evaluator, SelectResult};
pub use serde_json_path::JsonPath;
