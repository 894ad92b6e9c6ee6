pub mod accessor;
pub mod credential_format;
pub mod filter;
pub mod input_descriptor;
pub mod presentation_definition;
pub mod presentation_submission;
pub mod sd_jwt;
pub mod wrapped_credential;
