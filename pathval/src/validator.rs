//! RFC5280-compliant certification path validation

pub mod name_constraints_set;
pub mod path_certificate;
pub mod path_extension;
pub mod path_validator;
pub mod policy_tree;
pub mod validation_config;
pub mod validation_result;
pub mod validator_state;

pub use crate::{
    validator::name_constraints_set::*, validator::path_certificate::*,
    validator::path_extension::*, validator::path_validator::*, validator::policy_tree::*,
    validator::validation_config::*, validator::validation_result::*,
    validator::validator_state::*,
};
