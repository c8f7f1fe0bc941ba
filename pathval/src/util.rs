//! Basic utility functionality supporting certification path validation

pub mod crypto;
pub mod error;
pub mod pdv_utilities;
pub mod time_of_interest;

pub use crate::{
    util::crypto::*, util::error::*, util::pdv_utilities::*, util::time_of_interest::*,
};
