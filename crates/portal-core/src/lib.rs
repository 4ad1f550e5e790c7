#![allow(clippy::pedantic)]
#![allow(clippy::nursery)]
#![deny(clippy::unwrap_used)]
#![allow(clippy::missing_errors_doc)]

pub mod identity;
pub mod models;

pub use crate::identity::*;
pub use crate::models::*;
