//! Value Object Module

pub mod email;
pub mod session_id;
pub mod user_id;
pub mod user_role;
