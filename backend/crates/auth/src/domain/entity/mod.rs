//! Entity Module

pub mod session_record;
