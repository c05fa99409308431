pub mod cleanup;
pub mod clock;
pub mod identifier;
pub mod rate_limit;
pub mod validate;
