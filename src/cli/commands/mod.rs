pub mod create_admin;
pub mod fetch_token;
pub mod set_claims;
