pub mod myid_client;
pub mod otp;

pub use myid_client::{HttpMyIdClient, IdentityProvider, SimulatedMyId, build_identity_provider};
pub use otp::{OtpCheck, check_otp, generate_otp};
