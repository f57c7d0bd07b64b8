pub mod password;

pub use password::{Argon2Encoder, PasswordEncoder, PasswordHashString, PasswordMaterial};
