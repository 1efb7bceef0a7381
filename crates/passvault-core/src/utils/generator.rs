//! Random password generation for the add and edit forms.

use rand::Rng;

pub const DEFAULT_PASSWORD_LENGTH: usize = 16;

const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*";

/// Generate a password of `length` characters drawn uniformly from letters,
/// digits and `!@#$%^&*` using the thread-local CSPRNG.
pub fn generate_password(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}
