//! Derivation of crypt(3) style password hashes for shadow entries.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use rand::Rng;

use crate::error::{Error, Result};

/// Characters allowed in a crypt salt.
const CRYPT_ALPHABET: &[u8] = b"./0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
/// SHA-crypt only looks at the first 16 salt characters.
const SALT_LEN: usize = 16;
pub const MIN_ROUNDS: u32 = 1000;
pub const MAX_ROUNDS: u32 = 999_999_999;

/// Turns a plaintext password into a value for the second field of a
/// shadow record.
pub trait PasswordHasher: Send + Sync {
    /// Hash `password`.  With `salt` set the result is deterministic;
    /// otherwise a fresh random salt is used for every call.
    ///
    /// The result must not contain `:` or control characters; callers
    /// reject hashes that do.
    fn derive(&self, password: &str, salt: Option<&str>) -> Result<String>;
}

/// SHA-512 based crypt (`$6$`), the default on current Linux distributions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sha512Crypt {
    rounds: Option<u32>,
}

impl Sha512Crypt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a non-default number of rounds; the scheme default is 5000.
    pub fn with_rounds(rounds: u32) -> Result<Self> {
        if !(MIN_ROUNDS..=MAX_ROUNDS).contains(&rounds) {
            return Err(Error::HashingFailure(format!(
                "rounds must be between {MIN_ROUNDS} and {MAX_ROUNDS}, not {rounds}"
            )));
        }
        Ok(Self {
            rounds: Some(rounds),
        })
    }

    pub fn rounds(&self) -> Option<u32> {
        self.rounds
    }

    fn setting(&self, salt: &str) -> String {
        match self.rounds {
            Some(rounds) => format!("$6$rounds={rounds}${salt}"),
            None => format!("$6${salt}"),
        }
    }
}

fn random_salt() -> String {
    let mut rng = rand::rng();
    (0..SALT_LEN)
        .map(|_| CRYPT_ALPHABET[rng.random_range(0..CRYPT_ALPHABET.len())] as char)
        .collect()
}

fn validate_salt(salt: &str) -> Result<()> {
    if salt.is_empty() || salt.len() > SALT_LEN {
        return Err(Error::HashingFailure(format!(
            "salt must be 1 to {SALT_LEN} characters long"
        )));
    }
    if let Some(c) = salt.bytes().find(|c| !CRYPT_ALPHABET.contains(c)) {
        return Err(Error::HashingFailure(format!(
            "invalid character {:?} in salt",
            c as char
        )));
    }
    Ok(())
}

/// Ensure a hash can be embedded as a single field of a colon-delimited line.
pub(crate) fn check_shadow_safe(hash: &str) -> Result<()> {
    if hash.is_empty() {
        return Err(Error::HashingFailure("derived hash is empty".into()));
    }
    if let Some(c) = hash.chars().find(|&c| c == ':' || c.is_control()) {
        return Err(Error::HashingFailure(format!(
            "derived hash contains invalid character {c:?}"
        )));
    }
    Ok(())
}

impl PasswordHasher for Sha512Crypt {
    fn derive(&self, password: &str, salt: Option<&str>) -> Result<String> {
        let salt = match salt {
            Some(salt) => {
                validate_salt(salt)?;
                salt.to_string()
            }
            None => random_salt(),
        };
        let hash = pwhash::sha512_crypt::hash_with(self.setting(&salt).as_str(), password)
            .map_err(|e| Error::HashingFailure(e.to_string()))?;
        check_shadow_safe(&hash)?;
        Ok(hash)
    }
}

/// Hash `password` with the default scheme, yielding the value for the
/// password field of a shadow line.
pub fn make_shadow_line(password: &str, salt: Option<&str>) -> Result<String> {
    Sha512Crypt::new().derive(password, salt)
}

/// Check `password` against a crypt hash of any scheme the system supports.
pub fn verify(password: &str, hash: &str) -> bool {
    pwhash::unix::verify(password, hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vector() {
        // Test vector published with the SHA-crypt scheme.
        let h = make_shadow_line("Hello world!", Some("saltstring")).unwrap();
        similar_asserts::assert_eq!(
            h,
            "$6$saltstring$svn8UoSVapNtMuq1ukKS4tPQd8iKwSMHWjl/O817G3uBnIFNjnQJuesI68u4OTLiBFdcbYEdFCoEOfaS35inz1"
        );
    }

    #[test]
    fn test_fixed_salt_is_deterministic() {
        let c = Sha512Crypt::new();
        let a = c.derive("hunter2", Some("abcdefgh")).unwrap();
        let b = c.derive("hunter2", Some("abcdefgh")).unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with("$6$abcdefgh$"));
        assert!(pwhash::sha512_crypt::verify("hunter2", &a));
    }

    #[test]
    fn test_random_salt() {
        let c = Sha512Crypt::new();
        let a = c.derive("hunter2", None).unwrap();
        let b = c.derive("hunter2", None).unwrap();
        assert_ne!(a, b);
        for h in [&a, &b] {
            let parts: Vec<_> = h.split('$').collect();
            assert_eq!(parts.len(), 4, "{h}");
            assert_eq!(parts[1], "6");
            assert_eq!(parts[2].len(), SALT_LEN);
            assert!(pwhash::sha512_crypt::verify("hunter2", h));
        }
    }

    #[test]
    fn test_rounds() {
        let c = Sha512Crypt::with_rounds(10_000).unwrap();
        let h = c.derive("hunter2", Some("saltstring")).unwrap();
        assert!(h.starts_with("$6$rounds=10000$saltstring$"), "{h}");
        assert!(pwhash::sha512_crypt::verify("hunter2", &h));
        assert!(Sha512Crypt::with_rounds(10).is_err());
        assert!(Sha512Crypt::with_rounds(MAX_ROUNDS + 1).is_err());
    }

    #[test]
    fn test_password_metacharacters() {
        for pw in ["it's", "a:b", "new\nline", "$(reboot)", "\\"] {
            let h = make_shadow_line(pw, None).unwrap();
            check_shadow_safe(&h).unwrap();
            assert!(!h.contains('\''));
            assert!(verify(pw, &h));
            assert!(!verify("wrong", &h));
        }
    }

    #[test]
    fn test_invalid_salt() {
        for salt in ["", "has:colon", "has$dollar", "abcdefghijklmnopq", "sp ace"] {
            assert!(
                matches!(make_shadow_line("x", Some(salt)), Err(Error::HashingFailure(_))),
                "{salt:?}"
            );
        }
    }

    #[test]
    fn test_check_shadow_safe() {
        check_shadow_safe("$6$a$b").unwrap();
        assert!(check_shadow_safe("").is_err());
        assert!(check_shadow_safe("$6$a:b").is_err());
        assert!(check_shadow_safe("$6$a\nb").is_err());
        // Backslash escapes are plain text here.
        check_shadow_safe("$6$a\\072b").unwrap();
        let e = check_shadow_safe("$6$a\rb").unwrap_err();
        assert_eq!(
            e.to_string(),
            "failed to hash password: derived hash contains invalid character '\\r'"
        );
    }
}
