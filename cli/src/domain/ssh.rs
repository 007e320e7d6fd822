//! Login keys that testnode installs on nodes it launches itself.

use crate::domain::error::ConfigError;

/// Key types accepted in `authorized_keys` lines we write.
pub const PUBLIC_KEY_TYPES: &[&str] = &[
    "ssh-ed25519",
    "ssh-rsa",
    "ecdsa-sha2-nistp256",
    "ecdsa-sha2-nistp384",
    "ecdsa-sha2-nistp521",
];

/// Reduce an OpenSSH public key line to `<type> <base64>`.
///
/// The comment is dropped so that the result is safe inside single quotes.
///
/// # Errors
///
/// Returns `ConfigError::InvalidPublicKey` for an unknown key type or a body
/// that is not base64.
pub fn normalize_public_key(line: &str) -> Result<String, ConfigError> {
    let mut fields = line.split_whitespace();
    let (Some(kind), Some(body)) = (fields.next(), fields.next()) else {
        return Err(ConfigError::InvalidPublicKey(
            "expected '<type> <base64> [comment]'".to_string(),
        ));
    };
    if !PUBLIC_KEY_TYPES.contains(&kind) {
        return Err(ConfigError::InvalidPublicKey(format!(
            "unsupported key type '{kind}'"
        )));
    }
    if !body
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "+/=".contains(c))
    {
        return Err(ConfigError::InvalidPublicKey(
            "key body is not base64".to_string(),
        ));
    }
    Ok(format!("{kind} {body}"))
}

/// Shell script appending `key` to the invoking user's `authorized_keys`
/// unless it is already there.
///
/// `key` must come from [`normalize_public_key`].
#[must_use]
pub fn authorize_key_script(key: &str) -> String {
    format!(
        "umask 077 && mkdir -p ~/.ssh && \
         {{ grep -qxF '{key}' ~/.ssh/authorized_keys 2>/dev/null || \
         printf '%s\\n' '{key}' >> ~/.ssh/authorized_keys; }}"
    )
}
