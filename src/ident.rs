use rand::Rng;
use std::collections::HashSet;

/// Characters the editor itself draws block and variable ids from.
pub const ID_ALPHABET: &[u8] =
    b"!#$%()*+,-./0123456789:;=?@ABCDEFGHIJKLMNOPQRSTUVWXYZ[]^_`abcdefghijklmnopqrstuvwxyz{|}~";
pub const ID_LENGTH: usize = 20;

/// Returns an id of `ID_LENGTH` characters that is not in `in_use`.
///
/// Candidates that collide are rejected and redrawn; the loop only ends on a
/// fresh id.
pub fn generate_id<R: Rng + ?Sized>(rng: &mut R, in_use: &HashSet<String>) -> String {
    loop {
        let candidate = random_id(rng);
        if !in_use.contains(&candidate) {
            return candidate;
        }
        tracing::debug!(id = %candidate, "rejected colliding id");
    }
}

fn random_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..ID_LENGTH)
        .map(|_| ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())] as char)
        .collect()
}
