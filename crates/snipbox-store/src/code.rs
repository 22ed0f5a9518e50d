use rand::{Rng, distr::Alphanumeric};

/// Length of a generated clip code. Six alphanumeric characters give
/// 62^6 (~57 billion) combinations — collisions across a 24-hour active
/// keyspace are negligible, and creation retries on the off chance.
pub const CODE_LEN: usize = 6;

/// Generate a random case-sensitive alphanumeric code.
pub fn generate(len: usize) -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_requested_length() {
        assert_eq!(generate(CODE_LEN).len(), CODE_LEN);
        assert_eq!(generate(12).len(), 12);
    }

    #[test]
    fn generates_alphanumeric_only() {
        let code = generate(64);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
