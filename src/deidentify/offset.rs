//! Deterministic per-subject date offsets
//!
//! Every resource belonging to the same subject must move by the same number
//! of days so intervals between events survive de-identification. The offset
//! is derived from the secret salt and the subject reference alone, so no
//! lookup table has to be stored between runs.

use sha2::{Digest, Sha256};

/// Largest absolute offset, in days.
pub const MAX_OFFSET_DAYS: i64 = 90;

/// Number of distinct offsets in `[-MAX_OFFSET_DAYS, MAX_OFFSET_DAYS]`.
const OFFSET_BUCKETS: u32 = 2 * MAX_OFFSET_DAYS as u32 + 1;

/// Derive a signed day offset in `[-90, 90]` for `subject_id`.
///
/// `SHA-256(secret || subject_id)`, first four bytes read big-endian,
/// reduced modulo 181 and re-centred on zero.
///
/// Secret and subject id are concatenated without a separator, so the pairs
/// `("ab", "c")` and `("a", "bc")` share an offset.
///
/// # Examples
///
/// ```
/// use fhir_deid::deidentify::offset::derive_offset;
///
/// let offset = derive_offset("s3cr3t", "Patient/123");
/// assert!((-90..=90).contains(&offset));
/// assert_eq!(offset, derive_offset("s3cr3t", "Patient/123"));
/// ```
pub fn derive_offset(secret: &str, subject_id: &str) -> i64 {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(subject_id.as_bytes());
    let digest = hasher.finalize();

    let prefix = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    i64::from(prefix % OFFSET_BUCKETS) - MAX_OFFSET_DAYS
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake::{Fake, Faker};

    #[test]
    fn test_offset_is_deterministic() {
        let first = derive_offset("salt", "Patient/p1");
        let second = derive_offset("salt", "Patient/p1");
        assert_eq!(first, second);
    }

    #[test]
    fn test_offset_within_range_for_random_inputs() {
        for _ in 0..500 {
            let secret: String = Faker.fake();
            let subject: String = Faker.fake();
            let offset = derive_offset(&secret, &subject);
            assert!(
                (-MAX_OFFSET_DAYS..=MAX_OFFSET_DAYS).contains(&offset),
                "offset {offset} out of range"
            );
        }
    }

    #[test]
    fn test_offset_matches_digest_prefix() {
        let digest = Sha256::digest(b"saltPatient/p1");
        let prefix = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
        let expected = i64::from(prefix % 181) - 90;
        assert_eq!(derive_offset("salt", "Patient/p1"), expected);
    }

    #[test]
    fn test_unseparated_concatenation_collides() {
        assert_eq!(derive_offset("ab", "c"), derive_offset("a", "bc"));
    }

    #[test]
    fn test_empty_subject_still_yields_offset() {
        let offset = derive_offset("salt", "");
        assert!((-MAX_OFFSET_DAYS..=MAX_OFFSET_DAYS).contains(&offset));
    }

    #[test]
    fn test_offsets_vary_across_subjects() {
        let offsets: std::collections::HashSet<i64> = (0..50)
            .map(|i| derive_offset("salt", &format!("Patient/{i}")))
            .collect();
        assert!(offsets.len() > 1);
    }
}
