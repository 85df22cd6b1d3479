// Property tests for account ID validation

use blockchain::strkey::{encode_account_id, encode_secret_seed, is_valid_account_id};
use proptest::prelude::*;

const BASE32: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Changing any single character of a valid account ID invalidates it
    #[test]
    fn prop_single_character_change_detected(
        key in any::<[u8; 32]>(),
        position in 0usize..56,
        replacement in 0usize..32,
    ) {
        let account_id = encode_account_id(&key);
        prop_assert!(is_valid_account_id(&account_id));

        let mut mutated = account_id.clone().into_bytes();
        prop_assume!(mutated[position] != BASE32[replacement]);
        mutated[position] = BASE32[replacement];
        let mutated = String::from_utf8(mutated).unwrap();

        prop_assert!(!is_valid_account_id(&mutated));
    }

    /// A secret seed is never accepted as an account ID
    #[test]
    fn prop_seed_is_not_an_account_id(seed in any::<[u8; 32]>()) {
        prop_assert!(!is_valid_account_id(&encode_secret_seed(&seed)));
    }
}
