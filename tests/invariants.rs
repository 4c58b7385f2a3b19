//! Property-based tests for announce protocol invariants.
//!
//! Properties tested:
//! 1. Round-trip: every wire record decodes back to itself.
//! 2. Strictness: decoders reject trailing garbage.
//! 3. Monotonicity: the cached timestamp per validator never decreases.
//! 4. Prune completeness: after a prune, cache keys are a subset of the
//!    retained set.
//! 5. Recipient-set hashing is order independent.
//! 6. Signed envelopes authenticate: decode recovers the signing address.

use {
    proptest::prelude::*,
    std::collections::HashSet,
    validator_announce::{
        message::{
            decode_address_list, decode_version_list, encode_address_list, encode_version_list,
        },
        Admission, AnnounceCache, AnnounceVersion, Address, EcdsaSigner, EncryptedEnode, Hash,
        Message, Signer, ValEncryptedEnodes, dest_addresses_hash,
    },
};

// ── Strategies ──────────────────────────────────────────────────────────────

fn arb_address() -> impl Strategy<Value = Address> {
    proptest::collection::vec(any::<u8>(), 20).prop_map(|bytes| {
        let mut out = [0u8; 20];
        out.copy_from_slice(&bytes);
        Address::from_bytes(out)
    })
}

fn arb_hash() -> impl Strategy<Value = Hash> {
    proptest::collection::vec(any::<u8>(), 32).prop_map(|bytes| {
        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes);
        Hash::from_bytes(out)
    })
}

fn arb_encrypted_enode() -> impl Strategy<Value = EncryptedEnode> {
    (arb_address(), proptest::collection::vec(any::<u8>(), 0..64)).prop_map(
        |(decrypter_address, encrypted_enode_url)| EncryptedEnode {
            decrypter_address,
            encrypted_enode_url,
        },
    )
}

fn arb_record() -> impl Strategy<Value = ValEncryptedEnodes> {
    (
        arb_address(),
        proptest::collection::vec(arb_encrypted_enode(), 0..8),
        arb_hash(),
        any::<u64>(),
    )
        .prop_map(
            |(val_address, encrypted_enodes, enode_url_hash, timestamp)| ValEncryptedEnodes {
                val_address,
                encrypted_enodes,
                enode_url_hash,
                timestamp,
            },
        )
}

// ── Properties ──────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn prop_val_encrypted_enodes_roundtrip(record in arb_record()) {
        let bytes = record.to_rlp();
        prop_assert_eq!(ValEncryptedEnodes::from_rlp(&bytes).unwrap(), record);
    }

    #[test]
    fn prop_version_list_roundtrip(
        raw in proptest::collection::vec((arb_address(), any::<u64>()), 0..32),
    ) {
        let versions: Vec<AnnounceVersion> = raw
            .into_iter()
            .map(|(val_address, timestamp)| AnnounceVersion { val_address, timestamp })
            .collect();
        let bytes = encode_version_list(&versions);
        prop_assert_eq!(decode_version_list(&bytes).unwrap(), versions);
    }

    #[test]
    fn prop_address_list_roundtrip(addresses in proptest::collection::vec(arb_address(), 0..32)) {
        let bytes = encode_address_list(&addresses);
        prop_assert_eq!(decode_address_list(&bytes).unwrap(), addresses);
    }

    #[test]
    fn prop_decoders_reject_trailing_garbage(
        record in arb_record(),
        suffix in proptest::collection::vec(any::<u8>(), 1..8),
    ) {
        let mut bytes = record.to_rlp();
        bytes.extend_from_slice(&suffix);
        prop_assert!(ValEncryptedEnodes::from_rlp(&bytes).is_err());
    }

    #[test]
    fn prop_cache_timestamp_monotonic(
        admissions in proptest::collection::vec((any::<u64>(), any::<u8>()), 1..64),
    ) {
        let cache = AnnounceCache::new();
        let address = Address::from_bytes([1u8; 20]);
        let mut highest: Option<u64> = None;

        for (timestamp, byte) in admissions {
            let outcome = cache.admit(address, timestamp, vec![byte]);
            match highest {
                Some(h) if timestamp <= h => {
                    prop_assert_eq!(outcome, Admission::RejectedStale);
                }
                _ => {
                    prop_assert_eq!(outcome, Admission::Inserted);
                    highest = Some(timestamp);
                }
            }
            prop_assert_eq!(cache.version(&address), highest);
        }
    }

    #[test]
    fn prop_prune_leaves_subset(
        entries in proptest::collection::vec((arb_address(), any::<u64>()), 0..32),
        valid in proptest::collection::hash_set(arb_address(), 0..16),
    ) {
        let cache = AnnounceCache::new();
        for (address, timestamp) in &entries {
            cache.admit(*address, *timestamp, Vec::new());
        }

        let valid: HashSet<Address> = valid.into_iter().collect();
        cache.prune_not_in(&valid);

        for version in cache.snapshot() {
            prop_assert!(valid.contains(&version.val_address));
        }
    }

    #[test]
    fn prop_dest_hash_order_independent(addresses in proptest::collection::vec(arb_address(), 0..16)) {
        let mut reversed = addresses.clone();
        reversed.reverse();
        prop_assert_eq!(dest_addresses_hash(&addresses), dest_addresses_hash(&reversed));

        let mut sorted = addresses.clone();
        sorted.sort();
        prop_assert_eq!(dest_addresses_hash(&addresses), dest_addresses_hash(&sorted));
    }

    #[test]
    fn prop_envelope_roundtrip_authenticates(
        msg in proptest::collection::vec(any::<u8>(), 0..256),
        code in any::<u64>(),
    ) {
        let signer = EcdsaSigner::from_secret_bytes(&[7u8; 32]).unwrap();
        let mut message = Message::new(code, msg, signer.address());
        message.sign(&signer).unwrap();

        let decoded = Message::from_payload(&message.payload()).unwrap();
        prop_assert_eq!(decoded.address, signer.address());
        prop_assert_eq!(decoded, message);
    }
}
