/// System smart contracts carry this marker in the middle of their bech32
/// representation (a run of zero bytes in the public key)
pub const CONTRACT_ADDRESS_MARKER: &str = "qqqqqqqqqpqqqqqqqqqqqqqqqqqqqqqq";

pub fn is_smart_contract(address: &str) -> bool {
    address.contains(CONTRACT_ADDRESS_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_addresses_are_detected() {
        assert!(is_smart_contract(
            "erd1qqqqqqqqqqqqqqqpqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqylllslmq6y6"
        ));
        assert!(!is_smart_contract(
            "erd1ar4jhs0vg8c2qhnv03nmkgkfjrhkn4nrjfcw9d2caujzzgac2rtqzra6ar"
        ));
    }
}
