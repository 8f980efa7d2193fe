use rand::Rng;

/// Generates a random entity id of the form `<prefix>_<16 hex digits>`.
pub fn new_id(prefix: &str) -> String {
    let n: u64 = rand::thread_rng().gen();
    format!("{prefix}_{n:016x}")
}

/// Derives a human-friendly order number from the order id. The number is stable for a given id, but is not
/// guaranteed unique.
pub fn order_number_from_id(id: &str) -> i64 {
    let hex = id.rsplit('_').next().unwrap_or(id);
    match u64::from_str_radix(hex, 16) {
        Ok(n) => (n % 100_000_000) as i64 + 1_000,
        // Not one of ours. Fall back to a simple FNV-1a hash
        Err(_) => {
            let hash = id.bytes().fold(0xcbf29ce484222325u64, |h, b| (h ^ u64::from(b)).wrapping_mul(0x100000001b3));
            (hash % 100_000_000) as i64 + 1_000
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ids_and_numbers() {
        let id = new_id("ord");
        assert!(id.starts_with("ord_"));
        assert_eq!(id.len(), 20);
        assert_eq!(order_number_from_id(&id), order_number_from_id(&id));
        assert_eq!(order_number_from_id("ord_0000000000000001"), 1_001);
        assert!(order_number_from_id("legacy-order-42") >= 1_000);
    }
}
