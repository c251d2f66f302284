use chrono::Utc;

/// Current UTC timestamp, `YYYY-MM-DD HH:MM:SS` or with a 9-digit nanosecond suffix
pub fn get_timestamp(with_nanoseconds: bool) -> String {
    let now = Utc::now();
    if with_nanoseconds {
        now.format("%Y-%m-%d %H:%M:%S%.9f").to_string()
    } else {
        now.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_shapes() {
        let plain = get_timestamp(false);
        assert_eq!(plain.len(), "2025-01-01 00:00:00".len());
        assert!(!plain.contains('.'));

        let precise = get_timestamp(true);
        let (_, nanos) = precise.split_once('.').expect("fraction present");
        assert_eq!(nanos.len(), 9);
        assert!(nanos.chars().all(|c| c.is_ascii_digit()));
    }
}
