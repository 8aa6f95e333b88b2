use chrono::Utc;
use uuid::Uuid;

const SUFFIX_LEN: usize = 9;

/// Generate an entity id of the form `<prefix>-<millis base36>-<random>`.
///
/// The time component keeps ids roughly sortable by creation, the random
/// suffix makes collisions within one session practically impossible. Not
/// suitable for anything security related.
pub fn generate_id(prefix: &str) -> String {
    let millis = u64::try_from(now_millis()).unwrap_or_default();
    let random = Uuid::new_v4().simple().to_string();
    format!("{}-{}-{}", prefix, to_base36(millis), &random[..SUFFIX_LEN])
}

/// Current wall clock time in epoch milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    if value == 0 {
        return "0".to_string();
    }

    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
