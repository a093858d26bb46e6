use rand::Rng;
use rand::distr::Alphanumeric;

const ID_SUFFIX_LEN: usize = 24;

fn random_suffix() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(ID_SUFFIX_LEN)
        .map(char::from)
        .collect()
}

pub fn new_response_id() -> String {
    format!("resp_{}", random_suffix())
}

pub fn new_item_id() -> String {
    format!("item_{}", random_suffix())
}

/// Checks `^(resp|item)_[A-Za-z0-9]{24}$` without pulling in a regex crate.
pub fn is_well_formed_id(id: &str, prefix: &str) -> bool {
    let Some(suffix) = id.strip_prefix(prefix) else {
        return false;
    };
    suffix.len() == ID_SUFFIX_LEN && suffix.chars().all(|c| c.is_ascii_alphanumeric())
}

pub fn is_response_id(id: &str) -> bool {
    is_well_formed_id(id, "resp_")
}

pub fn is_item_id(id: &str) -> bool {
    is_well_formed_id(id, "item_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_ids_are_well_formed() {
        for _ in 0..100 {
            let id = new_response_id();
            assert!(id.starts_with("resp_"));
            assert!(is_response_id(&id), "{id} did not validate");
        }
    }

    #[test]
    fn item_ids_are_well_formed() {
        for _ in 0..100 {
            let id = new_item_id();
            assert!(id.starts_with("item_"));
            assert!(is_item_id(&id), "{id} did not validate");
        }
    }

    #[test]
    fn rejects_wrong_prefix_and_length() {
        assert!(!is_response_id("item_abcdefghijklmnopqrstuvwx"));
        assert!(!is_response_id("resp_short"));
        assert!(!is_response_id("resp_abcdefghijklmnopqrstuv-x"));
    }
}
