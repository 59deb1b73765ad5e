use std::collections::HashSet;

use uuid::Uuid;

pub const ID_LENGTH: usize = 10;

/// Short random identifier that does not collide with any of `existing`.
pub fn generate_id<'a>(existing: impl IntoIterator<Item = &'a str>) -> String {
    let taken = existing.into_iter().collect::<HashSet<_>>();

    loop {
        let mut id = Uuid::new_v4().simple().to_string();
        id.truncate(ID_LENGTH);

        if !taken.contains(id.as_str()) {
            return id;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_short_and_fresh() {
        let existing = (0..200).map(|_| generate_id(std::iter::empty())).collect::<Vec<_>>();

        let id = generate_id(existing.iter().map(String::as_str));

        assert_eq!(id.len(), ID_LENGTH);
        assert!(!existing.contains(&id));
    }
}
