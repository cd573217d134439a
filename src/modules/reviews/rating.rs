use serde::{Serialize, Serializer};

/// Average of a book's ratings, or `Unrated` when nobody has rated it.
///
/// Serializes as a number or `null` so clients can tell "unrated" apart from
/// any real average.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rating {
    Average(f64),
    Unrated,
}

impl Rating {
    pub fn value(self) -> Option<f64> {
        match self {
            Rating::Average(avg) => Some(avg),
            Rating::Unrated => None,
        }
    }
}

impl Serialize for Rating {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Rating::Average(avg) => serializer.serialize_some(avg),
            Rating::Unrated => serializer.serialize_none(),
        }
    }
}

/// Arithmetic mean of `ratings`.
pub fn average_rating(ratings: &[u8]) -> Rating {
    if ratings.is_empty() {
        return Rating::Unrated;
    }
    let total: u64 = ratings.iter().map(|&r| u64::from(r)).sum();
    Rating::Average(total as f64 / ratings.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_unrated() {
        assert_eq!(average_rating(&[]), Rating::Unrated);
    }

    #[test]
    fn single_rating_is_its_own_average() {
        assert_eq!(average_rating(&[5]), Rating::Average(5.0));
    }

    #[test]
    fn mean_of_full_range() {
        assert_eq!(average_rating(&[1, 2, 3, 4, 5]), Rating::Average(3.0));
        assert_eq!(average_rating(&[4, 5]), Rating::Average(4.5));
    }

    #[test]
    fn serializes_to_number_or_null() {
        assert_eq!(serde_json::to_string(&Rating::Average(4.5)).unwrap(), "4.5");
        assert_eq!(serde_json::to_string(&Rating::Unrated).unwrap(), "null");
    }
}
