//! Keyword sets used to locate field groups in signal messages.
//!
//! The alert channel posts in Russian; English equivalents are accepted too.

/// Literal keywords and unit names recognised by the extractor.
///
/// Keywords are matched case-sensitively as substrings. Units are compared
/// after lowercasing.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    /// Checked before `buying`: a message with both is a short
    pub selling: Vec<String>,
    pub buying: Vec<String>,
    /// Word preceding the number in an "every N seconds" phrase
    pub interval_prefixes: Vec<String>,
    /// Stem following the number in an "every N seconds" phrase
    pub second_units: Vec<String>,
    pub duration_anchors: Vec<String>,
    pub hour_units: Vec<String>,
    pub minute_units: Vec<String>,
}

fn owned(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            selling: owned(&["Продает", "selling", "Selling"]),
            buying: owned(&["Покупает", "buying", "Buying"]),
            interval_prefixes: owned(&["каждые", "every", "Every"]),
            second_units: owned(&["сек", "sec"]),
            duration_anchors: owned(&["Продолжительность", "Duration"]),
            hour_units: owned(&["часов", "часа", "час", "hour", "hours", "h", "hs"]),
            minute_units: owned(&["минут", "минуты", "минута", "minute", "minutes", "min", "mins"]),
        }
    }
}

impl Vocabulary {
    /// Minutes contributed by `number` of `unit`; unknown units add nothing
    pub fn unit_minutes(&self, number: u64, unit: &str) -> u64 {
        let unit = unit.to_lowercase();
        if self.hour_units.iter().any(|u| *u == unit) {
            number.saturating_mul(60)
        } else if self.minute_units.iter().any(|u| *u == unit) {
            number
        } else {
            0
        }
    }

    pub fn position_keywords(&self) -> impl Iterator<Item = &String> {
        self.selling.iter().chain(self.buying.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_minutes() {
        let vocab = Vocabulary::default();
        assert_eq!(vocab.unit_minutes(2, "hours"), 120);
        assert_eq!(vocab.unit_minutes(1, "H"), 60);
        assert_eq!(vocab.unit_minutes(3, "часов"), 180);
        assert_eq!(vocab.unit_minutes(30, "минут"), 30);
        assert_eq!(vocab.unit_minutes(10, "Minutes"), 10);
        assert_eq!(vocab.unit_minutes(5, "days"), 0);
    }
}
