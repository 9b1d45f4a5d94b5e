use std::ops::RangeInclusive;

use crate::{EmailMessage, SenderOptions, SpamClassifier};

/// Code point ranges of the CJK unified ideograph blocks matched in
/// subjects: the base block, extension A, the unified ideographs scattered
/// in the compatibility block and extensions B, C and D.
pub const CJK_IDEOGRAPH_RANGES: [RangeInclusive<u32>; 12] = [
    0x4E00..=0x9FCC,
    0x3400..=0x4DB5,
    0xFA0E..=0xFA0F,
    0xFA11..=0xFA11,
    0xFA13..=0xFA14,
    0xFA1F..=0xFA1F,
    0xFA21..=0xFA21,
    0xFA23..=0xFA24,
    0xFA27..=0xFA29,
    0x20000..=0x2A6D6,
    0x2A700..=0x2B734,
    0x2B740..=0x2B81D,
];

/// Returns whether the character is a CJK unified ideograph.
pub fn is_cjk_ideograph(c: char) -> bool {
    let code = u32::from(c);
    CJK_IDEOGRAPH_RANGES
        .iter()
        .any(|range| range.contains(&code))
}

/// Returns whether the text contains at least one CJK unified ideograph.
pub fn contains_cjk_ideograph(text: &str) -> bool {
    text.chars().any(is_cjk_ideograph)
}

/// Classifier that flags messages whose subject contains CJK ideographs.
///
/// Messages without a subject are never flagged.
#[derive(Debug, Default)]
pub struct CjkSubjectClassifier;

impl CjkSubjectClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl SpamClassifier for CjkSubjectClassifier {
    fn is_spam(&self, message: &EmailMessage, _options: Option<&SenderOptions>) -> bool {
        message.subject().is_some_and(contains_cjk_ideograph)
    }

    fn name(&self) -> &str {
        "cjk_subject"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chinese_subject_is_spam() {
        let message = EmailMessage::from_raw("Subject: 你好\n\nBody");
        assert!(CjkSubjectClassifier::new().is_spam(&message, None));
    }

    #[test]
    fn test_mixed_subject_is_spam() {
        let message = EmailMessage::from_raw("Subject: Great offer 优惠 today\n\nBody");
        assert!(CjkSubjectClassifier::new().is_spam(&message, None));
    }

    #[test]
    fn test_latin_subject_is_not_spam() {
        let message = EmailMessage::from_raw("Subject: Hello\n\nBody");
        assert!(!CjkSubjectClassifier::new().is_spam(&message, None));
    }

    #[test]
    fn test_missing_subject_is_not_spam() {
        let message = EmailMessage::from_raw("From: a@example.com\n\n你好");
        assert!(!CjkSubjectClassifier::new().is_spam(&message, None));
    }

    #[test]
    fn test_kana_and_hangul_are_not_ideographs() {
        assert!(!contains_cjk_ideograph("こんにちは"));
        assert!(!contains_cjk_ideograph("안녕하세요"));
    }

    #[test]
    fn test_range_edges() {
        assert!(is_cjk_ideograph('\u{4E00}'));
        assert!(is_cjk_ideograph('\u{9FCC}'));
        assert!(!is_cjk_ideograph('\u{9FCD}'));
        assert!(is_cjk_ideograph('\u{3400}'));
        assert!(!is_cjk_ideograph('\u{4DB6}'));
    }

    #[test]
    fn test_compatibility_ideographs() {
        assert!(is_cjk_ideograph('\u{FA0E}'));
        assert!(is_cjk_ideograph('\u{FA29}'));
        assert!(!is_cjk_ideograph('\u{FA10}'));
        assert!(!is_cjk_ideograph('\u{FA12}'));
        assert!(!is_cjk_ideograph('\u{FA2A}'));
    }

    #[test]
    fn test_supplementary_plane_ideographs() {
        assert!(is_cjk_ideograph('\u{20000}'));
        assert!(is_cjk_ideograph('\u{2A6D6}'));
        assert!(!is_cjk_ideograph('\u{2A6D7}'));
        assert!(!is_cjk_ideograph('\u{2A6FF}'));
        assert!(is_cjk_ideograph('\u{2A700}'));
        assert!(is_cjk_ideograph('\u{2B734}'));
        assert!(!is_cjk_ideograph('\u{2B735}'));
        assert!(is_cjk_ideograph('\u{2B740}'));
        assert!(is_cjk_ideograph('\u{2B81D}'));
        assert!(!is_cjk_ideograph('\u{2B81E}'));
    }
}
