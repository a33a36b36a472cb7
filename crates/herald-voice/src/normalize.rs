//! ASCII transliteration for the Turkish letters the speech endpoint
//! cannot pronounce.

/// Replaces `ğ ç ş ı ö ü` with their ASCII spellings.
///
/// Every other character is passed through unchanged.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            'ğ' => out.push('g'),
            'ç' => out.push_str("ch"),
            'ş' => out.push_str("sh"),
            'ı' => out.push('i'),
            'ö' => out.push('o'),
            'ü' => out.push('u'),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transliterates_all_six_letters() {
        assert_eq!(normalize("ğçşıöü"), "gchshiou");
    }

    #[test]
    fn welcome_sentence() {
        assert_eq!(
            normalize("ayşe hoşgeldin sunucumuza lütfen kayıt yetkililerini bekle"),
            "ayshe hoshgeldin sunucumuza lutfen kayit yetkililerini bekle"
        );
    }

    #[test]
    fn leaves_other_text_alone() {
        assert_eq!(normalize("Hello, World 123!"), "Hello, World 123!");
        assert_eq!(normalize(""), "");
        // Uppercase forms are outside the replacement set.
        assert_eq!(normalize("ŞÇ"), "ŞÇ");
    }
}
