//! # Filename Derivation
//!
//! Every generated filename and `Content-Disposition` value derives from a
//! user-supplied string through [`sanitize_name`]. The kept character set
//! is alphanumerics (Unicode), space, `-` and `_`, plus combining marks
//! attached to a kept letter (Tamil and Devanagari viramas, vowel signs).
//! Whitespace runs then collapse to a single `_` so the result is safe as a
//! path segment and inside a quoted header parameter.

/// Prefix of every generated certificate filename.
pub const CERTIFICATE_FILE_PREFIX: &str = "NEHRU_MLA_";

/// Fallback stem when sanitization leaves nothing.
const EMPTY_NAME_FALLBACK: &str = "member";

/// Reduce a display name to a filename-safe stem.
///
/// ```
/// assert_eq!(mcard_core::sanitize_name("Asha Rao"), "Asha_Rao");
/// assert_eq!(mcard_core::sanitize_name("  O'Neil / Jr. "), "ONeil_Jr");
/// assert_eq!(mcard_core::sanitize_name("???"), "member");
/// assert_eq!(mcard_core::sanitize_name("ஆஷா ராவ்"), "ஆஷா_ராவ்");
/// ```
pub fn sanitize_name(name: &str) -> String {
    let mut kept = String::with_capacity(name.len());
    let mut after_letter = false;
    for c in name.chars() {
        let keep = if is_combining_mark(c) {
            after_letter
        } else {
            after_letter = c.is_alphanumeric();
            after_letter || matches!(c, ' ' | '-' | '_')
        };
        if keep {
            kept.push(c);
        }
    }
    let joined = kept.split_whitespace().collect::<Vec<_>>().join("_");
    if joined.is_empty() {
        EMPTY_NAME_FALLBACK.to_string()
    } else {
        joined
    }
}

/// Whether `c` has General_Category Mark (`Mn`, `Mc` or `Me`).
pub fn is_combining_mark(c: char) -> bool {
    unicode_normalization::char::is_combining_mark(c)
}

/// Certificate filename for a display name, using the default prefix.
pub fn certificate_filename(name: &str) -> String {
    certificate_filename_with_prefix(CERTIFICATE_FILE_PREFIX, name)
}

/// Certificate filename for a display name with an explicit prefix.
pub fn certificate_filename_with_prefix(prefix: &str, name: &str) -> String {
    format!("{prefix}{}.pdf", sanitize_name(name))
}

/// Safe filename for an uploaded photo.
///
/// The stem is sanitized like a display name; the extension is kept only
/// if it is short and alphanumeric, and lowercased.
pub fn photo_filename(original: &str) -> String {
    // Browsers on Windows may send a full path.
    let base = original.rsplit(['/', '\\']).next().unwrap_or(original);
    match base.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && !ext.is_empty()
                && ext.len() <= 5
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            format!("{}.{}", sanitize_name(stem), ext.to_ascii_lowercase())
        }
        _ => sanitize_name(base),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn keeps_alnum_space_dash_underscore() {
        assert_eq!(sanitize_name("Ravi-Kumar_2"), "Ravi-Kumar_2");
    }

    #[test]
    fn collapses_whitespace_runs() {
        assert_eq!(sanitize_name("  Asha    Rao  "), "Asha_Rao");
    }

    #[test]
    fn strips_path_and_quote_characters() {
        assert_eq!(sanitize_name("../etc/\"passwd\""), "etcpasswd");
    }

    #[test]
    fn keeps_non_ascii_letters() {
        assert_eq!(sanitize_name("José Ñandú"), "José_Ñandú");
    }

    #[test]
    fn keeps_marks_on_indic_letters() {
        assert_eq!(sanitize_name("ஆஷா ராவ்"), "ஆஷா_ராவ்");
        assert_eq!(sanitize_name("प्रिया शर्मा"), "प्रिया_शर्मा");
    }

    #[test]
    fn drops_marks_without_a_base() {
        // A virama after a dropped character or at the start has nothing to attach to.
        assert_eq!(sanitize_name("\u{0BCD}ராவ்"), "ராவ்");
        assert_eq!(sanitize_name("x/\u{0301}y"), "xy");
        assert_eq!(sanitize_name("a \u{0301}b"), "a_b");
    }

    #[test]
    fn empty_result_falls_back() {
        assert_eq!(sanitize_name(""), "member");
        assert_eq!(sanitize_name("!!!"), "member");
    }

    #[test]
    fn certificate_filename_matches_expected_shape() {
        assert_eq!(certificate_filename("Asha Rao"), "NEHRU_MLA_Asha_Rao.pdf");
    }

    #[test]
    fn photo_filename_keeps_simple_extension() {
        assert_eq!(photo_filename("My Photo.JPG"), "My_Photo.jpg");
        assert_eq!(photo_filename("C:\\Users\\x\\face.png"), "face.png");
    }

    #[test]
    fn photo_filename_without_extension() {
        assert_eq!(photo_filename("selfie"), "selfie");
        assert_eq!(photo_filename(".hidden"), "hidden");
    }

    proptest! {
        #[test]
        fn sanitized_output_is_always_safe(input in ".*") {
            let out = sanitize_name(&input);
            prop_assert!(!out.is_empty());
            prop_assert!(out
                .chars()
                .all(|c| c.is_alphanumeric() || is_combining_mark(c) || c == '-' || c == '_'));
            prop_assert!(!out.starts_with(is_combining_mark));
        }

        #[test]
        fn sanitize_is_idempotent(input in ".*") {
            let once = sanitize_name(&input);
            prop_assert_eq!(sanitize_name(&once), once.clone());
        }
    }
}
