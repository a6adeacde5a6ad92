//! URL slugs for products and content pages.

use core::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Errors that can occur when parsing a [`Slug`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SlugError {
    /// The input is empty.
    #[error("slug cannot be empty")]
    Empty,
    /// The input is longer than [`Slug::MAX_LENGTH`].
    #[error("slug must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains something other than `a-z`, `0-9` and single dashes.
    #[error("slug may only contain lowercase latin letters, digits and single dashes")]
    InvalidCharacters,
}

/// A URL-safe identifier: lowercase latin letters and digits separated by
/// single dashes.
///
/// ```
/// use nexx_core::Slug;
///
/// let slug = Slug::from_title("Масляный фильтр JCB 02/100284");
/// assert_eq!(slug.as_str(), "maslyanyj-filtr-jcb-02-100284");
/// ```
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    /// Maximum slug length.
    pub const MAX_LENGTH: usize = 200;

    /// Validate an explicit slug.
    ///
    /// # Errors
    ///
    /// Returns a [`SlugError`] when the input is empty, too long, or not in
    /// canonical form.
    pub fn parse(s: &str) -> Result<Self, SlugError> {
        if s.is_empty() {
            return Err(SlugError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(SlugError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        let canonical = s
            .split('-')
            .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()));
        if !canonical {
            return Err(SlugError::InvalidCharacters);
        }
        Ok(Self(s.to_owned()))
    }

    /// Build a slug from free text, transliterating Cyrillic.
    ///
    /// Falls back to `item` when the title contains nothing usable.
    #[must_use]
    pub fn from_title(title: &str) -> Self {
        let mut out = String::with_capacity(title.len());
        let mut pending_dash = false;

        let mut buf = [0_u8; 4];
        for ch in title.chars().flat_map(char::to_lowercase) {
            let latin: Option<&str> = if ch.is_ascii_alphanumeric() {
                Some(ch.encode_utf8(&mut buf))
            } else {
                transliterate(ch)
            };

            match latin {
                // soft and hard signs vanish without splitting the word
                Some("") => {}
                Some(latin) => {
                    if pending_dash && !out.is_empty() {
                        out.push('-');
                    }
                    pending_dash = false;
                    out.push_str(latin);
                }
                None => pending_dash = true,
            }
        }

        out.truncate(Self::MAX_LENGTH);
        while out.ends_with('-') {
            out.pop();
        }
        if out.is_empty() {
            out.push_str("item");
        }
        Self(out)
    }

    /// Append a numeric suffix, used to make generated slugs unique.
    #[must_use]
    pub fn with_suffix(&self, n: usize) -> Self {
        Self(format!("{}-{n}", self.0))
    }

    /// Returns the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Transliteration of lowercase Cyrillic letters (passport-style, `й` -> `j`).
fn transliterate(ch: char) -> Option<&'static str> {
    let latin = match ch {
        'а' => "a",
        'б' => "b",
        'в' => "v",
        'г' => "g",
        'д' => "d",
        'е' | 'ё' | 'э' => "e",
        'ж' => "zh",
        'з' => "z",
        'и' => "i",
        'й' => "j",
        'к' => "k",
        'л' => "l",
        'м' => "m",
        'н' => "n",
        'о' => "o",
        'п' => "p",
        'р' => "r",
        'с' => "s",
        'т' => "t",
        'у' => "u",
        'ф' => "f",
        'х' => "h",
        'ц' => "c",
        'ч' => "ch",
        'ш' => "sh",
        'щ' => "shch",
        'ъ' | 'ь' => "",
        'ы' => "y",
        'ю' => "yu",
        'я' => "ya",
        _ => return None,
    };
    Some(latin)
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Slug {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_title_transliterates_catalog_names() {
        let cases = [
            (
                "Фильтр гидравлический JCB 32/925994",
                "filtr-gidravlicheskij-jcb-32-925994",
            ),
            (
                "Тормозные колодки передние JCB 15/920200",
                "tormoznye-kolodki-perednie-jcb-15-920200",
            ),
            ("Коленвал JCB 320/03336", "kolenval-jcb-320-03336"),
            ("Гидронасос основной JCB", "gidronasos-osnovnoj-jcb"),
        ];
        for (title, expected) in cases {
            assert_eq!(Slug::from_title(title).as_str(), expected, "{title}");
        }
    }

    #[test]
    fn test_from_title_collapses_separators() {
        assert_eq!(Slug::from_title("  --Hello,   World!-- ").as_str(), "hello-world");
    }

    #[test]
    fn test_from_title_empty_fallback() {
        assert_eq!(Slug::from_title("!!!").as_str(), "item");
    }

    #[test]
    fn test_parse_accepts_canonical() {
        assert!(Slug::parse("about").is_ok());
        assert!(Slug::parse("delivery-and-payment-2").is_ok());
    }

    #[test]
    fn test_parse_rejects_non_canonical() {
        assert_eq!(Slug::parse(""), Err(SlugError::Empty));
        assert_eq!(Slug::parse("About"), Err(SlugError::InvalidCharacters));
        assert_eq!(Slug::parse("a--b"), Err(SlugError::InvalidCharacters));
        assert_eq!(Slug::parse("-a"), Err(SlugError::InvalidCharacters));
        assert_eq!(Slug::parse("о-нас"), Err(SlugError::InvalidCharacters));
    }

    #[test]
    fn test_with_suffix() {
        let slug = Slug::parse("about").unwrap();
        assert_eq!(slug.with_suffix(2).as_str(), "about-2");
    }
}
