use std::fmt;

// Script-side regex literals, backed by fancy-regex so lookaround used by
// real-world payloads keeps working.
#[derive(Debug, Clone)]
pub(crate) struct Regex {
    backend: fancy_regex::Regex,
}

impl Regex {
    pub(crate) fn new(pattern: &str, flags: &str) -> Result<Self, RegexError> {
        let mut translated = String::new();
        for flag in flags.chars() {
            match flag {
                'i' => translated.push_str("(?i)"),
                'm' => translated.push_str("(?m)"),
                's' => translated.push_str("(?s)"),
                // Global/sticky matching changes iteration, not the pattern.
                'g' | 'y' => {}
                other => {
                    return Err(RegexError(format!("unsupported regex flag: {other}")));
                }
            }
        }
        translated.push_str(pattern);
        let backend = fancy_regex::Regex::new(&translated).map_err(RegexError::from)?;
        Ok(Self { backend })
    }

    pub(crate) fn is_match(&self, input: &str) -> Result<bool, RegexError> {
        self.backend.is_match(input).map_err(RegexError::from)
    }

    pub(crate) fn find(&self, input: &str) -> Result<Option<String>, RegexError> {
        let matched = self.backend.find(input).map_err(RegexError::from)?;
        Ok(matched.map(|m| m.as_str().to_string()))
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RegexError(String);

impl fmt::Display for RegexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<fancy_regex::Error> for RegexError {
    fn from(err: fancy_regex::Error) -> Self {
        Self(err.to_string())
    }
}
