use std::borrow::Cow;

use regex::{Regex, RegexBuilder};

/// "User friendly" pre-processing of resource names, so that `KR 120-R2500`, `kr120_r2500`
/// and `KR120R2500` all land on the same key: lowercase, every non-alphanumeric
/// character (underscores included) dropped.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Case-insensitive rewrite of free-text synonyms, like "drilling" into "drill".
/// Every pair is applied in order, as plain substring replacement.
#[derive(Debug, Clone)]
pub struct Synonyms {
    rules: Vec<(Regex, String)>,
}

impl Synonyms {
    pub fn new<S: AsRef<str>>(pairs: &[(S, S)]) -> Self {
        let rules = pairs
            .iter()
            .filter(|(from, _)| !from.as_ref().is_empty())
            .map(|(from, to)| {
                // Escaped literal, so building it cannot fail.
                let re = RegexBuilder::new(&regex::escape(from.as_ref()))
                    .case_insensitive(true)
                    .build()
                    .unwrap();
                (re, to.as_ref().to_string())
            })
            .collect();
        Synonyms { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rewrite<'a>(&self, name: &'a str) -> Cow<'a, str> {
        let mut current = Cow::Borrowed(name);
        for (re, to) in &self.rules {
            if re.is_match(&current) {
                current = Cow::Owned(re.replace_all(&current, regex::NoExpand(to.as_str())).into_owned());
            }
        }
        current
    }
}

impl Default for Synonyms {
    fn default() -> Self {
        Synonyms::new(&[("drilling", "drill")])
    }
}
