//! Container tags read from the source file.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Tags copied into the final file, paired with the tagger option that
/// writes each one.
const TAG_OPTIONS: [(&str, &str); 6] = [
    ("title", "--title"),
    ("album", "--album"),
    ("artist", "--artist"),
    ("genre", "--genre"),
    ("comment", "--comment"),
    ("date", "--year"),
];

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    format: ProbeFormat,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    #[serde(default)]
    tags: HashMap<String, String>,
}

/// Tag name to value, keys lower-cased. Read once per job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetadataBundle {
    tags: BTreeMap<String, String>,
}

impl MetadataBundle {
    /// Parses `ffprobe -print_format json -show_format` output.
    pub fn from_ffprobe_json(json: &str) -> Result<Self, serde_json::Error> {
        let probe: ProbeOutput = serde_json::from_str(json)?;
        let tags = probe
            .format
            .tags
            .into_iter()
            .map(|(key, value)| (key.to_lowercase(), value))
            .collect();
        Ok(Self { tags })
    }

    pub fn get(&self, tag: &str) -> Option<&str> {
        self.tags.get(tag).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Tagger options for the tags that are present. Missing tags are
    /// left out rather than written empty.
    pub fn tagging_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        for (tag, option) in TAG_OPTIONS {
            if let Some(value) = self.get(tag) {
                args.push(option.to_string());
                args.push(value.to_string());
            }
        }
        args
    }
}
