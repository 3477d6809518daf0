//! Supported languages and the starter source each one opens with.

use std::fmt;
use std::str::FromStr;

use anyhow::{Result, anyhow};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

const PYTHON_DEFAULT: &str = "# Write your Python code here\nprint(\"Hello from Python!\")";

const CPP_DEFAULT: &str = r#"// Write your C++ code here
#include <iostream>
#include <string>
#include <vector>

int main() {
    std::cout << "Hello from C++!" << std::endl;
    return 0;
}"#;

/// Closed set of languages the compile service accepts.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    #[value(alias = "py")]
    Python,
    #[value(aliases = ["c++", "cxx", "cc"])]
    Cpp,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::Python, Language::Cpp];

    /// Identifier sent over the wire, e.g. `cpp`.
    pub fn id(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Cpp => "cpp",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Language::Python => "Python",
            Language::Cpp => "C++",
        }
    }

    /// Canonical starter source shown before the user types anything.
    pub fn default_code(self) -> &'static str {
        match self {
            Language::Python => PYTHON_DEFAULT,
            Language::Cpp => CPP_DEFAULT,
        }
    }

    /// Language whose canonical default is exactly `text`, if any.
    pub fn owning_default(text: &str) -> Option<Language> {
        Self::ALL
            .into_iter()
            .find(|lang| lang.default_code() == text)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Language {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "python" | "py" => Ok(Language::Python),
            "cpp" | "c++" | "cxx" | "cc" => Ok(Language::Cpp),
            other => Err(anyhow!(
                "unsupported language '{other}'; expected one of: python, cpp"
            )),
        }
    }
}
