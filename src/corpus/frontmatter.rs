//! Front matter splitting for post sources.
//!
//! Posts open with either a YAML block fenced by `---` lines or a TOML
//! block fenced by `+++` lines:
//!
//! ```text
//! ---                          +++
//! title: Rust ownership        title = "Rust ownership"
//! tags: [rust]                 tags = ["rust"]
//! ---                          +++
//! Body text...                 Body text...
//! ```

/// Language of a front matter block, chosen by its fence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `---` fences.
    Yaml,
    /// `+++` fences.
    Toml,
}

impl Format {
    const fn delimiter(self) -> &'static str {
        match self {
            Self::Yaml => "---",
            Self::Toml => "+++",
        }
    }
}

/// A front matter block and the language it is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block<'a> {
    pub format: Format,
    pub text: &'a str,
}

/// Split a post source into its front matter and body.
///
/// Returns `None` for the front matter when the source does not open with a
/// fence line or the block is never closed; the whole source is then the
/// body.
#[must_use]
pub fn split(source: &str) -> (Option<Block<'_>>, &str) {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);

    for format in [Format::Yaml, Format::Toml] {
        if let Some((text, body)) = split_fenced(source, format.delimiter()) {
            return (Some(Block { format, text }), body);
        }
    }

    (None, source)
}

fn split_fenced<'a>(source: &'a str, delimiter: &str) -> Option<(&'a str, &'a str)> {
    let rest = source.strip_prefix(delimiter)?;
    let rest = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == delimiter {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }

    None
}
