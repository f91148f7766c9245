//! Write translated text into the placeholders of an XML language template.
//!
//! A placeholder is the text right before a `]]`, back to the preceding `[`
//! (or the start of the line, or the end of the previous placeholder):
//!
//! ```text
//! <string id="title">[Main window]]</string>
//!                     ^^^^^^^^^^^ replaced by the next translation
//! ```
//!
//! Translations are consumed in order, one per placeholder. With a language
//! tag, only lines inside `<language id="TAG">` … `</language>` are touched.

use std::path::Path;

use tracing::warn;

use crate::error::InifigError;

const CLOSE: &str = "]]";

/// How a substitution pass went.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubstitutionReport {
    /// Placeholders filled with a translation.
    pub replaced: usize,
    /// Placeholders left empty because the translations ran out.
    pub missing: usize,
    /// Translations that were never used.
    pub unused: usize,
}

/// Hands out translations in order and counts shortfalls.
struct Translations<'a, T> {
    items: &'a [T],
    next: usize,
    missing: usize,
}

impl<T: AsRef<str>> Translations<'_, T> {
    fn take(&mut self) -> &str {
        match self.items.get(self.next) {
            Some(t) => {
                self.next += 1;
                t.as_ref()
            }
            None => {
                if self.missing == 0 {
                    warn!(
                        available = self.items.len(),
                        "ran out of translations; remaining placeholders are left empty"
                    );
                }
                self.missing += 1;
                ""
            }
        }
    }
}

/// Replace every placeholder in `line`.
fn substitute_line<T: AsRef<str>>(line: &str, translations: &mut Translations<'_, T>) -> String {
    let mut out = String::with_capacity(line.len());
    let mut cursor = 0;

    while let Some(offset) = line[cursor..].find(CLOSE) {
        let close = cursor + offset;
        let start = line[cursor..close]
            .rfind('[')
            .map_or(cursor, |i| cursor + i + 1);

        out.push_str(&line[cursor..start]);
        if start < close {
            out.push_str(translations.take());
        }
        out.push_str(CLOSE);
        cursor = close + CLOSE.len();
    }

    out.push_str(&line[cursor..]);
    out
}

fn opens_language(line: &str, language: &str) -> Option<bool> {
    line.contains("<language id=\"")
        .then(|| line.contains(&format!("{language}\">")))
}

fn closes_language(line: &str) -> bool {
    line.contains("</language>")
}

/// Fill the placeholders of `lines` with `translations`.
///
/// With an empty `language`, every line is processed. Otherwise only the
/// lines strictly between `<language id="{language}">` and the next
/// `</language>` are; all other lines are copied unchanged. Each output line
/// ends with `\n`.
pub fn substitute<L, T>(lines: &[L], translations: &[T], language: &str) -> (String, SubstitutionReport)
where
    L: AsRef<str>,
    T: AsRef<str>,
{
    let mut pool = Translations {
        items: translations,
        next: 0,
        missing: 0,
    };
    let mut out = String::new();
    let mut inside = false;

    for line in lines {
        let line = line.as_ref();
        if language.is_empty() {
            out.push_str(&substitute_line(line, &mut pool));
        } else if let Some(matches) = opens_language(line, language) {
            out.push_str(line);
            inside = matches;
        } else if inside && closes_language(line) {
            out.push_str(line);
            inside = false;
        } else if inside {
            out.push_str(&substitute_line(line, &mut pool));
        } else {
            out.push_str(line);
        }
        out.push('\n');
    }

    let report = SubstitutionReport {
        replaced: pool.next,
        missing: pool.missing,
        unused: translations.len() - pool.next,
    };
    (out, report)
}

/// Run [`substitute`] and write the result to `path`.
pub fn write_file<L, T>(
    path: &Path,
    lines: &[L],
    translations: &[T],
    language: &str,
) -> Result<SubstitutionReport, InifigError>
where
    L: AsRef<str>,
    T: AsRef<str>,
{
    let (content, report) = substitute(lines, translations, language);
    std::fs::write(path, content).map_err(|e| InifigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(report)
}
