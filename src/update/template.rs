//! Text templates for PR titles, bodies, commit messages and branch names
//!
//! The syntax is small: `{{ field }}` substitutes a value,
//! `{{ old.raw }}` / `{{ new.raw }}` give a version as it was written, and a
//! value can be piped through `lower` or `upper`.

use crate::config::TemplateConfig;
use crate::error::{Error, Result};
use crate::update::prmeta::PrMetadata;
use crate::version::Version;

const DEFAULT_PR_TITLE: &str = "Bump {{ name }} from {{ old }} to {{ new }}";
const DEFAULT_COMMIT_MSG: &str = "Bump {{ name }} from {{ old }} to {{ new }}";
const DEFAULT_BRANCH: &str = "update/{{ name }}-{{ new }}";
const DEFAULT_PR_BODY: &str = r#"Bumps {{ name }} from {{ old }} to {{ new }}

<details>
<summary>Release notes</summary>
<em>View details <a href="{{ url }}">here</a>.</em>
<blockquote>
{{ release_notes }}
</blockquote>
</details>
"#;

/// Values available to templates
#[derive(Debug, Clone, Copy)]
pub struct TemplateData<'a> {
    /// Update name
    pub name: &'a str,
    /// Release URL
    pub url: &'a str,
    /// Version currently in the file
    pub old: &'a Version,
    /// Version being proposed
    pub new: &'a Version,
    /// Release notes of the new version
    pub release_notes: &'a str,
}

impl TemplateData<'_> {
    fn value(&self, field: Field) -> String {
        match field {
            Field::Name => self.name.to_string(),
            Field::Url => self.url.to_string(),
            Field::ReleaseNotes => self.release_notes.to_string(),
            Field::Old => self.old.to_string(),
            Field::New => self.new.to_string(),
            Field::OldRaw => self.old.as_raw().to_string(),
            Field::NewRaw => self.new.as_raw().to_string(),
        }
    }
}

/// A value a tag can refer to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Name,
    Url,
    ReleaseNotes,
    Old,
    New,
    OldRaw,
    NewRaw,
}

impl Field {
    fn from_path(path: &str) -> Option<Self> {
        let field = match path {
            "name" => Self::Name,
            "url" => Self::Url,
            "release_notes" => Self::ReleaseNotes,
            "old" => Self::Old,
            "new" => Self::New,
            "old.raw" => Self::OldRaw,
            "new.raw" => Self::NewRaw,
            _ => return None,
        };
        Some(field)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Filter {
    Lower,
    Upper,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Field { field: Field, filters: Vec<Filter> },
}

/// A parsed template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Parse template source
    pub fn parse(source: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut rest = source;

        while let Some(start) = rest.find("{{") {
            if start > 0 {
                segments.push(Segment::Text(rest[..start].to_string()));
            }
            let after = &rest[start + 2..];
            let end = after
                .find("}}")
                .ok_or_else(|| Error::Config(format!("unterminated tag in {source:?}")))?;
            segments.push(parse_tag(&after[..end])?);
            rest = &after[end + 2..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }

        Ok(Self { segments })
    }

    /// Render with `data`
    pub fn render(&self, data: &TemplateData<'_>) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Field { field, filters } => {
                    let value = filters.iter().fold(data.value(*field), |value, filter| {
                        match filter {
                            Filter::Lower => value.to_lowercase(),
                            Filter::Upper => value.to_uppercase(),
                        }
                    });
                    out.push_str(&value);
                }
            }
        }
        out
    }
}

fn parse_tag(inner: &str) -> Result<Segment> {
    let mut parts = inner.split('|').map(str::trim);
    let path = parts.next().unwrap_or_default();
    if path.is_empty() {
        return Err(Error::Config(format!("empty tag `{{{{{inner}}}}}`")));
    }
    let field = Field::from_path(path).ok_or_else(|| {
        Error::Config(format!(
            "unknown field `{path}`, expected one of name, url, release_notes, old, new, old.raw, new.raw"
        ))
    })?;
    let filters = parts
        .map(|name| match name {
            "lower" => Ok(Filter::Lower),
            "upper" => Ok(Filter::Upper),
            other => Err(Error::Config(format!("unknown filter `{other}`"))),
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Segment::Field { field, filters })
}

/// Everything rendered for one PR
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPr {
    /// PR title
    pub title: String,
    /// PR body, footer included
    pub body: String,
    /// Commit message
    pub commit_message: String,
    /// Head branch name
    pub branch: String,
}

/// The four templates used when opening a PR
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Templates {
    pr_title: Template,
    pr_body: Template,
    commit_msg: Template,
    branch: Template,
}

impl Templates {
    /// Parse configured templates, falling back to the defaults
    pub fn from_config(config: &TemplateConfig) -> Result<Self> {
        let parse = |what: &str, configured: Option<&String>, default: &str| {
            Template::parse(configured.map_or(default, String::as_str)).map_err(|e| match e {
                Error::Config(msg) => Error::Config(format!("{what} template: {msg}")),
                other => other,
            })
        };
        Ok(Self {
            pr_title: parse("PR title", config.pr_title.as_ref(), DEFAULT_PR_TITLE)?,
            pr_body: parse("PR body", config.pr_body.as_ref(), DEFAULT_PR_BODY)?,
            commit_msg: parse("commit message", config.commit_msg.as_ref(), DEFAULT_COMMIT_MSG)?,
            branch: parse("branch", config.branch.as_ref(), DEFAULT_BRANCH)?,
        })
    }

    /// Render the commit message alone
    pub fn commit_message(&self, data: &TemplateData<'_>) -> String {
        self.commit_msg.render(data)
    }

    /// Render everything needed to open a PR, with `meta` as body footer
    ///
    /// Fails with [`Error::Render`] when the title comes out empty or the
    /// branch is not a valid git branch name.
    pub fn render(&self, data: &TemplateData<'_>, meta: &PrMetadata) -> Result<RenderedPr> {
        let title = self.pr_title.render(data);
        if title.trim().is_empty() {
            return Err(Error::Render("PR title rendered empty".to_string()));
        }
        let branch = self.branch.render(data);
        check_branch_name(&branch)?;

        Ok(RenderedPr {
            title,
            body: meta.append_to(&self.pr_body.render(data)),
            commit_message: self.commit_msg.render(data),
            branch,
        })
    }
}

/// Reject names git would refuse as a branch (`git check-ref-format --branch`)
fn check_branch_name(branch: &str) -> Result<()> {
    let invalid = |why: &str| Err(Error::Render(format!("branch {branch:?} {why}")));

    if branch.is_empty() {
        return invalid("is empty");
    }
    if branch
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || "~^:?*[\\".contains(c))
    {
        return invalid("contains a character git does not allow");
    }
    if branch.contains("..") || branch.contains("@{") || branch.contains("//") {
        return invalid("contains a forbidden sequence");
    }
    if branch.starts_with(['/', '-']) || branch.ends_with(['/', '.']) || branch.ends_with(".lock")
    {
        return invalid("has an invalid start or end");
    }
    if branch.split('/').any(|part| part.starts_with('.')) {
        return invalid("has a component starting with `.`");
    }
    Ok(())
}

impl Default for Templates {
    fn default() -> Self {
        Self::from_config(&TemplateConfig::default()).expect("default templates are valid")
    }
}
