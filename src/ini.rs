use crate::error::PipelineError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Blank,
    Comment(String),
    Entry(Entry),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    key: String,
    separator: String,
    value: String,
}

impl Entry {
    fn new(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            separator: " = ".to_string(),
            value: value.to_string(),
        }
    }

    fn matches(&self, key: &str) -> bool {
        self.key.eq_ignore_ascii_case(key)
    }

    fn set_value(&mut self, value: &str) {
        if self.value.is_empty() && !self.separator.ends_with(char::is_whitespace) {
            self.separator.push(' ');
        }
        self.value = value.to_string();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Section {
    name: String,
    header: String,
    lines: Vec<Line>,
}

impl Section {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            header: format!("[{name}]"),
            lines: Vec::new(),
        }
    }

    fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.lines.iter().filter_map(|line| match line {
            Line::Entry(entry) => Some(entry),
            _ => None,
        })
    }

    fn entry_mut(&mut self, key: &str) -> Option<&mut Entry> {
        self.lines.iter_mut().find_map(|line| match line {
            Line::Entry(entry) if entry.matches(key) => Some(entry),
            _ => None,
        })
    }

    fn insert(&mut self, entry: Entry) {
        let position = self
            .lines
            .iter()
            .rposition(|line| !matches!(line, Line::Blank))
            .map(|index| index + 1)
            .unwrap_or(0);
        self.lines.insert(position, Line::Entry(entry));
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniDocument {
    preamble: Vec<Line>,
    sections: Vec<Section>,
}

impl IniDocument {
    pub fn parse(content: &str) -> Result<Self, PipelineError> {
        let mut document = IniDocument::default();

        for (index, raw) in content.lines().enumerate() {
            let line_no = index + 1;
            let trimmed = raw.trim();

            if trimmed.is_empty() {
                document.current_lines().push(Line::Blank);
                continue;
            }

            if trimmed.starts_with('#') || trimmed.starts_with(';') {
                document.current_lines().push(Line::Comment(raw.to_string()));
                continue;
            }

            let indented = raw.starts_with(|ch: char| ch.is_whitespace());
            if indented {
                if let Some(Line::Entry(entry)) = document.current_lines().last_mut() {
                    entry.value.push('\n');
                    entry.value.push_str(raw.trim_end());
                    continue;
                }
            }

            if trimmed.starts_with('[') {
                let name = trimmed
                    .strip_prefix('[')
                    .and_then(|rest| rest.strip_suffix(']'))
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .ok_or_else(|| {
                        PipelineError::ConfigParse(format!(
                            "line {line_no}: malformed section header `{trimmed}`"
                        ))
                    })?;
                if document.has_section(name) {
                    return Err(PipelineError::ConfigParse(format!(
                        "line {line_no}: duplicate section [{name}]"
                    )));
                }
                document.sections.push(Section {
                    name: name.to_string(),
                    header: raw.trim_end().to_string(),
                    lines: Vec::new(),
                });
                continue;
            }

            let entry = parse_entry(raw).ok_or_else(|| {
                PipelineError::ConfigParse(format!(
                    "line {line_no}: expected `key = value`, found `{trimmed}`"
                ))
            })?;
            let section = document.sections.last_mut().ok_or_else(|| {
                PipelineError::ConfigParse(format!(
                    "line {line_no}: key `{}` appears before any section header",
                    entry.key
                ))
            })?;
            if section.entries().any(|existing| existing.matches(&entry.key)) {
                return Err(PipelineError::ConfigParse(format!(
                    "line {line_no}: duplicate key `{}` in section [{}]",
                    entry.key, section.name
                )));
            }
            section.lines.push(Line::Entry(entry));
        }

        Ok(document)
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.preamble {
            push_line(&mut out, line);
        }
        for section in &self.sections {
            out.push_str(&section.header);
            out.push('\n');
            for line in &section.lines {
                push_line(&mut out, line);
            }
        }
        out
    }

    pub fn has_section(&self, name: &str) -> bool {
        self.section(name).is_some()
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|section| section.name.as_str())
    }

    pub fn keys<'a>(&'a self, section: &str) -> Vec<&'a str> {
        self.section(section)
            .map(|section| section.entries().map(|entry| entry.key.as_str()).collect())
            .unwrap_or_default()
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.section(section)?
            .entries()
            .find(|entry| entry.matches(key))
            .map(|entry| entry.value.as_str())
    }

    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        if !self.has_section(section) {
            let needs_gap = self.sections.last().is_some_and(|last| {
                !matches!(last.lines.last(), Some(Line::Blank) | None)
            });
            if needs_gap {
                if let Some(last) = self.sections.last_mut() {
                    last.lines.push(Line::Blank);
                }
            }
            self.sections.push(Section::new(section));
        }

        let Some(target) = self.sections.iter_mut().find(|s| s.name == section) else {
            return;
        };
        match target.entry_mut(key) {
            Some(entry) => entry.set_value(value),
            None => target.insert(Entry::new(key, value)),
        }
    }

    fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.name == name)
    }

    fn current_lines(&mut self) -> &mut Vec<Line> {
        match self.sections.last_mut() {
            Some(section) => &mut section.lines,
            None => &mut self.preamble,
        }
    }
}

fn parse_entry(raw: &str) -> Option<Entry> {
    let body = raw.trim_start();
    let split = body.find(['=', ':'])?;
    let key = body[..split].trim_end();
    if key.is_empty() {
        return None;
    }
    let value = body[split + 1..].trim_start();
    let separator = &body[key.len()..body.len() - value.len()];
    Some(Entry {
        key: key.to_string(),
        separator: separator.to_string(),
        value: value.trim_end().to_string(),
    })
}

fn push_line(out: &mut String, line: &Line) {
    match line {
        Line::Blank => {}
        Line::Comment(text) => out.push_str(text),
        Line::Entry(entry) => {
            out.push_str(&entry.key);
            out.push_str(&entry.separator);
            out.push_str(&entry.value);
        }
    }
    out.push('\n');
}
