//! Line-level INI reader.
//!
//! Understands exactly what the trainer configuration format needs:
//! `[section]` headers, `name = value` parameters, `#` comments, and
//! blank lines. Interpretation of names and values happens one layer up.

use crate::error::{Error, Result};

/// A parsed configuration document.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub sections: Vec<Section>,
}

/// One `[name]` section and the parameters that followed it.
#[derive(Debug, Clone)]
pub struct Section {
    pub name: String,
    pub line: usize,
    pub params: Vec<Param>,
}

/// One `name = value` line.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub value: String,
    pub line: usize,
}

fn err_at(line: usize, message: impl AsRef<str>) -> Error {
    Error::Config(format!("line {} - {}", line, message.as_ref()))
}

/// Parse a configuration document from text.
pub fn parse(input: &str) -> Result<Document> {
    let mut sections: Vec<Section> = Vec::new();

    for (idx, raw) in input.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with('[') {
            let name = parse_section_header(line).map_err(|m| err_at(line_no, m))?;
            sections.push(Section {
                name,
                line: line_no,
                params: Vec::new(),
            });
            continue;
        }

        let (name, value) = parse_param_line(line).map_err(|m| err_at(line_no, m))?;
        let current = sections
            .last_mut()
            .ok_or_else(|| err_at(line_no, "parameter appears outside of a section"))?;
        current.params.push(Param {
            name,
            value,
            line: line_no,
        });
    }

    Ok(Document { sections })
}

fn parse_section_header(line: &str) -> std::result::Result<String, String> {
    let inner = line
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| "section header does not end with ']'".to_string())?;

    let name = inner.trim();
    if name.is_empty() {
        return Err("section name is empty".to_string());
    }

    Ok(name.to_string())
}

fn parse_param_line(line: &str) -> std::result::Result<(String, String), String> {
    let (name, value) = line
        .split_once('=')
        .ok_or_else(|| "line is missing '='".to_string())?;

    let name = name.trim();
    let value = value.trim();

    if name.is_empty() {
        return Err("parameter name is empty".to_string());
    }
    if value.is_empty() {
        return Err("parameter value is empty".to_string());
    }

    Ok((name.to_string(), value.to_string()))
}
