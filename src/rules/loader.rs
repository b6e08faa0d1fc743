//! Rule file reader.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::{
    AnnotationRule, BaseClassRule, ConfigError, JavadocTagRule, MethodRule, RuleKind, RuleStore,
    RuleStoreBuilder,
};

const ROOT_ELEMENT: &str = "blacklist";

/// Read and parse the rule file at `path`.
pub fn load(path: &Path) -> Result<RuleStore, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_rules(&content, path)
}

/// Parse rule file content. `path` is only used in error messages.
///
/// Either every rule is accepted or the whole document is rejected.
pub fn parse_rules(content: &str, path: &Path) -> Result<RuleStore, ConfigError> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let lines = LineIndex::new(content);
    let mut builder = RuleStoreBuilder::new();
    // 0 = before/after root, 1 = inside <blacklist>, 2+ = inside a rule element
    let mut depth = 0usize;
    let mut root_seen = false;
    let mut open_rule: Option<String> = None;

    loop {
        let event = reader.read_event().map_err(|e| ConfigError::Xml {
            path: path.to_path_buf(),
            line: lines.line_of(reader.error_position()),
            message: e.to_string(),
        })?;
        let line = lines.line_of(reader.buffer_position());

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                let name = element_name(e);
                match depth {
                    0 => {
                        if root_seen {
                            return Err(ConfigError::Xml {
                                path: path.to_path_buf(),
                                line,
                                message: format!("second root element <{}>", name),
                            });
                        }
                        if name != ROOT_ELEMENT {
                            return Err(ConfigError::UnexpectedRoot {
                                path: path.to_path_buf(),
                                found: name,
                            });
                        }
                        root_seen = true;
                    }
                    1 => {
                        let kind = RuleKind::from_element(&name).ok_or_else(|| {
                            ConfigError::UnknownElement {
                                path: path.to_path_buf(),
                                element: name.clone(),
                                line,
                            }
                        })?;
                        let attrs = read_attributes(e, path, line)?;
                        let element = RuleElement {
                            kind,
                            attrs,
                            path,
                            line,
                        };
                        element.register(&mut builder)?;
                        if !is_empty {
                            open_rule = Some(name);
                        }
                    }
                    _ => {
                        return Err(ConfigError::NestedElement {
                            path: path.to_path_buf(),
                            element: open_rule.clone().unwrap_or_default(),
                            child: name,
                            line,
                        });
                    }
                }
                if !is_empty {
                    depth += 1;
                }
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                if depth <= 1 {
                    open_rule = None;
                }
            }
            Event::Text(ref t) => {
                let text = t.unescape().map_err(|e| ConfigError::Xml {
                    path: path.to_path_buf(),
                    line,
                    message: e.to_string(),
                })?;
                if depth <= 1 && !text.trim().is_empty() {
                    return Err(ConfigError::UnexpectedText {
                        path: path.to_path_buf(),
                        text: text.trim().to_string(),
                        line,
                    });
                }
            }
            Event::CData(ref c) => {
                if depth <= 1 {
                    return Err(ConfigError::UnexpectedText {
                        path: path.to_path_buf(),
                        text: String::from_utf8_lossy(c).to_string(),
                        line,
                    });
                }
            }
            Event::Eof => {
                if depth != 0 {
                    return Err(ConfigError::Xml {
                        path: path.to_path_buf(),
                        line,
                        message: format!("unclosed <{}>", ROOT_ELEMENT),
                    });
                }
                break;
            }
            // Comments, declarations, processing instructions, doctype
            _ => {}
        }
    }

    if !root_seen {
        return Err(ConfigError::EmptyDocument {
            path: path.to_path_buf(),
        });
    }

    Ok(builder.build())
}

fn element_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.name().as_ref()).to_string()
}

fn read_attributes(
    e: &BytesStart,
    path: &Path,
    line: usize,
) -> Result<HashMap<String, String>, ConfigError> {
    let mut attrs = HashMap::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| ConfigError::Xml {
            path: path.to_path_buf(),
            line,
            message: err.to_string(),
        })?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr
            .unescape_value()
            .map_err(|err| ConfigError::Xml {
                path: path.to_path_buf(),
                line,
                message: err.to_string(),
            })?
            .to_string();
        attrs.insert(key, value);
    }
    Ok(attrs)
}

/// One direct child of `<blacklist>` with its attributes.
struct RuleElement<'a> {
    kind: RuleKind,
    attrs: HashMap<String, String>,
    path: &'a Path,
    line: usize,
}

impl RuleElement<'_> {
    fn register(&self, builder: &mut RuleStoreBuilder) -> Result<(), ConfigError> {
        let message = self.attrs.get("message").cloned().unwrap_or_default();

        match self.kind {
            RuleKind::Method => {
                let class = self.required("class")?;
                let name = self.required("name")?;
                builder.add_method(MethodRule {
                    simple_name: name,
                    declaring_class: class,
                    params: self.params()?,
                    message,
                });
            }
            RuleKind::Constructor => {
                let class = self.required("class")?;
                let simple_name = class.rsplit('.').next().unwrap_or(&class).to_string();
                if simple_name.is_empty() {
                    return Err(self.invalid("class", &class));
                }
                builder.add_constructor(MethodRule {
                    simple_name,
                    declaring_class: class,
                    params: self.params()?,
                    message,
                });
            }
            RuleKind::Annotation => {
                builder.add_annotation(AnnotationRule {
                    qualified_name: self.required("class")?,
                    message,
                });
            }
            RuleKind::BaseClass => {
                builder.add_base_class(BaseClassRule {
                    qualified_name: self.required("class")?,
                    message,
                });
            }
            RuleKind::Javadoc => {
                let raw = self.required("name")?;
                let tag_name = raw.trim_start_matches('@').to_string();
                if tag_name.is_empty() {
                    return Err(self.invalid("name", &raw));
                }
                builder.add_javadoc_tag(JavadocTagRule { tag_name, message });
            }
        }
        Ok(())
    }

    fn required(&self, attribute: &str) -> Result<String, ConfigError> {
        match self.attrs.get(attribute).map(|v| v.trim()) {
            Some(value) if !value.is_empty() => Ok(value.to_string()),
            _ => Err(ConfigError::MissingAttribute {
                path: self.path.to_path_buf(),
                element: self.kind.element_name().to_string(),
                attribute: attribute.to_string(),
                line: self.line,
            }),
        }
    }

    /// `params` absent is a wildcard, blank means "no arguments".
    fn params(&self) -> Result<Option<Vec<String>>, ConfigError> {
        let raw = match self.attrs.get("params") {
            None => return Ok(None),
            Some(raw) => raw,
        };
        if raw.trim().is_empty() {
            return Ok(Some(Vec::new()));
        }
        let params: Vec<String> = raw.split(',').map(|p| p.trim().to_string()).collect();
        if params.iter().any(String::is_empty) {
            return Err(self.invalid("params", raw));
        }
        Ok(Some(params))
    }

    fn invalid(&self, attribute: &str, value: &str) -> ConfigError {
        ConfigError::InvalidAttribute {
            path: self.path.to_path_buf(),
            element: self.kind.element_name().to_string(),
            attribute: attribute.to_string(),
            value: value.to_string(),
            line: self.line,
        }
    }
}

/// Maps byte offsets to 1-indexed line numbers.
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(content: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(content.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { starts }
    }

    fn line_of(&self, pos: u64) -> usize {
        let pos = pos as usize;
        // The reader reports the offset just past the event.
        let pos = pos.saturating_sub(1);
        self.starts.partition_point(|&start| start <= pos).max(1)
    }
}
