//! Internal DTD subset
//!
//! Only general entity declarations matter to a non-validating reader: they
//! define the replacement text for `&name;` references in character data
//! and attribute values. Element, attribute-list and notation declarations
//! are skipped. Parameter entities and external entities are recorded as
//! undefined, so a reference to one is reported as unrecognized.

use std::collections::{HashMap, HashSet};

use super::scanner::{is_name_char, is_name_start_char};

/// Limit on nested entity expansion
const MAX_EXPANSION_DEPTH: usize = 32;

/// Replacement text of the general entities declared in a DOCTYPE
#[derive(Debug, Clone, Default)]
pub struct EntityTable {
    /// Fully expanded replacement text, keyed by entity name
    expanded: HashMap<String, String>,
}

impl EntityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the entity declarations from DOCTYPE content (the text between
    /// `<!DOCTYPE` and the closing `>`).
    pub fn from_doctype(doctype: &str) -> Result<Self, String> {
        let subset = match (doctype.find('['), doctype.rfind(']')) {
            (Some(open), Some(close)) if open < close => &doctype[open + 1..close],
            _ => return Ok(Self::new()),
        };

        let raw = parse_entity_decls(subset)?;
        let mut expanded = HashMap::with_capacity(raw.len());
        for name in raw.iter().filter(|(_, v)| v.is_some()).map(|(k, _)| k) {
            let mut visiting = HashSet::new();
            let value = expand(name, &raw, &mut visiting, 0)?;
            expanded.insert(name.clone(), value);
        }
        Ok(EntityTable { expanded })
    }

    /// Replacement text for `name`: predefined entities first, then the
    /// declared ones.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        predefined(name).or_else(|| self.expanded.get(name).map(String::as_str))
    }

    pub fn len(&self) -> usize {
        self.expanded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expanded.is_empty()
    }
}

fn predefined(name: &str) -> Option<&'static str> {
    match name {
        "lt" => Some("<"),
        "gt" => Some(">"),
        "amp" => Some("&"),
        "apos" => Some("'"),
        "quot" => Some("\""),
        _ => None,
    }
}

/// General entities, name to literal value (`None` for external ones). The
/// first declaration of a name is binding.
fn parse_entity_decls(subset: &str) -> Result<HashMap<String, Option<String>>, String> {
    let bytes = subset.as_bytes();
    let len = bytes.len();
    let mut decls = HashMap::new();
    let mut pos = 0;

    while pos < len {
        if bytes[pos..].starts_with(b"<!--") {
            pos = match subset[pos + 4..].find("-->") {
                Some(end) => pos + 4 + end + 3,
                None => return Err("Unterminated comment in DOCTYPE".to_string()),
            };
            continue;
        }
        if bytes[pos] != b'<' {
            // whitespace or a parameter entity reference
            pos += 1;
            continue;
        }
        if !bytes[pos..].starts_with(b"<!ENTITY") {
            pos = skip_markup(bytes, pos);
            continue;
        }

        pos = skip_ws(bytes, pos + 8);
        let is_parameter = bytes.get(pos) == Some(&b'%');
        if is_parameter {
            pos = skip_ws(bytes, pos + 1);
        }

        let name_start = pos;
        if pos < len && is_name_start_char(bytes[pos]) {
            pos += 1;
            while pos < len && is_name_char(bytes[pos]) {
                pos += 1;
            }
        }
        if pos == name_start {
            return Err("ENTITY declaration without a valid name".to_string());
        }
        let name = subset[name_start..pos].to_string();
        pos = skip_ws(bytes, pos);

        let value = match bytes.get(pos) {
            Some(&quote) if quote == b'"' || quote == b'\'' => {
                let end = subset[pos + 1..]
                    .find(quote as char)
                    .ok_or_else(|| format!("Unterminated value for entity '{}'", name))?;
                let literal = subset[pos + 1..pos + 1 + end].to_string();
                pos += end + 2;
                Some(literal)
            }
            // SYSTEM or PUBLIC: external, never read
            _ => None,
        };

        pos = skip_markup(bytes, pos);
        if !is_parameter && !decls.contains_key(&name) {
            decls.insert(name, value);
        }
    }

    Ok(decls)
}

/// Index just past the next '>' outside quotes, starting at `pos`
fn skip_markup(bytes: &[u8], mut pos: usize) -> usize {
    let mut quote = None;
    while pos < bytes.len() {
        match (bytes[pos], quote) {
            (b'"' | b'\'', None) => quote = Some(bytes[pos]),
            (q, Some(open)) if q == open => quote = None,
            (b'>', None) => return pos + 1,
            _ => {}
        }
        pos += 1;
    }
    pos
}

#[inline]
fn skip_ws(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && matches!(bytes[pos], b' ' | b'\t' | b'\n' | b'\r') {
        pos += 1;
    }
    pos
}

/// Replacement text of `name` with character and entity references in its
/// literal value resolved.
fn expand(
    name: &str,
    raw: &HashMap<String, Option<String>>,
    visiting: &mut HashSet<String>,
    depth: usize,
) -> Result<String, String> {
    if depth > MAX_EXPANSION_DEPTH || !visiting.insert(name.to_string()) {
        return Err(format!("Recursive entity reference: &{};", name));
    }
    let literal = match raw.get(name) {
        Some(Some(value)) => value.as_str(),
        _ => return Err(format!("Undefined entity: &{};", name)),
    };

    let mut out = String::with_capacity(literal.len());
    let mut rest = literal;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let semi = rest[amp..]
            .find(';')
            .ok_or_else(|| format!("Unterminated reference in entity '{}'", name))?;
        let reference = &rest[amp + 1..amp + semi];
        if let Some(code) = reference.strip_prefix('#') {
            out.push(char_reference(code)?);
        } else if let Some(text) = predefined(reference) {
            out.push_str(text);
        } else {
            out.push_str(&expand(reference, raw, visiting, depth + 1)?);
        }
        rest = &rest[amp + semi + 1..];
    }
    out.push_str(rest);

    visiting.remove(name);
    Ok(out)
}

fn char_reference(code: &str) -> Result<char, String> {
    let parsed = match code.strip_prefix('x') {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => code.parse::<u32>(),
    };
    parsed
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| format!("Invalid character reference: &#{};", code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subset() {
        let table = EntityTable::from_doctype("html").unwrap();
        assert!(table.is_empty());
        assert_eq!(table.resolve("amp"), Some("&"));
        assert_eq!(table.resolve("nbsp"), None);
    }

    #[test]
    fn test_internal_entities() {
        let table = EntityTable::from_doctype(
            "r [\n  <!ELEMENT r (#PCDATA)>\n  <!ENTITY e \"v\">\n  <!ENTITY f 'x&e;y&#65;'>\n]",
        )
        .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.resolve("e"), Some("v"));
        assert_eq!(table.resolve("f"), Some("xvyA"));
    }

    #[test]
    fn test_first_declaration_wins() {
        let table = EntityTable::from_doctype("r [ <!ENTITY e \"1\"> <!ENTITY e \"2\"> ]").unwrap();
        assert_eq!(table.resolve("e"), Some("1"));
    }

    #[test]
    fn test_parameter_and_external_entities_skipped() {
        let table = EntityTable::from_doctype(
            "r [<!ENTITY % p \"x\"><!ENTITY ext SYSTEM \"ext.xml\"><!-- <!ENTITY c \"no\"> -->]",
        )
        .unwrap();
        assert!(table.is_empty());
        assert_eq!(table.resolve("ext"), None);
        assert_eq!(table.resolve("c"), None);
    }

    #[test]
    fn test_recursion_rejected() {
        let err = EntityTable::from_doctype("r [<!ENTITY a \"&b;\"><!ENTITY b \"&a;\">]").unwrap_err();
        assert!(err.contains("Recursive"), "{err}");
    }

    #[test]
    fn test_undefined_reference_in_value() {
        assert!(EntityTable::from_doctype("r [<!ENTITY a \"&zz;\">]").is_err());
    }
}
