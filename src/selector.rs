use crate::dom::{Dom, NodeId};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AttrCondition {
    Exists { key: String },
    Eq { key: String, value: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SelectorStep {
    pub(crate) tag: Option<String>,
    pub(crate) universal: bool,
    pub(crate) id: Option<String>,
    pub(crate) classes: Vec<String>,
    pub(crate) attrs: Vec<AttrCondition>,
}

impl SelectorStep {
    fn is_empty(&self) -> bool {
        self.tag.is_none()
            && !self.universal
            && self.id.is_none()
            && self.classes.is_empty()
            && self.attrs.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Combinator {
    Descendant,
    Child,
}

/// One compound step plus the combinator linking it to the step before it.
/// The first part's combinator is unused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SelectorPart {
    pub(crate) combinator: Combinator,
    pub(crate) step: SelectorStep,
}

pub(crate) fn query_all(dom: &Dom, root: NodeId, selector: &str) -> Result<Vec<NodeId>> {
    let groups = parse_selector_groups(selector)?;
    let mut out = Vec::new();
    for node in dom.descendants(root) {
        if dom.element(node).is_none() {
            continue;
        }
        if groups.iter().any(|chain| matches_chain(dom, chain, node)) {
            out.push(node);
        }
    }
    Ok(out)
}

pub(crate) fn query_one(dom: &Dom, root: NodeId, selector: &str) -> Result<Option<NodeId>> {
    let groups = parse_selector_groups(selector)?;
    for node in dom.descendants(root) {
        if dom.element(node).is_none() {
            continue;
        }
        if groups.iter().any(|chain| matches_chain(dom, chain, node)) {
            return Ok(Some(node));
        }
    }
    Ok(None)
}

fn matches_chain(dom: &Dom, chain: &[SelectorPart], node: NodeId) -> bool {
    if chain.is_empty() {
        return false;
    }
    matches_at(dom, chain, chain.len() - 1, node)
}

fn matches_at(dom: &Dom, chain: &[SelectorPart], idx: usize, node: NodeId) -> bool {
    if !matches_step(dom, &chain[idx].step, node) {
        return false;
    }
    if idx == 0 {
        return true;
    }
    match chain[idx].combinator {
        Combinator::Child => match dom.parent(node) {
            Some(parent) => matches_at(dom, chain, idx - 1, parent),
            None => false,
        },
        Combinator::Descendant => {
            let mut cursor = dom.parent(node);
            while let Some(ancestor) = cursor {
                if matches_at(dom, chain, idx - 1, ancestor) {
                    return true;
                }
                cursor = dom.parent(ancestor);
            }
            false
        }
    }
}

fn matches_step(dom: &Dom, step: &SelectorStep, node: NodeId) -> bool {
    let Some(element) = dom.element(node) else {
        return false;
    };
    if let Some(tag) = &step.tag {
        if !element.tag_name.eq_ignore_ascii_case(tag) {
            return false;
        }
    }
    if let Some(id) = &step.id {
        if element.attrs.get("id").map(String::as_str) != Some(id.as_str()) {
            return false;
        }
    }
    for class in &step.classes {
        if !dom.has_class(node, class) {
            return false;
        }
    }
    for cond in &step.attrs {
        match cond {
            AttrCondition::Exists { key } => {
                if !element.attrs.contains_key(key) {
                    return false;
                }
            }
            AttrCondition::Eq { key, value } => {
                if element.attrs.get(key).map(String::as_str) != Some(value.as_str()) {
                    return false;
                }
            }
        }
    }
    true
}

pub(crate) fn parse_selector_groups(selector: &str) -> Result<Vec<Vec<SelectorPart>>> {
    let mut groups = Vec::new();
    for group in split_top_level_commas(selector)? {
        groups.push(parse_selector_chain(&group)?);
    }
    if groups.is_empty() {
        return Err(Error::UnsupportedSelector(selector.to_string()));
    }
    Ok(groups)
}

fn split_top_level_commas(selector: &str) -> Result<Vec<String>> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut in_brackets = false;
    let mut quote: Option<char> = None;

    for ch in selector.chars() {
        match quote {
            Some(q) => {
                current.push(ch);
                if ch == q {
                    quote = None;
                }
            }
            None => match ch {
                '\'' | '"' => {
                    quote = Some(ch);
                    current.push(ch);
                }
                '[' => {
                    in_brackets = true;
                    current.push(ch);
                }
                ']' => {
                    in_brackets = false;
                    current.push(ch);
                }
                ',' if !in_brackets => {
                    out.push(std::mem::take(&mut current));
                }
                _ => current.push(ch),
            },
        }
    }
    if quote.is_some() || in_brackets {
        return Err(Error::UnsupportedSelector(selector.to_string()));
    }
    out.push(current);

    let trimmed: Vec<String> = out.into_iter().map(|s| s.trim().to_string()).collect();
    if trimmed.iter().any(|s| s.is_empty()) {
        return Err(Error::UnsupportedSelector(selector.to_string()));
    }
    Ok(trimmed)
}

fn parse_selector_chain(chain: &str) -> Result<Vec<SelectorPart>> {
    let mut parts: Vec<SelectorPart> = Vec::new();
    let mut pending_child = false;

    for token in tokenize_chain(chain)? {
        if token == ">" {
            if parts.is_empty() || pending_child {
                return Err(Error::UnsupportedSelector(chain.to_string()));
            }
            pending_child = true;
            continue;
        }

        let step = parse_compound_step(&token)
            .ok_or_else(|| Error::UnsupportedSelector(chain.to_string()))?;
        let combinator = if pending_child {
            Combinator::Child
        } else {
            Combinator::Descendant
        };
        parts.push(SelectorPart { combinator, step });
        pending_child = false;
    }

    if parts.is_empty() || pending_child {
        return Err(Error::UnsupportedSelector(chain.to_string()));
    }
    Ok(parts)
}

fn tokenize_chain(chain: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut in_brackets = false;

    for ch in chain.chars() {
        match quote {
            Some(q) => {
                current.push(ch);
                if ch == q {
                    quote = None;
                }
            }
            None => match ch {
                '\'' | '"' => {
                    quote = Some(ch);
                    current.push(ch);
                }
                '[' => {
                    in_brackets = true;
                    current.push(ch);
                }
                ']' => {
                    in_brackets = false;
                    current.push(ch);
                }
                '>' if !in_brackets => {
                    if !current.is_empty() {
                        tokens.push(std::mem::take(&mut current));
                    }
                    tokens.push(">".to_string());
                }
                c if c.is_whitespace() && !in_brackets => {
                    if !current.is_empty() {
                        tokens.push(std::mem::take(&mut current));
                    }
                }
                _ => current.push(ch),
            },
        }
    }
    if quote.is_some() || in_brackets {
        return Err(Error::UnsupportedSelector(chain.to_string()));
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}

fn parse_compound_step(compound: &str) -> Option<SelectorStep> {
    let mut step = SelectorStep::default();
    let chars: Vec<char> = compound.chars().collect();
    let mut i = 0usize;

    while i < chars.len() {
        match chars[i] {
            '*' => {
                step.universal = true;
                i += 1;
            }
            '#' => {
                let (ident, next) = parse_ident(&chars, i + 1)?;
                step.id = Some(ident);
                i = next;
            }
            '.' => {
                let (ident, next) = parse_ident(&chars, i + 1)?;
                step.classes.push(ident);
                i = next;
            }
            '[' => {
                let close = chars[i..].iter().position(|&c| c == ']')? + i;
                let body: String = chars[i + 1..close].iter().collect();
                step.attrs.push(parse_attr_condition(body.trim())?);
                i = close + 1;
            }
            c if is_ident_char(c) => {
                let (ident, next) = parse_ident(&chars, i)?;
                if step.tag.is_some() {
                    return None;
                }
                step.tag = Some(ident.to_ascii_lowercase());
                i = next;
            }
            _ => return None,
        }
    }

    if step.is_empty() { None } else { Some(step) }
}

fn parse_attr_condition(body: &str) -> Option<AttrCondition> {
    if body.is_empty() {
        return None;
    }
    let Some((key, value)) = body.split_once('=') else {
        let key = body.trim().to_ascii_lowercase();
        if key.is_empty() {
            return None;
        }
        return Some(AttrCondition::Exists { key });
    };

    let key = key.trim().to_ascii_lowercase();
    if key.is_empty() {
        return None;
    }
    let mut value = value.trim();
    if (value.starts_with('"') && value.ends_with('"') && value.len() >= 2)
        || (value.starts_with('\'') && value.ends_with('\'') && value.len() >= 2)
    {
        value = &value[1..value.len() - 1];
    }
    Some(AttrCondition::Eq {
        key,
        value: value.to_string(),
    })
}

fn parse_ident(chars: &[char], start: usize) -> Option<(String, usize)> {
    let mut i = start;
    let mut out = String::new();
    while i < chars.len() && is_ident_char(chars[i]) {
        out.push(chars[i]);
        i += 1;
    }
    if out.is_empty() { None } else { Some((out, i)) }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}
