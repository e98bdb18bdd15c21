use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::borrow::Cow;

pub mod memory_estimation;

const QNAME_ENCODE_SET: &AsciiSet = &CONTROLS.add(b' ').add(b':').add(b'%');

/// Encodes a namespace/name pair into the `ns::name` qualified form used in match output.
pub fn join_qname(ns: &str, name: &str) -> String {
    let mut result = String::with_capacity(ns.len() + name.len() + 2);
    if !ns.is_empty() {
        let encoded_anno_ns: Cow<str> = utf8_percent_encode(ns, QNAME_ENCODE_SET).into();
        result.push_str(&encoded_anno_ns);
        result.push_str("::");
    }
    let encoded_anno_name: Cow<str> = utf8_percent_encode(name, QNAME_ENCODE_SET).into();
    result.push_str(&encoded_anno_name);
    result
}

/// Wraps a user-supplied regex so that it must match the whole candidate string.
pub fn regex_full_match(pattern: &str) -> String {
    let mut full_match_pattern = String::new();
    full_match_pattern.push_str(r"\A(");
    full_match_pattern.push_str(pattern);
    full_match_pattern.push_str(r")\z");
    full_match_pattern
}

/// Extracts a literal prefix that every match of `pattern` must start with, if any.
///
/// Used to narrow a full-text scan to a lexicographic range instead of testing every
/// interned string against the compiled regex.
pub fn regex_prefix(pattern: &str) -> Option<String> {
    use regex_syntax::ParserBuilder;

    let hir = ParserBuilder::new().build().parse(pattern).ok()?;
    let mut prefix = Vec::new();
    collect_literal_prefix(&hir, &mut prefix);
    if prefix.is_empty() {
        None
    } else {
        String::from_utf8(prefix).ok()
    }
}

fn collect_literal_prefix(hir: &regex_syntax::hir::Hir, out: &mut Vec<u8>) {
    use regex_syntax::hir::HirKind;
    match hir.kind() {
        HirKind::Literal(regex_syntax::hir::Literal(bytes)) => {
            out.extend_from_slice(bytes);
        }
        HirKind::Concat(parts) => {
            for (i, p) in parts.iter().enumerate() {
                let before = out.len();
                collect_literal_prefix(p, out);
                // Only the first part can extend a *leading* prefix; if it didn't
                // consume the whole sub-expression as a fixed literal, stop here.
                if i == 0 && !matches!(p.kind(), HirKind::Literal(_)) {
                    out.truncate(before);
                    break;
                }
                if i > 0 && !matches!(p.kind(), HirKind::Literal(_)) {
                    break;
                }
            }
        }
        _ => {}
    }
}

/// Computes the exclusive upper bound of the lexicographic range sharing `prefix`.
pub fn prefix_upper_bound(prefix: &str) -> Option<String> {
    let mut chars: Vec<char> = prefix.chars().collect();
    while let Some(last) = chars.pop() {
        if let Some(next) = char::from_u32(last as u32 + 1) {
            chars.push(next);
            return Some(chars.into_iter().collect());
        }
    }
    None
}
