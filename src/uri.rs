//! URI canonicalization and resolution.
//!
//! Thin layer over the `url` crate. Schema identifiers are frequently
//! relative (`schema.json`, `#foo`, or the empty string for anonymous
//! documents), which `url::Url` cannot represent on its own, so relative
//! identifiers are resolved against a placeholder origin and stripped back.

use percent_encoding::percent_decode_str;
use url::Url;

use crate::pointer::Pointer;

const PLACEHOLDER: &str = "https://schema-frame.invalid/";
const PLACEHOLDER_ORIGIN: &str = "https://schema-frame.invalid";

/// Whether `text` is an absolute URI (has a scheme).
pub fn is_absolute(text: &str) -> bool {
    Url::parse(text).is_ok()
}

/// Canonical form of a URI: normalized scheme, host, port and path, with an
/// empty trailing fragment removed.
pub fn canonicalize(text: &str) -> String {
    match Url::parse(text) {
        Ok(url) => strip_empty_fragment(url.as_str()),
        Err(_) => canonicalize_relative(text),
    }
}

fn canonicalize_relative(text: &str) -> String {
    let Ok(placeholder) = Url::parse(PLACEHOLDER) else {
        return text.to_string();
    };
    match placeholder.join(text) {
        Ok(url) => strip_empty_fragment(&unplace(url.as_str(), text.starts_with('/'))),
        Err(_) => text.to_string(),
    }
}

fn unplace(text: &str, keep_slash: bool) -> String {
    let prefix = if keep_slash {
        PLACEHOLDER_ORIGIN
    } else {
        PLACEHOLDER
    };
    match text.strip_prefix(prefix) {
        Some(rest) => rest.to_string(),
        None => text.to_string(),
    }
}

fn strip_empty_fragment(text: &str) -> String {
    text.strip_suffix('#').unwrap_or(text).to_string()
}

/// Resolve `reference` against `base`, returning the canonical result.
///
/// An empty base leaves the reference as is (canonicalized). A relative base
/// yields a relative result.
pub fn resolve(base: &str, reference: &str) -> String {
    if is_absolute(reference) || base.is_empty() {
        return canonicalize(reference);
    }

    if let Ok(base_url) = Url::parse(base) {
        return match base_url.join(reference) {
            Ok(url) => strip_empty_fragment(url.as_str()),
            Err(_) => canonicalize(reference),
        };
    }

    let Ok(placeholder) = Url::parse(PLACEHOLDER) else {
        return canonicalize(reference);
    };
    let resolved = placeholder
        .join(base)
        .and_then(|relative_base| relative_base.join(reference));
    match resolved {
        Ok(url) => strip_empty_fragment(&unplace(url.as_str(), base.starts_with('/'))),
        Err(_) => canonicalize(reference),
    }
}

/// Split a URI at its fragment: `("https://a/b", Some("frag"))`.
pub fn split_fragment(text: &str) -> (&str, Option<&str>) {
    match text.find('#') {
        Some(index) => (&text[..index], Some(&text[index + 1..])),
        None => (text, None),
    }
}

/// The URI without its fragment.
pub fn without_fragment(text: &str) -> &str {
    split_fragment(text).0
}

/// Append a fragment to a fragment-less URI.
pub fn with_fragment(base: &str, fragment: &str) -> String {
    canonicalize(&format!("{}#{}", without_fragment(base), fragment))
}

/// The URI addressing `pointer` inside the resource `base`.
pub fn with_pointer(base: &str, pointer: &Pointer) -> String {
    if pointer.is_root() {
        return canonicalize(without_fragment(base));
    }
    with_fragment(base, &pointer.to_string())
}

/// Decode a URI fragment into a JSON Pointer, if it is one.
pub fn fragment_pointer(fragment: &str) -> Option<Pointer> {
    let decoded = percent_decode_str(fragment).decode_utf8_lossy();
    if decoded.is_empty() || decoded.starts_with('/') {
        Pointer::parse(&decoded).ok()
    } else {
        None
    }
}
