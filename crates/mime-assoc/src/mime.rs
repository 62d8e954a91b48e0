//! MIME resolver capability and the canonicalization quirks applied on top of it.

/// Root of nearly every type hierarchy. Never recorded as a parent.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Pseudo-types used for URL scheme handlers rather than file contents.
pub const SCHEME_HANDLER_GROUP: &str = "x-scheme-handler";

const PKCS12: &str = "application/pkcs12";
const X_PKCS12: &str = "application/x-pkcs12";

/// Read access to a MIME type database.
pub trait MimeResolver {
    /// Resolve aliases and return the canonical name, or `None` if unknown.
    fn canonicalize(&self, raw: &str) -> Option<String>;

    fn is_valid(&self, raw: &str) -> bool {
        self.canonicalize(raw).is_some()
    }

    /// All ancestors of a canonical type, nearest first.
    fn ancestors(&self, canonical: &str) -> Vec<String>;

    /// Specific icon name, e.g. `image-png`.
    fn icon_name(&self, canonical: &str) -> String;

    /// Generic icon name, e.g. `image-x-generic`.
    fn generic_icon_name(&self, canonical: &str) -> String;

    /// Human readable text for lists.
    fn display_label(&self, canonical: &str) -> String;
}

/// Canonicalize a raw type token, including the fixes the database itself
/// does not apply.
pub fn resolve_type(resolver: &dyn MimeResolver, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let lowered = raw.to_ascii_lowercase();
    if lowered == PKCS12 {
        return Some(X_PKCS12.to_string());
    }

    if is_scheme_handler(&lowered) {
        return Some(resolver.canonicalize(&lowered).unwrap_or(lowered));
    }

    let canonical = resolver.canonicalize(raw)?;
    if canonical == PKCS12 {
        return Some(X_PKCS12.to_string());
    }
    Some(canonical)
}

/// Canonical name for comparisons where unknown names must still match
/// themselves (mimeapps.list keys).
pub fn resolve_type_or_raw(resolver: &dyn MimeResolver, raw: &str) -> String {
    resolve_type(resolver, raw).unwrap_or_else(|| raw.trim().to_string())
}

/// Split `group/subtype`. Anything without exactly one separator is rejected.
pub fn split_type(canonical: &str) -> Option<(&str, &str)> {
    let (group, subtype) = canonical.split_once('/')?;
    let (group, subtype) = (group.trim(), subtype.trim());
    if group.is_empty() || subtype.is_empty() || subtype.contains('/') {
        return None;
    }
    Some((group, subtype))
}

pub fn is_scheme_handler(name: &str) -> bool {
    split_type(name).is_some_and(|(group, _)| group == SCHEME_HANDLER_GROUP)
}

/// Ancestors up to, not including, the octet-stream root.
pub fn ancestors_before_octet_stream(resolver: &dyn MimeResolver, canonical: &str) -> Vec<String> {
    resolver
        .ancestors(canonical)
        .into_iter()
        .take_while(|parent| parent != OCTET_STREAM)
        .collect()
}
