/// Share-class roots that arrive without punctuation in OCC identifiers.
const CANONICAL_ROOTS: [(&str, &str); 2] = [
    ("BRKB", "BRK.B"),
    ("BRKA", "BRK.A"),
];

/// Map a decoded root onto its canonical dotted spelling.
pub fn canonical_root(root: &str) -> String {
    CANONICAL_ROOTS
        .iter()
        .find(|(raw, _)| *raw == root)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or_else(|| root.to_string())
}

/// Spellings to try against the chain endpoint, in preference order.
///
/// The input always comes first. Undotted share-class roots add their
/// canonical dotted form; dotted roots add the slash and hyphen renderings.
pub fn aliases(root: &str) -> Vec<String> {
    let mut candidates = vec![root.to_string()];
    let mut push = |candidate: String| {
        if !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    };

    let canonical = canonical_root(root);
    if canonical != root {
        push(canonical);
    } else if root.contains('.') {
        push(root.replace('.', "/"));
        push(root.replace('.', "-"));
    }
    candidates
}

/// Symbol used in the per-symbol quotes path: canonical root with `/` and `-`
/// normalised to `.`.
pub fn quote_symbol(root: &str) -> String {
    canonical_root(root).replace(['/', '-'], ".")
}

/// Keys a fundamentals response may be filed under, in lookup order.
pub fn fundamentals_keys(root: &str) -> Vec<String> {
    let path_symbol = quote_symbol(root);
    let spellings = [
        root.to_string(),
        root.to_uppercase(),
        path_symbol.clone(),
        path_symbol.to_uppercase(),
        root.replace('/', "."),
        root.replace('-', "."),
    ];
    let mut keys: Vec<String> = Vec::with_capacity(spellings.len());
    for key in spellings {
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    keys
}
