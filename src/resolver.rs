//! Import resolver - flattens the entry fragment into one program string.
//!
//! Scans the entry fragment line by line for `import "target"` lines and
//! splices in either the named sibling fragment's code or cached remote
//! dependency text. Resolution is single-level: import lines inside
//! inlined code are left as raw text.
//!
//! This is a pattern scanner, not a parser. Comment detection is
//! heuristic - an import-shaped line inside a string literal, or comment
//! markers inside strings, can be misjudged. That imprecision never
//! crashes a build; it can only under- or over-resolve an import.

use crate::cache::DependencyCache;
use crate::fragment::FragmentSet;
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Whole-line import shape: indentation, any prefix, `import`, one space,
/// a quoted target with nothing after the closing quote. The quote pair is
/// checked for equality separately (the regex crate has no backreferences).
static IMPORT_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^([ \t]*)(.*?)import (["'`])(.+)(["'`])$"#).expect("import pattern compiles")
});

/// True when `target` parses as an absolute http/https URL.
pub fn is_remote_url(target: &str) -> bool {
    match Url::parse(target) {
        Ok(url) => matches!(url.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

/// Rewrite the entry fragment's import lines, leaving everything else
/// byte-for-byte intact. Remote targets that are not yet cached are
/// registered with `cache` for asynchronous fetch and contribute no code.
pub fn resolve_imports(set: &FragmentSet, cache: &DependencyCache) -> String {
    let entry = set.entry();
    let mut out = String::with_capacity(entry.code.len());
    let mut in_block_comment = false;

    for segment in entry.code.split_inclusive('\n') {
        let (line, terminated) = match segment.strip_suffix('\n') {
            Some(line) => (line, true),
            None => (segment, false),
        };

        // Import lines need a terminator, must not sit inside a block
        // comment, and must not start with a comment marker.
        let candidate = terminated
            && !in_block_comment
            && !line.starts_with("//")
            && !line.starts_with("/*");

        if candidate {
            if let Some(target) = parse_import_line(line) {
                out.push_str(&substitute(set, cache, &target));
                in_block_comment = scan_block_comment(line, in_block_comment);
                continue;
            }
        }

        in_block_comment = scan_block_comment(line, in_block_comment);
        out.push_str(segment);
    }

    out
}

/// Extract the import target from one line, if it has the import shape.
fn parse_import_line(line: &str) -> Option<String> {
    let caps = IMPORT_LINE.captures(line)?;
    // Opening and closing quote must be the same character.
    if caps.get(3)?.as_str() != caps.get(5)?.as_str() {
        return None;
    }
    Some(caps.get(4)?.as_str().to_string())
}

fn substitute(set: &FragmentSet, cache: &DependencyCache, target: &str) -> String {
    if is_remote_url(target) {
        return match cache.lookup(target) {
            Some(dep) if dep.fetched => dep.code.unwrap_or_default(),
            _ => {
                // Pending is not an error; a later rebuild will see the text.
                cache.ensure_fetching(target);
                String::new()
            }
        };
    }

    let name = target.strip_suffix(".js").unwrap_or(target);
    match set.sibling(name) {
        Some(fragment) => format!("{}\n", fragment.code),
        // Deferred error: building never fails, running does.
        None => format!("throw new Error('Fragment {name} not found')\n"),
    }
}

/// Advance block-comment state across one line. Comment markers inside
/// string literals are misjudged; accepted imprecision.
fn scan_block_comment(line: &str, mut in_comment: bool) -> bool {
    let mut rest = line;
    loop {
        let marker = if in_comment { "*/" } else { "/*" };
        match rest.find(marker) {
            Some(i) => {
                in_comment = !in_comment;
                rest = &rest[i + marker.len()..];
            }
            None => return in_comment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::Fragment;

    fn set(fragments: &[(&str, &str)]) -> FragmentSet {
        FragmentSet::new(
            fragments
                .iter()
                .map(|(name, code)| Fragment::new(*name, *code))
                .collect(),
        )
        .unwrap()
    }

    fn resolve(fragments: &[(&str, &str)]) -> String {
        resolve_imports(&set(fragments), &DependencyCache::new())
    }

    #[test]
    fn test_inlines_sibling_followed_by_newline() {
        let bundle = resolve(&[
            ("index", "import \"helpers\"\nlog(double(2))"),
            ("helpers", "function double(x){return x*2}"),
        ]);
        assert_eq!(bundle, "function double(x){return x*2}\nlog(double(2))");
    }

    #[test]
    fn test_preserves_surrounding_code_and_order() {
        let bundle = resolve(&[
            ("index", "const a = 1\nimport \"b\"\nconst c = 3\n"),
            ("b", "const b = 2"),
        ]);
        assert_eq!(bundle, "const a = 1\nconst b = 2\nconst c = 3\n");
    }

    #[test]
    fn test_quote_variants() {
        for quote in ["\"", "'", "`"] {
            let entry = format!("import {quote}helpers{quote}\n");
            let bundle = resolve(&[("index", &entry), ("helpers", "ok()")]);
            assert_eq!(bundle, "ok()\n");
        }
    }

    #[test]
    fn test_mismatched_quotes_not_an_import() {
        let bundle = resolve(&[("index", "import \"helpers'\n"), ("helpers", "ok()")]);
        assert_eq!(bundle, "import \"helpers'\n");
    }

    #[test]
    fn test_strips_js_suffix_for_local_lookup() {
        let bundle = resolve(&[("index", "import 'helpers.js'\n"), ("helpers", "ok()")]);
        assert_eq!(bundle, "ok()\n");
    }

    #[test]
    fn test_missing_fragment_becomes_deferred_throw() {
        let bundle = resolve(&[("index", "import \"helpers\"\n")]);
        assert_eq!(bundle, "throw new Error('Fragment helpers not found')\n");
    }

    #[test]
    fn test_entry_is_not_importable() {
        let bundle = resolve(&[("index", "import \"index\"\n")]);
        assert!(bundle.contains("Fragment index not found"));
    }

    #[test]
    fn test_indented_import_with_prefix() {
        let bundle = resolve(&[
            ("index", "  { import \"helpers\"\n}\n"),
            ("helpers", "ok()"),
        ]);
        assert_eq!(bundle, "ok()\n}\n");
    }

    #[test]
    fn test_line_comment_is_skipped() {
        let entry = "// import \"helpers\"\nlog(1)\n";
        let bundle = resolve(&[("index", entry), ("helpers", "ok()")]);
        assert_eq!(bundle, entry);
    }

    #[test]
    fn test_block_comment_is_skipped() {
        let entry = "/*\nimport \"helpers\"\n*/\nlog(1)\n";
        let bundle = resolve(&[("index", entry), ("helpers", "ok()")]);
        assert_eq!(bundle, entry);
    }

    #[test]
    fn test_import_after_block_comment_closes() {
        let bundle = resolve(&[
            ("index", "/* note */\nimport \"helpers\"\n"),
            ("helpers", "ok()"),
        ]);
        assert_eq!(bundle, "/* note */\nok()\n");
    }

    #[test]
    fn test_unterminated_final_line_is_not_an_import() {
        let bundle = resolve(&[("index", "log(1)\nimport \"helpers\""), ("helpers", "ok()")]);
        assert_eq!(bundle, "log(1)\nimport \"helpers\"");
    }

    #[test]
    fn test_single_level_only() {
        // The inlined fragment's own import line stays unresolved.
        let bundle = resolve(&[
            ("index", "import \"a\"\n"),
            ("a", "import \"b\"\na()"),
            ("b", "b()"),
        ]);
        assert_eq!(bundle, "import \"b\"\na()\n");
    }

    #[test]
    fn test_remote_pending_substitutes_empty_and_registers() {
        let cache = DependencyCache::new();
        let set = set(&[("index", "import \"https://example.com/lib.js\"\nlog(1)\n")]);

        let bundle = resolve_imports(&set, &cache);
        assert_eq!(bundle, "log(1)\n");

        let dep = cache.lookup("https://example.com/lib.js").unwrap();
        assert!(!dep.fetched);
    }

    #[test]
    fn test_remote_fetched_substitutes_code() {
        let cache = DependencyCache::new();
        cache.on_fetched("https://example.com/lib.js", "function lib() {}\n".to_string());
        let set = set(&[("index", "import \"https://example.com/lib.js\"\nlib()\n")]);

        let bundle = resolve_imports(&set, &cache);
        assert_eq!(bundle, "function lib() {}\nlib()\n");
    }

    #[test]
    fn test_remote_registered_once_across_rebuilds() {
        let cache = DependencyCache::new();
        let set = set(&[("index", "import \"https://example.com/lib.js\"\n")]);

        // Three keystroke-driven rebuilds before the fetch resolves.
        for _ in 0..3 {
            resolve_imports(&set, &cache);
        }
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_is_remote_url() {
        assert!(is_remote_url("https://example.com/lib.js"));
        assert!(is_remote_url("http://localhost:3000/a.js"));
        assert!(!is_remote_url("helpers"));
        assert!(!is_remote_url("ftp://example.com/a.js"));
        assert!(!is_remote_url("./relative.js"));
    }
}
