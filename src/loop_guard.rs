//! Loop guard - rewrites loops so runaway iteration raises instead of
//! hanging the realm.
//!
//! Every `for (...) {`, `while (...) {` or `do {` whose opening brace sits
//! on the same textual line gets its own counter, declared just before the
//! head and checked as the first statement of the body. Nothing else about
//! the loop changes: a body entered at most `max_iterations` times runs to
//! completion, the entry after that raises.
//!
//! Known gap: a loop header spread over multiple lines before its opening
//! brace is not recognized and stays unguarded.

use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use std::collections::HashSet;

/// Iteration cap applied when the caller does not pick one.
pub const DEFAULT_MAX_ITERATIONS: u32 = 1000;

/// Fixed diagnostic raised by injected guards.
pub const LOOP_LIMIT_MESSAGE: &str = "Loop exceeded the iteration limit";

/// Loop heads with the opening brace on the same line.
static LOOP_HEAD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"for *\(.*\{|while *\(.*\{|do *\{").expect("loop pattern compiles"));

/// Rewrite every recognized loop in `code` to raise once its body has been
/// entered more than `max_iterations` times.
pub fn instrument_loops(code: &str, max_iterations: u32) -> String {
    let mut used = HashSet::new();
    LOOP_HEAD
        .replace_all(code, |caps: &regex::Captures<'_>| {
            let head = &caps[0];
            let counter = fresh_counter(code, &mut used);
            format!(
                "let {counter} = 0\n{head}\nif (++{counter} > {max_iterations}) {{ throw new Error('{LOOP_LIMIT_MESSAGE}') }}\n"
            )
        })
        .into_owned()
}

/// Draw a counter identifier that collides neither with earlier draws nor
/// with anything already spelled out in the source text.
fn fresh_counter(code: &str, used: &mut HashSet<u32>) -> String {
    let mut rng = rand::thread_rng();
    loop {
        let id: u32 = rng.gen_range(0..10_000);
        let name = format!("__loop{id}");
        if used.contains(&id) || code.contains(&name) {
            continue;
        }
        used.insert(id);
        return name;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counters(code: &str) -> Vec<String> {
        let decl = Regex::new(r"let (__loop\d+) = 0").unwrap();
        decl.captures_iter(code).map(|c| c[1].to_string()).collect()
    }

    #[test]
    fn test_guards_for_loop() {
        let out = instrument_loops("for (let i = 0; i < 3; i++) {\n}\n", 1000);
        let names = counters(&out);
        assert_eq!(names.len(), 1);
        let counter = &names[0];

        // Declaration before the head, guard as the first body statement.
        let head_at = out.find("for (let i = 0; i < 3; i++) {").unwrap();
        let decl_at = out.find(&format!("let {counter} = 0")).unwrap();
        let guard_at = out.find(&format!("if (++{counter} > 1000)")).unwrap();
        assert!(decl_at < head_at);
        assert!(head_at < guard_at);
        assert!(out.contains(LOOP_LIMIT_MESSAGE));
    }

    #[test]
    fn test_guards_while_and_do() {
        let out = instrument_loops("while (x) {\n}\ndo {\n} while (x)\n", 10);
        assert_eq!(counters(&out).len(), 2);
        // Loop heads and conditions survive untouched.
        assert!(out.contains("while (x) {"));
        assert!(out.contains("do {"));
        assert!(out.contains("} while (x)"));
    }

    #[test]
    fn test_distinct_counters_for_sibling_loops() {
        let code = "for (let i = 0; i < 2; i++) {\n}\nfor (let j = 0; j < 2; j++) {\n}\n";
        let names = counters(&instrument_loops(code, 1000));
        assert_eq!(names.len(), 2);
        assert_ne!(names[0], names[1]);
    }

    #[test]
    fn test_distinct_counters_for_nested_loops() {
        let code = "for (let i = 0; i < 2; i++) {\n  for (let j = 0; j < 2; j++) {\n  }\n}\n";
        let names = counters(&instrument_loops(code, 1000));
        assert_eq!(names.len(), 2);
        assert_ne!(names[0], names[1]);
    }

    #[test]
    fn test_counter_avoids_identifiers_already_in_source() {
        // Exhaust every suffix but one; the draw must land on the free one.
        let mut taken = String::new();
        for id in 0..10_000u32 {
            if id != 4242 {
                taken.push_str(&format!("__loop{id} "));
            }
        }
        let code = format!("{taken}\nwhile (x) {{\n}}\n");
        let names = counters(&instrument_loops(&code, 1000));
        assert_eq!(names, vec!["__loop4242".to_string()]);
    }

    #[test]
    fn test_cap_is_injected_verbatim() {
        let out = instrument_loops("while (x) {\n}\n", 5);
        assert!(out.contains("> 5)"));
    }

    #[test]
    fn test_multiline_header_stays_unguarded() {
        let code = "for (let i = 0;\n     i < 3;\n     i++)\n{\n}\n";
        let out = instrument_loops(code, 1000);
        assert_eq!(out, code);
    }

    #[test]
    fn test_destructuring_head_matched_to_last_brace() {
        let out = instrument_loops("for (const {a} of xs) {\n}\n", 1000);
        assert_eq!(counters(&out).len(), 1);
        assert!(out.contains("for (const {a} of xs) {"));
    }

    #[test]
    fn test_loop_free_code_unchanged() {
        let code = "const x = format(1)\nlog(x)\n";
        assert_eq!(instrument_loops(code, 1000), code);
    }
}
