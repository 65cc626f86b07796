/// Replace every occurrence of each forbidden word with a `*` run of
/// the same length.
///
/// Words apply sequentially in slice order, plain substring
/// replacement per word. When one word is a substring of another (or
/// of an already-inserted mask run) the outcome depends on that
/// order; callers that need a stable outcome fix the word order in
/// configuration.
pub fn mask_words(input: &str, words: &[String]) -> String {
    let mut out = input.to_string();
    for word in words {
        if word.is_empty() {
            continue;
        }
        if out.contains(word.as_str()) {
            out = out.replace(word.as_str(), &"*".repeat(word.len()));
        }
    }
    out
}
