/// Sanitizes admin-authored text before it is stored.
///
/// Uses ammonia's whitelist: harmless formatting tags (`<b>`, `<sub>`, `<p>`)
/// survive, while `<script>`, `<iframe>` and event-handler attributes are
/// stripped. Plain text such as `2x + 5 = 15` passes through untouched,
/// apart from entity-escaping of `<` and `>`.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

pub fn clean_optional(input: Option<String>) -> Option<String> {
    input.map(|s| clean_html(&s))
}
