/// Strips unsafe markup from free text (descriptions, review comments) with `ammonia`.
///
/// Safe inline tags such as `<b>` survive; `<script>` and its content, event-handler
/// attributes and the like are removed. The result is trimmed.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input).trim().to_string()
}
