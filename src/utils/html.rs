// src/utils/html.rs

/// Sanitizes lesson HTML with ammonia's allowlist.
///
/// Safe markup (<p>, <b>, <pre>, <code>, ...) is preserved; <script>, <iframe>
/// and event-handler attributes such as `onclick` are stripped along with the
/// contents of <script>.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
