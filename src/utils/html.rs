/// Escape user text for embedding in a generated HTML document.
///
/// Uses `ammonia::clean_text`, which turns every markup-significant
/// character (and whitespace) into an entity, so the result is inert
/// inside element bodies and quoted attributes alike.
pub fn escape_text(input: &str) -> String {
    ammonia::clean_text(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markup_is_neutralized() {
        let out = escape_text("<script>alert('x')</script> & \"q\"");
        assert!(!out.contains('<'));
        assert!(!out.contains('>'));
        assert!(!out.contains('"'));
        assert!(out.contains("&lt;script&gt;"));
        assert!(out.contains("&amp;"));
    }
}
