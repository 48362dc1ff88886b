/// Replace characters that are unsafe in file names with `_`.
pub fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() || c.is_whitespace() => '_',
            c => c,
        })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "_".to_owned(),
        _ => cleaned,
    }
}

/// `gradient_<id>_<name>.png`
pub fn poster_file_name(id: i64, name: &str) -> String {
    format!("gradient_{id}_{}.png", sanitize_name(name))
}

/// `gradient_<id>_<name>_<uuid>.png`, unique per call.
pub fn unique_poster_file_name(id: i64, name: &str) -> String {
    format!(
        "gradient_{id}_{}_{}.png",
        sanitize_name(name),
        uuid::Uuid::new_v4()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_path_separators_and_keeps_unicode() {
        assert_eq!(sanitize_name("朱红/橙"), "朱红_橙");
        assert_eq!(sanitize_name("a b:c"), "a_b_c");
        assert_eq!(sanitize_name(".."), "_");
        assert_eq!(sanitize_name(""), "_");
    }

    #[test]
    fn names_follow_the_gradient_pattern() {
        assert_eq!(poster_file_name(3, "海蓝"), "gradient_3_海蓝.png");

        let a = unique_poster_file_name(3, "x");
        let b = unique_poster_file_name(3, "x");
        assert_ne!(a, b);
        assert!(a.starts_with("gradient_3_x_") && a.ends_with(".png"));
        // Hyphenated v4 uuid.
        assert_eq!(a.len(), "gradient_3_x_".len() + 36 + ".png".len());
    }
}
