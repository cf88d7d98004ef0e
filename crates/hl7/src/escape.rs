//! Escaping of HL7 reserved delimiter characters.

/// Escape the four reserved delimiter characters in a free-text field value.
///
/// `|` → `\F\`, `^` → `\S\`, `&` → `\T\`, `~` → `\R\`. Applied to every
/// free-text value inserted into a segment so embedded delimiters cannot
/// shift field or component boundaries. There is no matching unescape on the
/// decode path; decoded values carry the escape sequences verbatim.
pub fn escape_field(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '|' => out.push_str("\\F\\"),
            '^' => out.push_str("\\S\\"),
            '&' => out.push_str("\\T\\"),
            '~' => out.push_str("\\R\\"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_all_reserved_characters() {
        assert_eq!(escape_field("a|b^c&d~e"), "a\\F\\b\\S\\c\\T\\d\\R\\e");
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert_eq!(escape_field(""), "");
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(escape_field("Doe"), "Doe");
    }

    #[test]
    fn escaped_value_survives_a_pipe_split() {
        // A field holding all four reserved characters must not change the
        // field count of the segment it is embedded in.
        let segment = format!("NK1||{}|BRO", escape_field("A|B^C&D~E"));
        let fields: Vec<&str> = segment.split('|').collect();
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[3], "BRO");
    }
}
