/// Expand `${VAR}` placeholders in a raw TOML string
///
/// Supports `${VAR:-fallback}` to substitute a default when the variable
/// is unset. Expansion happens on the raw text before deserialization so
/// config structs stay plain `String`/`SecretString`. TOML comment lines
/// are passed through untouched.
pub fn expand_env(input: &str) -> Result<String, String> {
    let mut output = String::with_capacity(input.len());

    for (i, line) in input.lines().enumerate() {
        if i > 0 {
            output.push('\n');
        }

        if line.trim_start().starts_with('#') {
            output.push_str(line);
            continue;
        }

        expand_line(line, &mut output)?;
    }

    if input.ends_with('\n') {
        output.push('\n');
    }

    Ok(output)
}

/// Expand placeholders in a single line
fn expand_line(line: &str, output: &mut String) -> Result<(), String> {
    let mut rest = line;

    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}') else {
            return Err(format!("unterminated placeholder in `{line}`"));
        };

        output.push_str(&rest[..start]);
        let inner = &rest[start + 2..start + end];

        let (name, default) = match inner.split_once(":-") {
            Some((name, default)) => (name, Some(default)),
            None => (inner, None),
        };

        if name.is_empty() || !name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
            return Err(format!("invalid environment variable name: `{name}`"));
        }

        match std::env::var(name) {
            Ok(value) => output.push_str(&value),
            Err(_) => match default {
                Some(default) => output.push_str(default),
                None => return Err(format!("environment variable not found: `{name}`")),
            },
        }

        rest = &rest[start + end + 1..];
    }

    output.push_str(rest);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_placeholders() {
        let input = "key = \"value\"";
        assert_eq!(expand_env(input).unwrap(), input);
    }

    #[test]
    fn single_variable() {
        temp_env::with_var("PRISM_TEST_KEY", Some("hello"), || {
            let result = expand_env("key = \"${PRISM_TEST_KEY}\"").unwrap();
            assert_eq!(result, "key = \"hello\"");
        });
    }

    #[test]
    fn multiple_variables_on_one_line() {
        let vars = [("PRISM_A", Some("a")), ("PRISM_B", Some("b"))];
        temp_env::with_vars(vars, || {
            let result = expand_env("key = \"${PRISM_A}-${PRISM_B}\"").unwrap();
            assert_eq!(result, "key = \"a-b\"");
        });
    }

    #[test]
    fn missing_variable_errors() {
        temp_env::with_var_unset("PRISM_MISSING", || {
            let err = expand_env("key = \"${PRISM_MISSING}\"").unwrap_err();
            assert!(err.contains("PRISM_MISSING"));
        });
    }

    #[test]
    fn default_used_when_unset() {
        temp_env::with_var_unset("PRISM_OPTIONAL", || {
            let result = expand_env("key = \"${PRISM_OPTIONAL:-fallback}\"").unwrap();
            assert_eq!(result, "key = \"fallback\"");
        });
    }

    #[test]
    fn default_ignored_when_set() {
        temp_env::with_var("PRISM_OPTIONAL", Some("actual"), || {
            let result = expand_env("key = \"${PRISM_OPTIONAL:-fallback}\"").unwrap();
            assert_eq!(result, "key = \"actual\"");
        });
    }

    #[test]
    fn comment_lines_are_untouched() {
        temp_env::with_var_unset("PRISM_MISSING", || {
            let input = "# key = \"${PRISM_MISSING}\"";
            assert_eq!(expand_env(input).unwrap(), input);
        });
    }

    #[test]
    fn unterminated_placeholder_errors() {
        let err = expand_env("key = \"${PRISM_BROKEN\"").unwrap_err();
        assert!(err.contains("unterminated"));
    }
}
