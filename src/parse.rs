custom_error::custom_error! {pub ParseError
    InvalidValue { value: String, line: usize } = "could not parse value {value:?} on line {line}",
    WrongColumnCount { expected: usize, found: usize, line: usize } = "expected {expected} columns on line {line}, found {found}",
}

/// Split a whitespace-delimited line into numeric columns.
/// Tokens listed in `missing` become `None`.
pub fn parse_columns(
    line: &str,
    line_number: usize,
    missing: &[&str],
) -> Result<Vec<Option<f64>>, ParseError> {
    let mut values = vec![];
    for token in line.split_whitespace() {
        if missing.contains(&token) {
            values.push(None);
        } else {
            match token.parse::<f64>() {
                Ok(value) if value.is_finite() => values.push(Some(value)),
                _ => {
                    return Err(ParseError::InvalidValue {
                        value: token.to_owned(),
                        line: line_number,
                    });
                }
            }
        }
    }
    Ok(values)
}

/// Like `parse_columns`, but requires exactly `expected` columns.
pub fn parse_exact_columns(
    line: &str,
    line_number: usize,
    expected: usize,
    missing: &[&str],
) -> Result<Vec<Option<f64>>, ParseError> {
    let values = parse_columns(line, line_number, missing)?;
    if values.len() != expected {
        return Err(ParseError::WrongColumnCount {
            expected,
            found: values.len(),
            line: line_number,
        });
    }
    Ok(values)
}
