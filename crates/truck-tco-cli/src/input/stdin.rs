use serde::de::DeserializeOwned;
use std::io::{self, Read};

/// Deserialize JSON piped on stdin.
/// Returns None if stdin is a TTY (interactive) or the pipe is blank.
pub fn read_stdin<T: DeserializeOwned>() -> Result<Option<T>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    parse_piped(&buffer)
}

fn parse_piped<T: DeserializeOwned>(buffer: &str) -> Result<Option<T>, Box<dyn std::error::Error>> {
    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(trimmed)
        .map(Some)
        .map_err(|e| format!("Invalid JSON on stdin: {e}").into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use truck_tco_core::pipeline::TcoRequest;
    use truck_tco_core::Technology;

    #[test]
    fn test_blank_pipe_is_none() {
        assert!(parse_piped::<TcoRequest>(" \n\t").unwrap().is_none());
    }

    #[test]
    fn test_piped_request_parsed() {
        let request: TcoRequest = parse_piped(r#" {"technologies": ["OC-BEV"]} "#)
            .unwrap()
            .unwrap();
        assert_eq!(request.technologies, vec![Technology::OcBev]);
    }

    #[test]
    fn test_malformed_pipe_names_stdin() {
        let err = parse_piped::<TcoRequest>("{ technologies").unwrap_err();
        assert!(err.to_string().contains("stdin"), "{err}");
    }
}
