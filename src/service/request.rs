use serde_json::Value;

use crate::foundation::core::Rgb;
use crate::paint::color::parse_hex_color;
use crate::paint::gradient::Direction;
use crate::render::pipeline::DEFAULT_BACKGROUND;

/// Why a request body was turned away before any lookup or rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// `id` or `markdown` absent, or the body is not a JSON object.
    MissingParameters,
    Invalid(String),
}

/// Validated body of `POST /generate_color_picture`.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    pub id: i64,
    pub markdown: String,
    pub background: Rgb,
    pub direction: Direction,
}

impl RenderRequest {
    pub fn from_body(body: &[u8]) -> Result<Self, RequestError> {
        let value: Value =
            serde_json::from_slice(body).map_err(|_| RequestError::MissingParameters)?;
        let Value::Object(map) = value else {
            return Err(RequestError::MissingParameters);
        };
        let (Some(id), Some(markdown)) = (map.get("id"), map.get("markdown")) else {
            return Err(RequestError::MissingParameters);
        };

        let id = parse_id(id)
            .ok_or_else(|| RequestError::Invalid("Invalid id format. Must be an integer.".into()))?;
        let markdown = match markdown {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            _ => return Err(RequestError::Invalid("markdown must be a string".into())),
        };

        let background = match map.get("background_color") {
            None | Some(Value::Null) => DEFAULT_BACKGROUND,
            Some(Value::String(s)) => parse_hex_color(s).map_err(|_| {
                RequestError::Invalid(
                    "Invalid background_color format. Should be a hex color (e.g., #FFFFFF)"
                        .into(),
                )
            })?,
            Some(_) => {
                return Err(RequestError::Invalid(
                    "Invalid background_color format. Should be a hex color (e.g., #FFFFFF)"
                        .into(),
                ));
            }
        };

        let direction = match map.get("direction") {
            None | Some(Value::Null) => Direction::default(),
            Some(Value::String(s)) => s
                .parse::<Direction>()
                .map_err(|_| RequestError::Invalid(invalid_direction()))?,
            Some(_) => return Err(RequestError::Invalid(invalid_direction())),
        };

        Ok(Self {
            id,
            markdown,
            background,
            direction,
        })
    }
}

fn parse_id(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn invalid_direction() -> String {
    let names: Vec<&str> = Direction::ALL.iter().map(|d| d.as_str()).collect();
    format!("Invalid direction. Must be one of: {}", names.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> Result<RenderRequest, RequestError> {
        RenderRequest::from_body(body.as_bytes())
    }

    #[test]
    fn applies_defaults() {
        let req = parse(r#"{"id": 5, "markdown": "hi"}"#).unwrap();
        assert_eq!(req.id, 5);
        assert_eq!(req.markdown, "hi");
        assert_eq!(req.background, Rgb::WHITE);
        assert_eq!(req.direction, Direction::BottomRight);
    }

    #[test]
    fn id_may_be_an_integer_string() {
        let req = parse(r#"{"id": " 12 ", "markdown": "", "direction": "vertical"}"#).unwrap();
        assert_eq!(req.id, 12);
        assert_eq!(req.direction, Direction::Vertical);
        assert!(matches!(
            parse(r#"{"id": "twelve", "markdown": ""}"#),
            Err(RequestError::Invalid(_))
        ));
        assert!(matches!(
            parse(r#"{"id": 1.5, "markdown": ""}"#),
            Err(RequestError::Invalid(_))
        ));
    }

    #[test]
    fn missing_fields_and_garbage_bodies() {
        for body in [r#"{"id": 1}"#, r#"{"markdown": "x"}"#, "[1]", "not json", ""] {
            assert_eq!(parse(body), Err(RequestError::MissingParameters), "{body}");
        }
    }

    #[test]
    fn rejects_bad_background_and_direction() {
        let err = parse(r#"{"id": 1, "markdown": "", "background_color": "red"}"#).unwrap_err();
        assert!(matches!(err, RequestError::Invalid(ref m) if m.contains("background_color")));

        let err = parse(r#"{"id": 1, "markdown": "", "direction": "up"}"#).unwrap_err();
        let RequestError::Invalid(msg) = err else {
            panic!("expected invalid");
        };
        assert!(msg.contains("vertical, horizontal, diagonal, bottom-right"), "{msg}");
    }
}
