//! JSON body extraction with field-level validation.
//!
//! [`ValidatedJson`] reads the body, parses it as JSON and hands the value to
//! the target type's [`FromJsonBody`] implementation, which reports every
//! problem it finds as a [`FieldError`]. Scalars are coerced leniently:
//! numeric strings and booleans are accepted where numbers are expected.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::{header, HeaderMap};
use serde_json::{json, Map, Value};

use crate::http::error::{AppError, FieldError, LocSegment};

/// Types that can be built from a parsed JSON request body.
pub trait FromJsonBody: Sized {
    /// Build `Self` from `body`, or return every field error found.
    fn from_json_body(body: &Value) -> Result<Self, Vec<FieldError>>;
}

/// Extractor for a validated JSON body.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: FromJsonBody + Send,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !accepts_as_json(req.headers()) {
            return Err(AppError::validation(vec![FieldError::new(
                "content_type",
                vec!["body".into()],
                "Expected request with `Content-Type: application/json`",
            )]));
        }

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| AppError::http(rejection.status(), rejection.body_text()))?;

        let value = parse_body(&bytes).map_err(|e| AppError::validation(vec![e]))?;
        T::from_json_body(&value)
            .map(ValidatedJson)
            .map_err(AppError::validation)
    }
}

/// A body without `Content-Type` is read as JSON; a declared type must be JSON.
fn accepts_as_json(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers.get(header::CONTENT_TYPE) else {
        return true;
    };
    let Ok(content_type) = content_type.to_str() else {
        return false;
    };
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}

fn parse_body(bytes: &[u8]) -> Result<Value, FieldError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(FieldError::new("missing", vec!["body".into()], "Field required"));
    }
    serde_json::from_slice(bytes).map_err(|e| {
        FieldError::new("json_invalid", vec!["body".into()], "JSON decode error")
            .with_ctx(json!({ "error": e.to_string() }))
    })
}

/// Extend a location path with one more segment.
pub fn child_loc(parent: &[LocSegment], key: impl Into<LocSegment>) -> Vec<LocSegment> {
    let mut loc = parent.to_vec();
    loc.push(key.into());
    loc
}

/// Require `body` to be an object.
pub fn object<'a>(body: &'a Value, loc: &[LocSegment]) -> Result<&'a Map<String, Value>, FieldError> {
    body.as_object().ok_or_else(|| {
        FieldError::new(
            "model_attributes_type",
            loc.to_vec(),
            "Input should be a valid dictionary or object to extract fields from",
        )
        .with_input(body.clone())
    })
}

/// Look up a required field, recording a `missing` error when absent.
pub fn required<'a>(
    object: &'a Map<String, Value>,
    name: &str,
    parent: &[LocSegment],
    errors: &mut Vec<FieldError>,
) -> Option<&'a Value> {
    let value = object.get(name);
    if value.is_none() {
        errors.push(
            FieldError::new("missing", child_loc(parent, name), "Field required")
                .with_input(Value::Object(object.clone())),
        );
    }
    value
}

/// Coerce a value to an integer.
pub fn integer(value: &Value, loc: Vec<LocSegment>) -> Result<i64, FieldError> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            match n.as_f64() {
                Some(f) if f.fract() != 0.0 => Err(FieldError::new(
                    "int_from_float",
                    loc,
                    "Input should be a valid integer, got a number with a fractional part",
                )
                .with_input(value.clone())),
                Some(f) if f >= i64::MIN as f64 && f <= i64::MAX as f64 => Ok(f as i64),
                _ => Err(FieldError::new(
                    "int_parsing_size",
                    loc,
                    "Unable to parse input string as an integer, exceeded maximum size",
                )
                .with_input(value.clone())),
            }
        }
        Value::Bool(b) => Ok(i64::from(*b)),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                return Ok(i);
            }
            // "1.0" is a whole number written as a float.
            match s.parse::<f64>() {
                Ok(f) if f.is_finite()
                    && f.fract() == 0.0
                    && f >= i64::MIN as f64
                    && f <= i64::MAX as f64 =>
                {
                    Ok(f as i64)
                }
                _ => Err(FieldError::new(
                    "int_parsing",
                    loc,
                    "Input should be a valid integer, unable to parse string as an integer",
                )
                .with_input(value.clone())),
            }
        }
        _ => Err(FieldError::new("int_type", loc, "Input should be a valid integer")
            .with_input(value.clone())),
    }
}

/// Coerce a value to a float.
pub fn number(value: &Value, loc: Vec<LocSegment>) -> Result<f64, FieldError> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| {
            FieldError::new("float_type", loc.clone(), "Input should be a valid number")
                .with_input(value.clone())
        }),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| {
            FieldError::new(
                "float_parsing",
                loc,
                "Input should be a valid number, unable to parse string as a number",
            )
            .with_input(value.clone())
        }),
        _ => Err(FieldError::new("float_type", loc, "Input should be a valid number")
            .with_input(value.clone())),
    }
}

/// Coerce a value to a string-keyed map of floats, reporting each bad entry.
pub fn float_map(value: &Value, loc: Vec<LocSegment>) -> Result<HashMap<String, f64>, Vec<FieldError>> {
    let Some(entries) = value.as_object() else {
        return Err(vec![FieldError::new("dict_type", loc, "Input should be a valid dictionary")
            .with_input(value.clone())]);
    };

    let mut map = HashMap::with_capacity(entries.len());
    let mut errors = Vec::new();
    for (key, raw) in entries {
        match number(raw, child_loc(&loc, key.as_str())) {
            Ok(v) => {
                map.insert(key.clone(), v);
            }
            Err(e) => errors.push(e),
        }
    }

    if errors.is_empty() {
        Ok(map)
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;

    #[derive(Debug)]
    struct Point {
        x: i64,
    }

    impl FromJsonBody for Point {
        fn from_json_body(body: &Value) -> Result<Self, Vec<FieldError>> {
            let root = vec![LocSegment::from("body")];
            let obj = object(body, &root).map_err(|e| vec![e])?;
            let mut errors = Vec::new();
            let x = required(obj, "x", &root, &mut errors)
                .and_then(|v| integer(v, child_loc(&root, "x")).map_err(|e| errors.push(e)).ok());
            match x {
                Some(x) if errors.is_empty() => Ok(Point { x }),
                _ => Err(errors),
            }
        }
    }

    async fn extract(content_type: Option<&str>, body: &'static str) -> Result<Point, AppError> {
        let mut builder = Request::builder().method("POST").uri("/");
        if let Some(ct) = content_type {
            builder = builder.header(header::CONTENT_TYPE, ct);
        }
        let req = builder.body(Body::from(body)).unwrap();
        ValidatedJson::<Point>::from_request(req, &()).await.map(|v| v.0)
    }

    fn details(err: AppError) -> Vec<FieldError> {
        match err {
            AppError::Validation(details) => details,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn accepts_valid_body() {
        let point = extract(Some("application/json"), r#"{"x": 4}"#).await.unwrap();
        assert_eq!(point.x, 4);

        let point = extract(Some("application/json; charset=utf-8"), r#"{"x": "7"}"#)
            .await
            .unwrap();
        assert_eq!(point.x, 7);
    }

    #[tokio::test]
    async fn body_without_content_type_is_read_as_json() {
        let point = extract(None, r#"{"x": 4}"#).await.unwrap();
        assert_eq!(point.x, 4);
    }

    #[tokio::test]
    async fn rejects_declared_non_json_content_type() {
        let d = details(extract(Some("text/plain"), r#"{"x": 4}"#).await.unwrap_err());
        assert_eq!(d[0].kind, "content_type");

        let point = extract(Some("application/vnd.lead+json"), r#"{"x": 4}"#).await.unwrap();
        assert_eq!(point.x, 4);
    }

    #[tokio::test]
    async fn rejects_malformed_json() {
        let err = extract(Some("application/json"), "invalid json").await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let d = details(err);
        assert_eq!(d[0].kind, "json_invalid");
        assert!(d[0].ctx.is_some());
    }

    #[tokio::test]
    async fn rejects_empty_body() {
        let d = details(extract(Some("application/json"), "").await.unwrap_err());
        assert_eq!(d[0].kind, "missing");
        assert_eq!(d[0].loc, vec![LocSegment::from("body")]);
    }

    #[test]
    fn integer_coercion() {
        let loc = || vec![LocSegment::from("x")];
        assert_eq!(integer(&json!(3), loc()).unwrap(), 3);
        assert_eq!(integer(&json!(3.0), loc()).unwrap(), 3);
        assert_eq!(integer(&json!(" 12 "), loc()).unwrap(), 12);
        assert_eq!(integer(&json!(3.5), loc()).unwrap_err().kind, "int_from_float");
        assert_eq!(integer(&json!("invalid"), loc()).unwrap_err().kind, "int_parsing");
        assert_eq!(integer(&json!(true), loc()).unwrap(), 1);
        assert_eq!(integer(&json!(false), loc()).unwrap(), 0);
        assert_eq!(integer(&json!("1.0"), loc()).unwrap(), 1);
        assert_eq!(integer(&json!("1.5"), loc()).unwrap_err().kind, "int_parsing");
        assert_eq!(integer(&json!("nan"), loc()).unwrap_err().kind, "int_parsing");
        assert_eq!(integer(&json!(null), loc()).unwrap_err().kind, "int_type");
        assert_eq!(integer(&json!([1]), loc()).unwrap_err().kind, "int_type");
        assert_eq!(integer(&json!(1e30), loc()).unwrap_err().kind, "int_parsing_size");
    }

    #[test]
    fn number_coercion() {
        let loc = || vec![LocSegment::from("x")];
        assert_eq!(number(&json!(false), loc()).unwrap(), 0.0);
        assert_eq!(number(&json!(true), loc()).unwrap(), 1.0);
        assert_eq!(number(&json!(" 2.5 "), loc()).unwrap(), 2.5);
        assert_eq!(number(&json!(null), loc()).unwrap_err().kind, "float_type");
    }

    #[test]
    fn float_map_errors_follow_input_order() {
        let errors = float_map(
            &json!({"zeta": "z", "alpha": "a", "mid": "m"}),
            vec![LocSegment::from("features")],
        )
        .unwrap_err();
        let keys: Vec<_> = errors.iter().map(|e| e.loc[1].clone()).collect();
        assert_eq!(keys, vec![LocSegment::from("zeta"), "alpha".into(), "mid".into()]);
    }

    #[test]
    fn float_map_reports_each_bad_entry() {
        let errors = float_map(
            &json!({"age": 30.0, "income": "lots", "debt": [1]}),
            vec![LocSegment::from("body"), LocSegment::from("features")],
        )
        .unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.kind == "float_parsing"
            && e.loc == vec![LocSegment::from("body"), "features".into(), "income".into()]));
        assert!(errors.iter().any(|e| e.kind == "float_type"));

        let map = float_map(&json!({"age": 30, "score": "1.5"}), vec![]).unwrap();
        assert_eq!(map["age"], 30.0);
        assert_eq!(map["score"], 1.5);

        let errors = float_map(&json!("invalid"), vec![]).unwrap_err();
        assert_eq!(errors[0].kind, "dict_type");
    }
}
