//! Download/upload accounting factors.

use serde_json::Value;

use crate::config::DiscountScheme;

/// Traffic accounting for one release.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Discount {
    pub download: f64,
    pub upload: f64,
}

impl Discount {
    pub const NORMAL: Discount = Discount {
        download: 1.0,
        upload: 1.0,
    };

    pub fn is_free(&self) -> bool {
        self.download == 0.0
    }
}

impl Default for Discount {
    fn default() -> Self {
        Self::NORMAL
    }
}

/// Look up a row's discount under `scheme`.
///
/// This is a table lookup, never a formula: anything the scheme does not
/// recognize counts as a normal 1/1 release.
pub fn evaluate(scheme: &DiscountScheme, row: &Value) -> Discount {
    match scheme {
        DiscountScheme::None => Discount::NORMAL,
        DiscountScheme::Flags {
            free,
            neutral,
            double_upload,
        } => {
            let any = |pointers: &[String]| {
                pointers
                    .iter()
                    .any(|p| row.pointer(p).is_some_and(is_truthy))
            };
            let mut discount = Discount::NORMAL;
            if any(free) {
                discount.download = 0.0;
            }
            if any(double_upload) {
                discount.upload = 2.0;
            }
            if any(neutral) {
                discount = Discount {
                    download: 0.0,
                    upload: 0.0,
                };
            }
            discount
        }
        DiscountScheme::Code { field, codes } => {
            let Some(code) = row.pointer(field).and_then(scalar_string) else {
                return Discount::NORMAL;
            };
            codes
                .iter()
                .find(|c| c.code.eq_ignore_ascii_case(code.trim()))
                .map(|c| Discount {
                    download: c.download,
                    upload: c.upload,
                })
                .unwrap_or(Discount::NORMAL)
        }
    }
}

/// Loose boolean: trackers send `true`, `1`, `"1"` or `"yes"` alike.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => {
            let s = s.trim().to_ascii_lowercase();
            !s.is_empty() && !matches!(s.as_str(), "0" | "false" | "no" | "off")
        }
        _ => false,
    }
}

pub(crate) fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DiscountCode;
    use serde_json::json;

    fn code_scheme() -> DiscountScheme {
        let code = |code: &str, download: f64, upload: f64| DiscountCode {
            code: code.to_string(),
            download,
            upload,
        };
        DiscountScheme::Code {
            field: "/freeType".to_string(),
            codes: vec![
                code("1", 0.0, 1.0),
                code("2", 0.5, 1.0),
                code("3", 0.25, 1.0),
                code("4", 0.0, 0.0),
                code("double", 1.0, 2.0),
            ],
        }
    }

    #[test]
    fn test_flags_default_scheme() {
        let scheme = DiscountScheme::default();

        let normal = evaluate(&scheme, &json!({"isFreeleech": false}));
        assert_eq!(normal, Discount::NORMAL);

        let free = evaluate(&scheme, &json!({"isFreeleech": true}));
        assert_eq!(free.download, 0.0);
        assert_eq!(free.upload, 1.0);

        let personal = evaluate(&scheme, &json!({"isPersonalFreeleech": "1"}));
        assert!(personal.is_free());

        let neutral = evaluate(&scheme, &json!({"isNeutralLeech": 1, "isFreeleech": true}));
        assert_eq!(neutral, Discount { download: 0.0, upload: 0.0 });
    }

    #[test]
    fn test_code_scheme_lookup() {
        let scheme = code_scheme();
        assert_eq!(evaluate(&scheme, &json!({"freeType": "2"})).download, 0.5);
        assert_eq!(evaluate(&scheme, &json!({"freeType": 3})).download, 0.25);
        assert_eq!(
            evaluate(&scheme, &json!({"freeType": "DOUBLE"})),
            Discount { download: 1.0, upload: 2.0 }
        );
    }

    #[test]
    fn test_unknown_code_is_normal() {
        let scheme = code_scheme();
        assert_eq!(evaluate(&scheme, &json!({"freeType": "99"})), Discount::NORMAL);
        assert_eq!(evaluate(&scheme, &json!({})), Discount::NORMAL);
    }

    #[test]
    fn test_truthiness() {
        assert!(is_truthy(&json!(true)));
        assert!(is_truthy(&json!("yes")));
        assert!(is_truthy(&json!(2)));
        assert!(!is_truthy(&json!("0")));
        assert!(!is_truthy(&json!("false")));
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!("")));
    }
}
