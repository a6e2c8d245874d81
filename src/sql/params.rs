//! Convert serde_json::Value to types that sqlx can bind.

use crate::error::AppError;
use serde_json::Value;
use sqlx::encode::{Encode, IsNull};
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::{Database, Type};

/// A value that can be bound to a PostgreSQL query. Converts from serde_json::Value.
#[derive(Clone, Debug, PartialEq)]
pub enum PgBindValue {
    Null,
    I64(i64),
    String(String),
}

impl PgBindValue {
    pub fn from_json(v: &Value) -> Result<Self, AppError> {
        Ok(match v {
            Value::Null => PgBindValue::Null,
            Value::Number(n) => match n.as_i64() {
                Some(i) => PgBindValue::I64(i),
                None => return Err(AppError::BadRequest(format!("number out of range: {}", n))),
            },
            Value::String(s) => PgBindValue::String(s.clone()),
            Value::Bool(_) | Value::Array(_) | Value::Object(_) => {
                return Err(AppError::BadRequest(format!("unsupported value: {}", v)))
            }
        })
    }
}

impl<'q> Encode<'q, Postgres> for PgBindValue {
    fn encode_by_ref(
        &self,
        buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        Ok(match self {
            PgBindValue::Null => <Option<String> as Encode<Postgres>>::encode_by_ref(&None, buf)?,
            PgBindValue::I64(n) => <i64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            PgBindValue::String(s) => {
                let s_ref: &str = s.as_str();
                <&str as Encode<Postgres>>::encode_by_ref(&s_ref, buf)?
            }
        })
    }

    /// Declares the wire type per value so binary-encoded integers are not read as text.
    fn produces(&self) -> Option<PgTypeInfo> {
        Some(match self {
            PgBindValue::Null | PgBindValue::String(_) => <String as Type<Postgres>>::type_info(),
            PgBindValue::I64(_) => <i64 as Type<Postgres>>::type_info(),
        })
    }
}

impl Type<Postgres> for PgBindValue {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("TEXT")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn converts_scalars() {
        assert_eq!(PgBindValue::from_json(&json!(7)).unwrap(), PgBindValue::I64(7));
        assert_eq!(PgBindValue::from_json(&json!(null)).unwrap(), PgBindValue::Null);
        assert_eq!(
            PgBindValue::from_json(&json!("a")).unwrap(),
            PgBindValue::String("a".into())
        );
    }

    #[test]
    fn rejects_values_no_column_holds() {
        assert!(PgBindValue::from_json(&json!([1, 2])).is_err());
        assert!(PgBindValue::from_json(&json!(true)).is_err());
        assert!(PgBindValue::from_json(&json!(1.5)).is_err());
    }
}
