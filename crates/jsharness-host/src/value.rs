use std::collections::BTreeMap;

use rquickjs::{Array, Ctx, Object, Value};

/// Host-side value that can be handed to scripts as an argument or a global.
///
/// The harness treats these as opaque: it copies them into the engine once and
/// never looks at them again.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    Undefined,
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<ScriptValue>),
    Object(BTreeMap<String, ScriptValue>),
}

impl ScriptValue {
    /// Materialize this value inside the given engine context.
    pub fn to_js<'js>(&self, ctx: &Ctx<'js>) -> rquickjs::Result<Value<'js>> {
        let value = match self {
            ScriptValue::Undefined => Value::new_undefined(ctx.clone()),
            ScriptValue::Null => Value::new_null(ctx.clone()),
            ScriptValue::Bool(b) => Value::new_bool(ctx.clone(), *b),
            ScriptValue::Int(i) => match i32::try_from(*i) {
                Ok(small) => Value::new_int(ctx.clone(), small),
                // Outside the engine's integer tag range; numbers are doubles anyway
                Err(_) => Value::new_float(ctx.clone(), *i as f64),
            },
            ScriptValue::Float(f) => Value::new_float(ctx.clone(), *f),
            ScriptValue::String(s) => rquickjs::String::from_str(ctx.clone(), s)?.into_value(),
            ScriptValue::Array(items) => {
                let array = Array::new(ctx.clone())?;
                for (index, item) in items.iter().enumerate() {
                    array.set(index, item.to_js(ctx)?)?;
                }
                array.into_value()
            }
            ScriptValue::Object(entries) => {
                let object = Object::new(ctx.clone())?;
                for (key, item) in entries {
                    object.set(key.as_str(), item.to_js(ctx)?)?;
                }
                object.into_value()
            }
        };
        Ok(value)
    }
}

impl From<bool> for ScriptValue {
    fn from(value: bool) -> Self {
        ScriptValue::Bool(value)
    }
}

impl From<i32> for ScriptValue {
    fn from(value: i32) -> Self {
        ScriptValue::Int(value.into())
    }
}

impl From<i64> for ScriptValue {
    fn from(value: i64) -> Self {
        ScriptValue::Int(value)
    }
}

impl From<f64> for ScriptValue {
    fn from(value: f64) -> Self {
        ScriptValue::Float(value)
    }
}

impl From<&str> for ScriptValue {
    fn from(value: &str) -> Self {
        ScriptValue::String(value.to_string())
    }
}

impl From<String> for ScriptValue {
    fn from(value: String) -> Self {
        ScriptValue::String(value)
    }
}

impl<T: Into<ScriptValue>> From<Vec<T>> for ScriptValue {
    fn from(values: Vec<T>) -> Self {
        ScriptValue::Array(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<ScriptValue>> From<Option<T>> for ScriptValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(ScriptValue::Null)
    }
}

impl From<toml::Value> for ScriptValue {
    fn from(value: toml::Value) -> Self {
        match value {
            toml::Value::String(s) => ScriptValue::String(s),
            toml::Value::Integer(i) => ScriptValue::Int(i),
            toml::Value::Float(f) => ScriptValue::Float(f),
            toml::Value::Boolean(b) => ScriptValue::Bool(b),
            // Scripts see datetimes in their RFC 3339 text form
            toml::Value::Datetime(dt) => ScriptValue::String(dt.to_string()),
            toml::Value::Array(items) => {
                ScriptValue::Array(items.into_iter().map(ScriptValue::from).collect())
            }
            toml::Value::Table(table) => ScriptValue::Object(
                table
                    .into_iter()
                    .map(|(key, item)| (key, ScriptValue::from(item)))
                    .collect(),
            ),
        }
    }
}
