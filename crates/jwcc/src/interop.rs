use crate::value::{Literal, Value, ValueKind};

impl Value {
    /// Converts the syntactic tree into a semantic [`serde_json::Value`],
    /// discarding trivia. Numbers outside the `f64` range (and other
    /// unrepresentable forms) become `null`, matching how serializers treat
    /// non-finite numbers.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match &self.value {
            ValueKind::Literal(lit) => literal_to_json(lit),
            ValueKind::Object(obj) => {
                let mut map = serde_json::Map::with_capacity(obj.members.len());
                for member in &obj.members {
                    let name = match &member.name.value {
                        ValueKind::Literal(lit) => lit.decode().into_owned(),
                        _ => continue,
                    };
                    map.insert(name, member.value.to_json());
                }
                serde_json::Value::Object(map)
            }
            ValueKind::Array(arr) => {
                serde_json::Value::Array(arr.elements.iter().map(Value::to_json).collect())
            }
        }
    }
}

fn literal_to_json(lit: &Literal) -> serde_json::Value {
    if lit.is_null() {
        return serde_json::Value::Null;
    }
    if let Some(b) = lit.as_bool() {
        return serde_json::Value::Bool(b);
    }
    if lit.is_string() {
        return serde_json::Value::String(lit.decode().into_owned());
    }
    let text = String::from_utf8_lossy(lit.as_bytes());
    match text.parse::<serde_json::Number>() {
        Ok(n) => serde_json::Value::Number(n),
        Err(_) => serde_json::Value::Null,
    }
}

impl PartialEq<serde_json::Value> for Value {
    fn eq(&self, other: &serde_json::Value) -> bool {
        eq(self, other)
    }
}

impl PartialEq<Value> for serde_json::Value {
    fn eq(&self, other: &Value) -> bool {
        eq(other, self)
    }
}

fn eq(lhs: &Value, rhs: &serde_json::Value) -> bool {
    match (&lhs.value, rhs) {
        (ValueKind::Literal(lit), rhs) => match rhs {
            serde_json::Value::Null => lit.is_null(),
            serde_json::Value::Bool(b) => lit.as_bool() == Some(*b),
            serde_json::Value::String(s) => lit.is_string() && lit.decode() == *s,
            serde_json::Value::Number(n) => {
                lit.is_number() && lit.as_f64() == n.as_f64()
            }
            _ => false,
        },
        (ValueKind::Object(obj), serde_json::Value::Object(map)) => {
            obj.members.len() == map.len()
                && obj.members.iter().all(|m| {
                    let name = match &m.name.value {
                        ValueKind::Literal(lit) => lit.decode(),
                        _ => return false,
                    };
                    map.get(name.as_ref()).is_some_and(|v| eq(&m.value, v))
                })
        }
        (ValueKind::Array(arr), serde_json::Value::Array(items)) => {
            arr.elements.len() == items.len()
                && arr.elements.iter().zip(items).all(|(e, v)| eq(e, v))
        }
        _ => false,
    }
}
