//! Ready-made [`Decoder`]s.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::operation::Decoder;

/// Deserializes the whole value into `T`.
pub fn json<T: DeserializeOwned + Send + 'static>() -> Decoder<T> {
	Box::new(|value| serde_json::from_value(value).map_err(Into::into))
}

/// Deserializes one field of an object value into `T`.
///
/// A missing field is a decode error; an explicit `null` is handed to `T`.
pub fn field<T: DeserializeOwned + Send + 'static>(name: &str) -> Decoder<T> {
	let name = name.to_string();
	Box::new(move |mut value| {
		let field = value
			.as_object_mut()
			.and_then(|object| object.remove(&name))
			.ok_or_else(|| Error::Decode(format!("field '{name}' missing from response")))?;
		serde_json::from_value(field).map_err(|e| Error::Decode(format!("field '{name}': {e}")))
	})
}

/// Ignores the value.
pub fn unit() -> Decoder<()> {
	Box::new(|_| Ok(()))
}

/// Applies `f` after deserializing into `T`.
pub fn map<T, U, F>(f: F) -> Decoder<U>
where
	T: DeserializeOwned,
	U: Send + 'static,
	F: FnOnce(T) -> Result<U> + Send + 'static,
{
	Box::new(move |value: Value| {
		let parsed: T = serde_json::from_value(value)?;
		f(parsed)
	})
}
