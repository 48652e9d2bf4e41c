//! Scope modeling for app registration and authorization requests.

// crates.io
use serde::{Deserializer, Serializer, de::Error as DeError};
// self
use crate::_prelude::*;

/// Errors emitted when validating scopes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ScopeValidationError {
	/// Empty scope entries are not allowed.
	#[error("Scope entries cannot be empty.")]
	Empty,
	/// Scopes cannot contain embedded whitespace characters.
	#[error("Scope contains whitespace: {scope}.")]
	ContainsWhitespace {
		/// The offending scope string.
		scope: String,
	},
}

/// Ordered, de-duplicated list of OAuth scopes.
///
/// Instances compare the requested scope string verbatim between registration and
/// authorization, so the caller's order is preserved and only repeated entries are dropped.
/// The wire form is the space-delimited [`Display`] rendering.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Scopes(Arc<[String]>);
impl Scopes {
	/// Scopes requested when no explicit set is configured.
	pub const DEFAULT: [&'static str; 3] = ["read", "write", "follow"];

	/// Creates a scope list from any iterator, preserving first-seen order.
	pub fn new<I, S>(scopes: I) -> Result<Self, ScopeValidationError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let mut ordered: Vec<String> = Vec::new();

		for scope in scopes {
			let owned: String = scope.into();

			if owned.is_empty() {
				return Err(ScopeValidationError::Empty);
			}
			if owned.chars().any(char::is_whitespace) {
				return Err(ScopeValidationError::ContainsWhitespace { scope: owned });
			}
			if !ordered.contains(&owned) {
				ordered.push(owned);
			}
		}

		Ok(Self(Arc::from(ordered)))
	}

	/// `read write follow`, the scope set requested by default.
	pub fn standard() -> Self {
		Self(Self::DEFAULT.iter().map(|scope| (*scope).to_owned()).collect())
	}

	/// Number of distinct scopes.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns true if no scopes are defined.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Returns true if the list contains the provided scope.
	pub fn contains(&self, scope: &str) -> bool {
		self.0.iter().any(|candidate| candidate == scope)
	}

	/// Iterator over scopes in request order.
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.0.iter().map(|s| s.as_str())
	}

	/// Returns the space-delimited wire representation.
	pub fn joined(&self) -> String {
		self.0.join(" ")
	}

	/// Returns `None` for an empty list so optional parameters can be omitted.
	pub fn to_param(&self) -> Option<String> {
		if self.is_empty() { None } else { Some(self.joined()) }
	}
}
impl Debug for Scopes {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("Scopes").field(&self.0).finish()
	}
}
impl Display for Scopes {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.joined())
	}
}

impl FromStr for Scopes {
	type Err = ScopeValidationError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s.is_empty() {
			return Ok(Self::default());
		}
		if s.chars().all(char::is_whitespace) {
			return Err(ScopeValidationError::Empty);
		}

		Self::new(s.split_whitespace())
	}
}
impl Serialize for Scopes {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&self.joined())
	}
}
impl<'de> Deserialize<'de> for Scopes {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let raw = String::deserialize(deserializer)?;

		Scopes::from_str(&raw).map_err(DeError::custom)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn scopes_keep_order_and_drop_duplicates() {
		let scopes = Scopes::new(["read", "write", "read", "follow"])
			.expect("Scope list with duplicates should be valid.");

		assert_eq!(scopes.len(), 3);
		assert_eq!(scopes.joined(), "read write follow");
		assert_eq!(scopes, Scopes::standard());
		assert!(scopes.contains("follow"));
		assert!(!scopes.contains("push"));
	}

	#[test]
	fn scopes_reject_whitespace_and_empty_entries() {
		let err = Scopes::new([" read "]).expect_err("Padded scopes must be rejected.");

		assert!(matches!(err, ScopeValidationError::ContainsWhitespace { .. }));
		assert!(Scopes::new([""]).is_err());
		assert!(Scopes::from_str("").is_ok(), "Empty string represents an empty scope list.");
		assert!(Scopes::from_str("   ").is_err(), "Whitespace-only input must be rejected.");
	}

	#[test]
	fn empty_scopes_are_omitted_as_parameters() {
		assert_eq!(Scopes::default().to_param(), None);
		assert_eq!(Scopes::standard().to_param(), Some("read write follow".into()));
	}

	#[test]
	fn serde_uses_the_space_delimited_form() {
		let scopes =
			Scopes::from_str("write:statuses read").expect("Granular scopes should parse.");
		let payload = serde_json::to_string(&scopes).expect("Scopes should serialize.");

		assert_eq!(payload, "\"write:statuses read\"");

		let decoded: Scopes = serde_json::from_str(&payload).expect("Scopes should deserialize.");

		assert_eq!(decoded.iter().collect::<Vec<_>>(), vec!["write:statuses", "read"]);
	}
}
